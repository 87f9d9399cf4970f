//! Channel state type definitions
//!
//! Defines slots (what a value belongs to), per-channel state, snapshots and
//! the update report returned by every tracker entry point.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::PresetSelection;
use crate::midi::{control, CommandKind};

/// Address of a tracked value within a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum Slot {
    /// A command with a value (channel pressure, pitch wheel, aftertouch, preset)
    Command(CommandKind),
    /// A control change index
    Control(u8),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Command(command) => write!(f, "{}", command),
            Slot::Control(cc) => write!(f, "{} (CC {})", control::display_name(*cc), cc),
        }
    }
}

/// One slot and its last known value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotValue {
    pub slot: Slot,
    pub value: u8,
}

/// Everything the panel needs to repaint one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    /// Channel (0-15)
    pub channel: u8,
    /// Committed bank/preset pair
    pub preset: PresetSelection,
    /// Bank from the last BANK message, committed or not
    pub bank: u8,
    /// Tracked values, in panel order
    pub values: Vec<SlotValue>,
}

impl ChannelSnapshot {
    pub fn value(&self, slot: Slot) -> Option<u8> {
        self.values
            .iter()
            .find(|entry| entry.slot == slot)
            .map(|entry| entry.value)
    }
}

/// Mutable state of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    values: Vec<SlotValue>,
    /// Bank from the last BANK control change, waiting for a PRESET
    pending_bank: u8,
    preset: PresetSelection,
}

impl ChannelState {
    pub(super) fn new(defaults: &[SlotValue], preset: PresetSelection) -> Self {
        Self {
            values: defaults.to_vec(),
            pending_bank: preset.bank,
            preset,
        }
    }

    pub fn value(&self, slot: Slot) -> Option<u8> {
        self.values
            .iter()
            .find(|entry| entry.slot == slot)
            .map(|entry| entry.value)
    }

    pub fn preset(&self) -> PresetSelection {
        self.preset
    }

    /// Overwrite a tracked value; false if the slot is not tracked
    pub(super) fn set(&mut self, slot: Slot, value: u8) -> bool {
        match self.values.iter_mut().find(|entry| entry.slot == slot) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    pub(super) fn set_pending_bank(&mut self, bank: u8) {
        self.pending_bank = bank;
    }

    /// Commit the pending bank with a preset
    pub(super) fn commit_preset(&mut self, preset: u8) -> PresetSelection {
        self.preset = PresetSelection::new(self.pending_bank, preset);
        self.preset
    }

    pub(super) fn set_preset(&mut self, selection: PresetSelection) {
        self.pending_bank = selection.bank;
        self.preset = selection;
    }

    /// Restore tracked values to defaults, keeping the preset selection
    pub(super) fn reset_values(&mut self, defaults: &[SlotValue]) {
        self.values.clear();
        self.values.extend_from_slice(defaults);
    }

    pub(super) fn snapshot(&self, channel: u8) -> ChannelSnapshot {
        ChannelSnapshot {
            channel,
            preset: self.preset,
            bank: self.pending_bank,
            values: self.values.clone(),
        }
    }
}

/// What a tracker entry point changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// A tracked value was overwritten
    Value { channel: u8, slot: Slot, value: u8 },
    /// BANK arrived; the preset selection is unchanged until PRESET follows
    PendingBank { channel: u8, bank: u8 },
    /// A bank/preset pair was committed
    Preset { channel: u8, selection: PresetSelection },
    /// The channel's values went back to their defaults
    Reset { channel: u8 },
    /// A channel-voice message with no tracked state (notes, undeclared controls)
    Untracked { channel: u8 },
    /// Bytes that are not a complete channel-voice message
    Unclassified,
}

impl Update {
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Update::Value { channel, .. }
            | Update::PendingBank { channel, .. }
            | Update::Preset { channel, .. }
            | Update::Reset { channel }
            | Update::Untracked { channel } => Some(channel),
            Update::Unclassified => None,
        }
    }

    /// Whether value or preset widgets of this channel need a repaint.
    /// A pending bank only shows in a BANK row, which the layout decides.
    pub fn changes_panel(&self) -> bool {
        matches!(
            self,
            Update::Value { .. } | Update::Preset { .. } | Update::Reset { .. }
        )
    }
}
