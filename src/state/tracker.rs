//! Tracker - last known value of every tracked slot, per channel
//!
//! Both directions go through the same rules:
//! - BANK only sets the channel's pending bank
//! - PRESET commits (pending bank, preset) as the channel's selection
//! - ALL_CONTROLLERS_OFF returns the tracked values to their defaults
//! - any other tracked slot is overwritten (last write wins, no history)

use tracing::{debug, warn};

use super::types::{ChannelSnapshot, ChannelState, Slot, SlotValue, Update};
use crate::catalog::PresetSelection;
use crate::error::{HostError, HostResult};
use crate::midi::{control, format_hex, ChannelVoice, CommandKind, CHANNEL_COUNT, MAX_DATA};
use crate::synth::Capabilities;

/// Owns the state of all 16 channels
#[derive(Debug, Clone)]
pub struct Tracker {
    channels: Vec<ChannelState>,
    /// Power-on values, in panel order
    defaults: Vec<SlotValue>,
    default_preset: PresetSelection,
}

impl Tracker {
    /// Create a tracker with one entry per tracked command and long control
    /// of `capabilities`, every channel at its power-on defaults
    pub fn new(capabilities: &Capabilities, default_preset: PresetSelection) -> Self {
        let defaults: Vec<SlotValue> = capabilities
            .tracked_commands()
            .map(|(command, value)| SlotValue {
                slot: Slot::Command(command),
                value,
            })
            .chain(capabilities.tracked_controls().map(|(cc, value)| SlotValue {
                slot: Slot::Control(cc),
                value,
            }))
            .collect();

        let channels = (0..CHANNEL_COUNT)
            .map(|_| ChannelState::new(&defaults, default_preset))
            .collect();

        Self {
            channels,
            defaults,
            default_preset,
        }
    }

    pub fn channel(&self, channel: u8) -> HostResult<&ChannelState> {
        self.channels
            .get(channel as usize)
            .ok_or(HostError::ChannelOutOfRange(channel))
    }

    fn channel_mut(&mut self, channel: u8) -> HostResult<&mut ChannelState> {
        self.channels
            .get_mut(channel as usize)
            .ok_or(HostError::ChannelOutOfRange(channel))
    }

    /// Slots tracked on every channel, in panel order
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.defaults.iter().map(|entry| entry.slot)
    }

    pub fn default_preset(&self) -> PresetSelection {
        self.default_preset
    }

    /// Preset a channel returns to on reset (changes with the active sound font)
    pub fn set_default_preset(&mut self, selection: PresetSelection) {
        self.default_preset = selection;
    }

    /// Record a value the host sent
    pub fn record_outgoing(&mut self, channel: u8, slot: Slot, value: u8) -> HostResult<Update> {
        if value > MAX_DATA {
            return Err(HostError::DataOutOfRange(value));
        }
        let update = self.apply(channel, slot, value)?;
        debug!("Outgoing ch:{} {} = {} -> {:?}", channel + 1, slot, value, update);
        Ok(update)
    }

    /// Record a bank/preset pair the host sent as one selection
    pub fn record_preset(&mut self, channel: u8, selection: PresetSelection) -> HostResult<Update> {
        self.channel_mut(channel)?.set_preset(selection);
        Ok(Update::Preset { channel, selection })
    }

    /// Decode raw bytes from a hardware device and record them.
    ///
    /// Bytes that are not a complete channel-voice message are logged and
    /// reported as `Update::Unclassified`; they are never an error.
    pub fn record_incoming(&mut self, raw: &[u8]) -> Update {
        let Some(voice) = ChannelVoice::parse(raw) else {
            warn!("Unclassified incoming message: {}", format_hex(raw));
            return Update::Unclassified;
        };

        let (slot, value) = match voice.command {
            CommandKind::ControlChange => (Slot::Control(voice.data1), voice.data2),
            CommandKind::Preset | CommandKind::ChannelPressure => {
                (Slot::Command(voice.command), voice.data1)
            }
            // Outgoing pitch wheel carries the slider value in both bytes;
            // the MSB is the slider position for 14-bit hardware too
            CommandKind::Pitchwheel | CommandKind::Aftertouch => {
                (Slot::Command(voice.command), voice.data2)
            }
            CommandKind::NoteOn | CommandKind::NoteOff => {
                return Update::Untracked {
                    channel: voice.channel,
                };
            }
        };

        // The channel nibble is always 0-15
        let update = self
            .apply(voice.channel, slot, value)
            .unwrap_or(Update::Unclassified);
        debug!("Incoming {} -> {:?}", voice, update);
        update
    }

    fn apply(&mut self, channel: u8, slot: Slot, value: u8) -> HostResult<Update> {
        let defaults = &self.defaults;
        let state = self
            .channels
            .get_mut(channel as usize)
            .ok_or(HostError::ChannelOutOfRange(channel))?;

        Ok(match slot {
            Slot::Control(control::BANK) => {
                state.set_pending_bank(value);
                Update::PendingBank {
                    channel,
                    bank: value,
                }
            }
            Slot::Control(control::ALL_CONTROLLERS_OFF) => {
                state.reset_values(defaults);
                Update::Reset { channel }
            }
            Slot::Command(CommandKind::Preset) => Update::Preset {
                channel,
                selection: state.commit_preset(value),
            },
            _ if state.value(slot).is_none() => {
                debug!("ch:{} {} is not tracked", channel + 1, slot);
                Update::Untracked { channel }
            }
            _ => {
                state.set(slot, value);
                Update::Value {
                    channel,
                    slot,
                    value,
                }
            }
        })
    }

    /// Return a channel to its power-on state, preset included
    pub fn reset(&mut self, channel: u8) -> HostResult<Update> {
        let default_preset = self.default_preset;
        let defaults = &self.defaults;
        let state = self
            .channels
            .get_mut(channel as usize)
            .ok_or(HostError::ChannelOutOfRange(channel))?;

        state.reset_values(defaults);
        state.set_preset(default_preset);
        Ok(Update::Reset { channel })
    }

    /// Current values of a channel, for repainting its widgets
    pub fn snapshot(&self, channel: u8) -> HostResult<ChannelSnapshot> {
        Ok(self.channel(channel)?.snapshot(channel))
    }

    /// What `snapshot` returns for a channel right after `reset`
    pub fn power_on_snapshot(&self, channel: u8) -> ChannelSnapshot {
        ChannelSnapshot {
            channel,
            preset: self.default_preset,
            bank: self.default_preset.bank,
            values: self.defaults.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::tests::full_capabilities;
    use proptest::prelude::*;

    fn tracker() -> Tracker {
        Tracker::new(&full_capabilities(), PresetSelection::new(0, 0))
    }

    #[test]
    fn test_power_on_state() {
        let tracker = tracker();
        let snapshot = tracker.snapshot(4).unwrap();

        assert_eq!(snapshot, tracker.power_on_snapshot(4));
        assert_eq!(snapshot.value(Slot::Command(CommandKind::Pitchwheel)), Some(64));
        assert_eq!(snapshot.value(Slot::Control(control::VOLUME)), Some(100));
        assert_eq!(snapshot.value(Slot::Control(control::BANK)), None);
        assert_eq!(snapshot.value(Slot::Command(CommandKind::Preset)), None);
        assert_eq!(snapshot.preset, PresetSelection::new(0, 0));
    }

    #[test]
    fn test_each_tracked_slot_has_one_entry() {
        let tracker = tracker();
        let snapshot = tracker.snapshot(0).unwrap();

        for slot in tracker.slots() {
            let count = snapshot.values.iter().filter(|e| e.slot == slot).count();
            assert_eq!(count, 1, "{} tracked {} times", slot, count);
        }
    }

    #[test]
    fn test_last_write_wins_across_directions() {
        let mut tracker = tracker();

        tracker
            .record_outgoing(2, Slot::Control(control::VOLUME), 90)
            .unwrap();
        assert_eq!(
            tracker.snapshot(2).unwrap().value(Slot::Control(control::VOLUME)),
            Some(90)
        );

        let update = tracker.record_incoming(&[0xB2, control::VOLUME, 30]);
        assert_eq!(update, Update::Value {
            channel: 2,
            slot: Slot::Control(control::VOLUME),
            value: 30,
        });

        let snapshot = tracker.snapshot(2).unwrap();
        assert_eq!(snapshot.value(Slot::Control(control::VOLUME)), Some(30));
        let volume_entries = snapshot
            .values
            .iter()
            .filter(|e| e.slot == Slot::Control(control::VOLUME))
            .count();
        assert_eq!(volume_entries, 1);
    }

    #[test]
    fn test_bank_waits_for_preset() {
        let mut tracker = tracker();

        let update = tracker.record_incoming(&[0xB3, control::BANK, 2]);
        assert_eq!(update, Update::PendingBank { channel: 3, bank: 2 });
        assert!(!update.changes_panel());
        let snapshot = tracker.snapshot(3).unwrap();
        assert_eq!(snapshot.preset, PresetSelection::new(0, 0));
        assert_eq!(snapshot.bank, 2);

        let update = tracker.record_incoming(&[0xC3, 5]);
        assert_eq!(update, Update::Preset {
            channel: 3,
            selection: PresetSelection::new(2, 5),
        });
        assert_eq!(tracker.snapshot(3).unwrap().preset, PresetSelection::new(2, 5));
    }

    #[test]
    fn test_preset_without_bank_uses_last_bank() {
        let mut tracker = tracker();
        tracker
            .record_preset(0, PresetSelection::new(2, 5))
            .unwrap();

        tracker.record_incoming(&[0xC0, 9]);
        assert_eq!(tracker.snapshot(0).unwrap().preset, PresetSelection::new(2, 9));
    }

    #[test]
    fn test_incoming_pitchwheel_uses_msb() {
        let mut tracker = tracker();
        tracker.record_incoming(&[0xE1, 0x00, 0x50]);

        assert_eq!(
            tracker.snapshot(1).unwrap().value(Slot::Command(CommandKind::Pitchwheel)),
            Some(0x50)
        );
    }

    #[test]
    fn test_incoming_pressure_and_aftertouch() {
        let mut tracker = tracker();
        tracker.record_incoming(&[0xD0, 77]);
        tracker.record_incoming(&[0xA0, 60, 33]);

        let snapshot = tracker.snapshot(0).unwrap();
        assert_eq!(snapshot.value(Slot::Command(CommandKind::ChannelPressure)), Some(77));
        assert_eq!(snapshot.value(Slot::Command(CommandKind::Aftertouch)), Some(33));
    }

    #[test]
    fn test_incoming_all_controllers_off_keeps_preset() {
        let mut tracker = tracker();
        tracker
            .record_preset(5, PresetSelection::new(1, 1))
            .unwrap();
        tracker.record_incoming(&[0xB5, control::PAN, 0]);
        tracker.record_incoming(&[0xD5, 100]);

        let update = tracker.record_incoming(&[0xB5, control::ALL_CONTROLLERS_OFF, 0]);
        assert_eq!(update, Update::Reset { channel: 5 });

        let snapshot = tracker.snapshot(5).unwrap();
        assert_eq!(snapshot.values, tracker.power_on_snapshot(5).values);
        assert_eq!(snapshot.preset, PresetSelection::new(1, 1));
    }

    #[test]
    fn test_reset_restores_power_on_snapshot() {
        let mut tracker = tracker();
        tracker.set_default_preset(PresetSelection::new(0, 5));
        tracker
            .record_outgoing(7, Slot::Command(CommandKind::Pitchwheel), 0)
            .unwrap();
        tracker
            .record_preset(7, PresetSelection::new(2, 5))
            .unwrap();

        tracker.reset(7).unwrap();
        assert_eq!(tracker.snapshot(7).unwrap(), tracker.power_on_snapshot(7));
    }

    #[test]
    fn test_unclassified_and_untracked() {
        let mut tracker = tracker();
        let before = tracker.snapshot(0).unwrap();

        assert_eq!(tracker.record_incoming(&[0xF8]), Update::Unclassified);
        assert_eq!(tracker.record_incoming(&[]), Update::Unclassified);
        assert_eq!(tracker.record_incoming(&[0xB0, 7]), Update::Unclassified);
        assert_eq!(tracker.record_incoming(&[0x90, 60, 100]), Update::Untracked { channel: 0 });
        assert_eq!(tracker.record_incoming(&[0xB0, 20, 100]), Update::Untracked { channel: 0 });

        assert_eq!(tracker.snapshot(0).unwrap(), before);
    }

    #[test]
    fn test_status_byte_in_data_position_is_unclassified() {
        let mut tracker = tracker();
        let before = tracker.snapshot(0).unwrap();

        assert_eq!(
            tracker.record_incoming(&[0xB0, control::VOLUME, 0x90]),
            Update::Unclassified
        );
        assert_eq!(tracker.record_incoming(&[0xD0, 0xFF]), Update::Unclassified);
        assert_eq!(tracker.snapshot(0).unwrap(), before);
    }

    #[test]
    fn test_outgoing_rejects_bad_channel_and_value() {
        let mut tracker = tracker();

        assert_eq!(
            tracker.record_outgoing(16, Slot::Control(control::VOLUME), 1),
            Err(HostError::ChannelOutOfRange(16))
        );
        assert_eq!(
            tracker.record_outgoing(0, Slot::Control(control::VOLUME), 128),
            Err(HostError::DataOutOfRange(128))
        );
        assert!(tracker.snapshot(16).is_err());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut tracker = tracker();
        tracker
            .record_outgoing(0, Slot::Control(control::MODWHEEL), 127)
            .unwrap();

        assert_eq!(tracker.snapshot(1).unwrap(), tracker.power_on_snapshot(1));
    }

    proptest! {
        #[test]
        fn prop_snapshot_reflects_newest_value(
            channel in 0u8..16,
            first in 0u8..128,
            second in 0u8..128,
        ) {
            let mut tracker = tracker();
            let slot = Slot::Control(control::EXPRESSION);

            tracker.record_outgoing(channel, slot, first).unwrap();
            prop_assert_eq!(tracker.snapshot(channel).unwrap().value(slot), Some(first));

            tracker.record_incoming(&[0xB0 | channel, control::EXPRESSION, second]);
            prop_assert_eq!(tracker.snapshot(channel).unwrap().value(slot), Some(second));
        }
    }
}
