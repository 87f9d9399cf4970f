//! Host - coordinates the synth, the tracker and the panel
//!
//! Every user-level operation goes through here:
//! - encode the message(s) for the active channel
//! - send them to the synth (and the passthrough device, if any)
//! - record what was sent in the tracker
//!
//! Incoming device bytes take the reverse path: the tracker records them,
//! the host says whether the visible channel needs a repaint, and the bytes
//! are forwarded to the synth unchanged.
//!
//! Send failures are logged with the bytes involved and never abort an
//! operation; a multi-message sequence always runs to the end.

mod notes;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Preset, PresetSelection, SoundFont};
use crate::encoder;
use crate::error::{HostError, HostResult};
use crate::midi::{control, format_hex, CommandKind, Message};
use crate::panel::{self, Layout, RowView};
use crate::state::{ChannelSnapshot, Slot, Tracker, Update};
use crate::synth::{Capabilities, Sink, Synth};

pub use notes::{Note, NotePanel, Sounding};

/// What the panel shows for the active channel
#[derive(Debug, Clone, Serialize)]
pub struct PanelView {
    pub synth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Channel (0-15)
    pub channel: u8,
    pub font: Option<String>,
    pub preset: String,
    pub rows: Vec<RowView>,
    pub notes: Vec<Note>,
    pub hold: bool,
}

pub struct Host {
    synth: Box<dyn Synth>,
    passthrough: Option<Box<dyn Sink>>,
    capabilities: Capabilities,
    layout: Layout,
    tracker: Tracker,
    notes: NotePanel,
    channel: u8,
    font: usize,
}

impl Host {
    /// Open the synth and bring every addressable channel to its power-on state
    pub fn new(mut synth: Box<dyn Synth>, passthrough: Option<Box<dyn Sink>>) -> Result<Self> {
        synth.open()?;

        let capabilities = synth.capabilities().clone();
        let default_preset = synth
            .catalog()
            .font(0)
            .and_then(SoundFont::first)
            .map(Preset::selection)
            .unwrap_or_default();

        let mut host = Self {
            layout: Layout::new(&capabilities),
            tracker: Tracker::new(&capabilities, default_preset),
            notes: NotePanel::new(capabilities.polyphonic),
            capabilities,
            synth,
            passthrough,
            channel: 0,
            font: 0,
        };

        if !host.synth.catalog().is_empty() {
            host.load_font(0)?;
        }

        for channel in 0..host.capabilities.channel_count() {
            host.all_controllers_off(channel)?;
        }

        info!(
            "🎹 Host ready: {} ({} channel(s), {} sound font(s))",
            host.synth.name(),
            host.capabilities.channel_count(),
            host.synth.catalog().len()
        );
        Ok(host)
    }

    // ===== Accessors =====

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn font_id(&self) -> usize {
        self.font
    }

    pub fn font(&self) -> Option<&SoundFont> {
        self.synth.catalog().font(self.font)
    }

    pub fn synth(&self) -> &dyn Synth {
        self.synth.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn notes(&self) -> &NotePanel {
        &self.notes
    }

    /// Snapshot of the active channel
    pub fn snapshot(&self) -> HostResult<ChannelSnapshot> {
        self.tracker.snapshot(self.channel)
    }

    pub fn view(&self) -> HostResult<PanelView> {
        let snapshot = self.snapshot()?;
        let font = self.font();

        Ok(PanelView {
            synth: self.synth.name().to_string(),
            url: self.synth.url().map(str::to_string),
            channel: self.channel,
            font: font.map(|f| f.name().to_string()),
            preset: match font {
                Some(f) => f.display_name(snapshot.preset),
                None => snapshot.preset.to_string(),
            },
            rows: self.layout.render(&snapshot, font),
            notes: self.notes.notes().to_vec(),
            hold: self.notes.hold(),
        })
    }

    // ===== Send boundary =====

    fn send(&mut self, message: &Message) {
        debug!("→ {} [{}]", message, format_hex(message.as_bytes()));
        self.send_raw(message.as_bytes());
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        if let Err(e) = self.synth.send(bytes) {
            warn!("⚠️ Synth send failed [{}]: {}", format_hex(bytes), e);
        }
        if let Some(passthrough) = self.passthrough.as_mut() {
            if let Err(e) = passthrough.send(bytes) {
                warn!("⚠️ Passthrough send failed [{}]: {}", format_hex(bytes), e);
            }
        }
    }

    fn send_all(&mut self, messages: &[Message]) {
        for message in messages {
            self.send(message);
        }
    }

    fn require(&self, command: CommandKind) -> HostResult<()> {
        if self.capabilities.supports(command) {
            Ok(())
        } else {
            Err(HostError::Unsupported(command))
        }
    }

    // ===== Channel and sound font =====

    /// Make `channel` the active one. Nothing is sent and nothing is recorded;
    /// the returned snapshot is what the panel repaints from.
    pub fn select_channel(&mut self, channel: u8) -> HostResult<ChannelSnapshot> {
        if channel >= self.capabilities.channel_count() {
            return Err(HostError::ChannelOutOfRange(channel));
        }
        self.channel = channel;
        debug!("Active channel: {}", channel + 1);
        self.tracker.snapshot(channel)
    }

    fn load_font(&mut self, font_id: usize) -> HostResult<PresetSelection> {
        let font = self
            .synth
            .catalog()
            .font(font_id)
            .cloned()
            .ok_or(HostError::UnknownFont(font_id))?;

        if let Err(e) = self.synth.set_sound_font(&font) {
            warn!("⚠️ Synth could not switch to '{}': {}", font.name(), e);
        }

        let first = font.first().map(Preset::selection).unwrap_or_default();
        self.tracker.set_default_preset(first);
        self.font = font_id;
        info!("🎼 Sound font: {}", font.name());
        Ok(first)
    }

    /// Switch sound font and select its first preset on the active channel
    pub fn select_font(&mut self, font_id: usize) -> HostResult<ChannelSnapshot> {
        let first = self.load_font(font_id)?;
        if self.capabilities.supports(CommandKind::Preset) {
            self.send_preset(self.channel, first)?;
        }
        self.snapshot()
    }

    // ===== Presets =====

    fn send_preset(&mut self, channel: u8, selection: PresetSelection) -> HostResult<()> {
        let messages = encoder::preset_selection(channel, selection)?;
        self.send_all(&messages);
        self.tracker.record_preset(channel, selection)?;
        Ok(())
    }

    /// Select the preset at `index` in the active font's selector
    pub fn select_preset(&mut self, index: usize) -> HostResult<ChannelSnapshot> {
        let selection = self
            .synth
            .catalog()
            .presets_for(self.font)
            .and_then(|presets| presets.get(index))
            .map(Preset::selection)
            .ok_or(HostError::UnknownPreset(index))?;
        self.select_bank_preset(selection.bank, selection.preset)
    }

    /// Send CC BANK then PRESET on the active channel
    pub fn select_bank_preset(&mut self, bank: u8, preset: u8) -> HostResult<ChannelSnapshot> {
        self.require(CommandKind::Preset)?;
        let selection = PresetSelection::new(bank, preset);
        self.send_preset(self.channel, selection)?;
        info!(
            "Preset ch:{} {}",
            self.channel + 1,
            self.font()
                .map(|f| f.display_name(selection))
                .unwrap_or_else(|| selection.to_string())
        );
        self.snapshot()
    }

    // ===== Commands and controls =====

    fn send_command_value(&mut self, command: CommandKind, value: u8) -> HostResult<()> {
        match command {
            CommandKind::Aftertouch => {
                let mut messages = Vec::new();
                for key in self.notes.aftertouch_targets() {
                    messages.push(encoder::encode(command, self.channel, key, Some(value))?);
                }
                self.send_all(&messages);
            }
            CommandKind::ChannelPressure | CommandKind::Pitchwheel => {
                let message = encoder::encode(command, self.channel, value, None)?;
                self.send(&message);
            }
            _ => return Err(HostError::Unsupported(command)),
        }
        self.tracker
            .record_outgoing(self.channel, Slot::Command(command), value)?;
        Ok(())
    }

    /// Set CHANNEL_PRESSURE, PITCHWHEEL or AFTERTOUCH on the active channel.
    /// Aftertouch goes to every enabled note of the note panel.
    pub fn set_command(&mut self, command: CommandKind, value: u8) -> HostResult<()> {
        self.require(command)?;
        self.send_command_value(command, value)
    }

    fn send_control_value(&mut self, cc: u8, value: u8) -> HostResult<()> {
        let message = encoder::control_change(self.channel, cc, value)?;
        self.send(&message);
        self.tracker
            .record_outgoing(self.channel, Slot::Control(cc), value)?;
        Ok(())
    }

    /// Set a long control on the active channel. For item controls, `value`
    /// is the item index.
    pub fn set_control(&mut self, cc: u8, value: u8) -> HostResult<()> {
        let row = self
            .layout
            .control(cc)
            .filter(|row| row.is_long())
            .ok_or(HostError::UnknownControl(cc))?;
        let cc = row.cc();

        let wire = match row.items {
            Some(items) if value >= items => return Err(HostError::DataOutOfRange(value)),
            Some(items) => panel::value_from_index(value, items),
            None => value,
        };
        self.send_control_value(cc, wire)
    }

    /// Send a trigger-only control on the active channel
    pub fn send_short_control(&mut self, cc: u8) -> HostResult<()> {
        let cc = self
            .layout
            .control(cc)
            .filter(|row| !row.is_long())
            .map(|row| row.cc())
            .ok_or(HostError::UnknownControl(cc))?;

        match cc {
            control::ALL_CONTROLLERS_OFF => {
                self.all_controllers_off(self.channel)?;
            }
            _ => {
                let message = encoder::control_change(self.channel, cc, 0)?;
                self.send(&message);
                if matches!(cc, control::ALL_NOTES_OFF | control::ALL_SOUND_OFF) {
                    self.notes.clear_sounding();
                }
            }
        }
        Ok(())
    }

    /// Reset the tracker channel, then send the All Controllers Off sequence
    fn all_controllers_off(&mut self, channel: u8) -> HostResult<()> {
        self.tracker.reset(channel)?;
        let messages = encoder::all_controllers_off(
            channel,
            &self.capabilities,
            self.tracker.default_preset(),
            &self.notes.aftertouch_targets(),
        )?;
        debug!("All controllers off ch:{} ({} messages)", channel + 1, messages.len());
        self.send_all(&messages);
        Ok(())
    }

    /// Send the tracked value of `slot` on the active channel again
    pub fn resend(&mut self, slot: Slot) -> HostResult<()> {
        let snapshot = self.snapshot()?;
        match slot {
            Slot::Command(CommandKind::Preset) | Slot::Control(control::BANK) => {
                self.require(CommandKind::Preset)?;
                self.send_preset(self.channel, snapshot.preset)
            }
            Slot::Command(command) => {
                let value = snapshot
                    .value(slot)
                    .ok_or(HostError::Unsupported(command))?;
                self.send_command_value(command, value)
            }
            Slot::Control(cc) => {
                let value = snapshot.value(slot).ok_or(HostError::UnknownControl(cc))?;
                self.send_control_value(cc, value)
            }
        }
    }

    // ===== Notes =====

    pub fn set_note(&mut self, index: usize, key: u8, velocity: u8) -> HostResult<()> {
        self.notes.set_note(index, key, velocity)
    }

    pub fn set_note_enabled(&mut self, index: usize, enabled: bool) -> HostResult<()> {
        self.notes.set_enabled(index, enabled)
    }

    /// Start the enabled notes on the active channel
    pub fn note_on(&mut self) -> HostResult<()> {
        self.require(CommandKind::NoteOn)?;
        let mut messages = Vec::new();
        for note in self.notes.press(self.channel) {
            messages.push(encoder::encode(
                CommandKind::NoteOn,
                self.channel,
                note.key,
                Some(note.velocity),
            )?);
        }
        self.send_all(&messages);
        Ok(())
    }

    /// Let the notes go; nothing is sent while hold is on
    pub fn note_off(&mut self) -> HostResult<()> {
        let released = self.notes.release();
        self.send_releases(&released)
    }

    /// Set the hold switch. Clearing it releases the held notes.
    pub fn set_hold(&mut self, hold: bool) -> HostResult<()> {
        let released = self.notes.set_hold(hold);
        self.send_releases(&released)
    }

    /// NOTE_OFF, or NOTE_ON with velocity 0 when the synth lacks NOTE_OFF
    fn send_releases(&mut self, released: &[Sounding]) -> HostResult<()> {
        let mut messages = Vec::with_capacity(released.len());
        for sounding in released {
            let message = if self.capabilities.supports(CommandKind::NoteOff) {
                encoder::encode(
                    CommandKind::NoteOff,
                    sounding.channel,
                    sounding.note.key,
                    Some(sounding.note.velocity),
                )?
            } else {
                encoder::encode(CommandKind::NoteOn, sounding.channel, sounding.note.key, Some(0))?
            };
            messages.push(message);
        }
        self.send_all(&messages);
        Ok(())
    }

    // ===== Incoming =====

    /// Record bytes from the input device and forward them to the synth.
    ///
    /// Returns the active channel's snapshot when its widgets need a repaint.
    pub fn handle_incoming(&mut self, raw: &[u8]) -> Option<ChannelSnapshot> {
        if raw.is_empty() {
            return None;
        }

        let update = self.tracker.record_incoming(raw);

        if let Err(e) = self.synth.send(raw) {
            warn!("⚠️ Synth forward failed [{}]: {}", format_hex(raw), e);
        }

        let repaint = match update {
            Update::PendingBank { .. } => self.layout.shows_bank(),
            update => update.changes_panel(),
        };
        if repaint && update.channel() == Some(self.channel) {
            self.snapshot().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests;
