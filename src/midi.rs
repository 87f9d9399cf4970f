//! MIDI channel-voice types
//!
//! Command kinds, framed messages and decoding of raw inbound bytes.

pub mod control;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of MIDI channels
pub const CHANNEL_COUNT: u8 = 16;

/// Largest value a 7-bit data byte can carry
pub const MAX_DATA: u8 = 0x7F;

/// MIDI channel-voice command, keyed by its upper-nibble status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Note Off: note (0-127), velocity (0-127)
    NoteOff,
    /// Note On: note (0-127), velocity (0-127)
    NoteOn,
    /// Polyphonic key pressure: note (0-127), pressure (0-127)
    Aftertouch,
    /// Control Change: cc (0-127), value (0-127)
    ControlChange,
    /// Program Change: preset (0-127)
    Preset,
    /// Channel Pressure: pressure (0-127)
    ChannelPressure,
    /// Pitch Bend, driven from a single 7-bit value
    Pitchwheel,
}

impl CommandKind {
    /// All commands, in status-code order
    pub const ALL: [CommandKind; 7] = [
        CommandKind::NoteOff,
        CommandKind::NoteOn,
        CommandKind::Aftertouch,
        CommandKind::ControlChange,
        CommandKind::Preset,
        CommandKind::ChannelPressure,
        CommandKind::Pitchwheel,
    ];

    /// Status byte for channel 0
    pub fn status_base(self) -> u8 {
        match self {
            CommandKind::NoteOff => 0x80,
            CommandKind::NoteOn => 0x90,
            CommandKind::Aftertouch => 0xA0,
            CommandKind::ControlChange => 0xB0,
            CommandKind::Preset => 0xC0,
            CommandKind::ChannelPressure => 0xD0,
            CommandKind::Pitchwheel => 0xE0,
        }
    }

    /// Look up the command from a status byte (channel nibble ignored)
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(CommandKind::NoteOff),
            0x90 => Some(CommandKind::NoteOn),
            0xA0 => Some(CommandKind::Aftertouch),
            0xB0 => Some(CommandKind::ControlChange),
            0xC0 => Some(CommandKind::Preset),
            0xD0 => Some(CommandKind::ChannelPressure),
            0xE0 => Some(CommandKind::Pitchwheel),
            _ => None,
        }
    }

    /// Number of bytes on the wire, status included
    pub fn byte_count(self) -> usize {
        match self {
            CommandKind::Preset | CommandKind::ChannelPressure => 2,
            _ => 3,
        }
    }

    /// Value a command row starts at, and returns to on All Controllers Off.
    /// Commands without a settable value return `None`.
    pub fn default_value(self) -> Option<u8> {
        match self {
            CommandKind::Preset => Some(0),
            CommandKind::ChannelPressure => Some(0),
            CommandKind::Pitchwheel => Some(64),
            CommandKind::Aftertouch => Some(0),
            CommandKind::NoteOff | CommandKind::NoteOn | CommandKind::ControlChange => None,
        }
    }

    /// Whether the command gets a row in the commands table
    pub fn has_row(self) -> bool {
        matches!(
            self,
            CommandKind::Preset
                | CommandKind::ChannelPressure
                | CommandKind::Pitchwheel
                | CommandKind::Aftertouch
        )
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::NoteOff => "note off",
            CommandKind::NoteOn => "note on",
            CommandKind::Aftertouch => "aftertouch",
            CommandKind::ControlChange => "control change",
            CommandKind::Preset => "preset",
            CommandKind::ChannelPressure => "channel pressure",
            CommandKind::Pitchwheel => "pitch wheel",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A framed 2- or 3-byte channel-voice message.
///
/// Only the encoder builds these, so the status byte always names a valid command.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    command: CommandKind,
    bytes: [u8; 3],
    len: usize,
}

impl Message {
    pub(crate) fn two(command: CommandKind, channel: u8, data1: u8) -> Self {
        Self {
            command,
            bytes: [command.status_base() | channel, data1, 0],
            len: 2,
        }
    }

    pub(crate) fn three(command: CommandKind, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            command,
            bytes: [command.status_base() | channel, data1, data2],
            len: 3,
        }
    }

    /// Wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn command(&self) -> CommandKind {
        self.command
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    pub fn channel(&self) -> u8 {
        self.bytes[0] & 0x0F
    }

    pub fn data1(&self) -> u8 {
        self.bytes[1]
    }

    /// Second data byte, `None` for 2-byte messages
    pub fn data2(&self) -> Option<u8> {
        (self.len == 3).then_some(self.bytes[2])
    }

    /// Decoded view of this message
    pub fn voice(&self) -> ChannelVoice {
        ChannelVoice {
            command: self.command,
            channel: self.channel(),
            data1: self.data1(),
            data2: self.data2().unwrap_or(0),
        }
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({})", format_hex(self.as_bytes()))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.voice(), f)
    }
}

/// Channel-voice message decoded from raw inbound bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelVoice {
    pub command: CommandKind,
    /// Channel (0-15)
    pub channel: u8,
    pub data1: u8,
    /// Zero for 2-byte commands
    pub data2: u8,
}

impl ChannelVoice {
    /// Decode a channel-voice message from raw bytes.
    ///
    /// Returns `None` for system messages, running-status data, messages
    /// shorter than their command requires, and data bytes above 127.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        // Running status would need the previous status byte
        if status < 0x80 {
            return None;
        }

        let command = CommandKind::from_status(status)?;
        let count = command.byte_count();
        if data.len() < count {
            return None;
        }

        // A status byte in a data position means the message was cut short
        if data[1..count].iter().any(|&b| b > MAX_DATA) {
            return None;
        }

        Some(ChannelVoice {
            command,
            channel: status & 0x0F,
            data1: data[1],
            data2: if count == 3 { data[2] } else { 0 },
        })
    }
}

impl fmt::Display for ChannelVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel + 1;
        match self.command {
            CommandKind::NoteOff => {
                write!(f, "NoteOff ch:{} n:{} v:{}", ch, self.data1, self.data2)
            }
            CommandKind::NoteOn => write!(f, "NoteOn ch:{} n:{} v:{}", ch, self.data1, self.data2),
            CommandKind::Aftertouch => {
                write!(f, "Aftertouch ch:{} n:{} p:{}", ch, self.data1, self.data2)
            }
            CommandKind::ControlChange => {
                write!(f, "CC ch:{} cc:{} v:{}", ch, self.data1, self.data2)
            }
            CommandKind::Preset => write!(f, "Preset ch:{} p:{}", ch, self.data1),
            CommandKind::ChannelPressure => {
                write!(f, "ChannelPressure ch:{} p:{}", ch, self.data1)
            }
            CommandKind::Pitchwheel => {
                write!(f, "PitchWheel ch:{} v:{}/{}", ch, self.data1, self.data2)
            }
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
