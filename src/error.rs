//! Error types for the control panel core
//!
//! Nothing here is fatal to the process: every variant degrades to a message
//! shown to the user or a logged warning.

use thiserror::Error;

use crate::midi::CommandKind;

/// Failures reported by the encoder, tracker and host operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Command code is not a channel-voice command, or channel is outside 0-15.
    /// The message is not sent.
    #[error("cannot encode command 0x{status:02X} on channel {channel}")]
    UnencodableCommand { status: u8, channel: u8 },

    /// A data byte would collide with the status-byte range
    #[error("data byte {0} is outside 0-127")]
    DataOutOfRange(u8),

    /// Channel index outside 0-15
    #[error("channel {0} is outside 0-15")]
    ChannelOutOfRange(u8),

    /// Hardware input device could not be opened
    #[error("can't open input device '{pattern}': {reason}")]
    DeviceOpen { pattern: String, reason: String },

    /// Sound font index not in the catalog
    #[error("no sound font at index {0}")]
    UnknownFont(usize),

    /// Preset index not in the active sound font
    #[error("no preset at index {0} in the active sound font")]
    UnknownPreset(usize),

    /// Note slot outside the note panel
    #[error("no note {0} on the note panel")]
    UnknownNote(usize),

    /// The synth does not declare support for this command
    #[error("the synth does not support {0}")]
    Unsupported(CommandKind),

    /// The synth does not declare this control, or it has no value to set
    #[error("CC {0} is not a settable control of this synth")]
    UnknownControl(u8),
}

pub type HostResult<T> = std::result::Result<T, HostError>;
