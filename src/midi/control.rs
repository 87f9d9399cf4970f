//! Continuous Controller (CC) table
//!
//! Controls with a default value are "long" controls that carry a 7-bit value.
//! Controls without one are "short" stateless triggers.

pub const BANK: u8 = 0;
pub const MODWHEEL: u8 = 1;
pub const DATA_ENTRY_COARSE: u8 = 6;
pub const VOLUME: u8 = 7;
pub const PAN: u8 = 10;
pub const EXPRESSION: u8 = 11;
pub const DATA_ENTRY_FINE: u8 = 38;
pub const SUSTAIN: u8 = 64;
pub const REVERBERATION: u8 = 91;
pub const CHORUS: u8 = 93;
pub const REGISTERED_PARAMETER_FINE: u8 = 100;
pub const REGISTERED_PARAMETER_COARSE: u8 = 101;
pub const ALL_SOUND_OFF: u8 = 120;
pub const ALL_CONTROLLERS_OFF: u8 = 121;
pub const ALL_NOTES_OFF: u8 = 123;

/// Display name of a known control, `None` for unnamed indices.
///
/// Coarse/fine pairs share a name so the panel shows them as one control.
pub fn name(cc: u8) -> Option<&'static str> {
    Some(match cc {
        BANK => "bank",
        MODWHEEL => "modulation wheel",
        DATA_ENTRY_COARSE | DATA_ENTRY_FINE => "data entry",
        VOLUME => "volume",
        PAN => "pan",
        EXPRESSION => "expression",
        SUSTAIN => "sustain pedal",
        REVERBERATION => "reverberation",
        CHORUS => "chorus",
        REGISTERED_PARAMETER_FINE | REGISTERED_PARAMETER_COARSE => "registered parameter",
        ALL_SOUND_OFF => "all sound off",
        ALL_CONTROLLERS_OFF => "all controllers off",
        ALL_NOTES_OFF => "all notes off",
        _ => return None,
    })
}

/// Name shown for any index
pub fn display_name(cc: u8) -> String {
    name(cc).map(str::to_string).unwrap_or_else(|| format!("CC {}", cc))
}

/// Power-on value of a long control, `None` for short or unknown controls
pub fn default_value(cc: u8) -> Option<u8> {
    match cc {
        BANK => Some(0),
        MODWHEEL => Some(0),
        DATA_ENTRY_COARSE => Some(2), // pitch bend sensitivity, in semitones
        DATA_ENTRY_FINE => Some(0),
        VOLUME => Some(100),
        PAN => Some(64),
        EXPRESSION => Some(127),
        SUSTAIN => Some(0),
        REVERBERATION => Some(40),
        CHORUS => Some(0),
        REGISTERED_PARAMETER_FINE | REGISTERED_PARAMETER_COARSE => Some(0),
        _ => None,
    }
}

/// Whether a known control is a stateless trigger
pub fn is_short(cc: u8) -> bool {
    matches!(cc, ALL_SOUND_OFF | ALL_CONTROLLERS_OFF | ALL_NOTES_OFF)
}
