//! Message encoder
//!
//! Stateless mapping from (command, channel, data) to framed MIDI bytes, plus
//! the two multi-message protocols the panel relies on:
//!
//! - **Preset selection** is always CC BANK followed by PRESET on the same
//!   channel. The synth latches the bank before the program change arrives,
//!   so the order is part of the protocol.
//! - **All Controllers Off** first re-sends the default of every declared
//!   command, then the literal ALL_CONTROLLERS_OFF control change, so the
//!   synth ends up in the same state the tracker was reset to.

use crate::catalog::PresetSelection;
use crate::error::{HostError, HostResult};
use crate::midi::{control, CommandKind, Message, CHANNEL_COUNT, MAX_DATA};
use crate::synth::Capabilities;

/// Encode one channel-voice message.
///
/// - NOTE_ON, NOTE_OFF, AFTERTOUCH, CONTROL_CHANGE: `[status, data1, data2]`,
///   a missing `data2` is sent as 0
/// - PRESET, CHANNEL_PRESSURE: `[status, data1]`
/// - PITCHWHEEL: `[status, data1, data1]`; one 7-bit value drives both bytes so
///   evenly spaced slider steps cover the whole bend range. `data2` is ignored.
pub fn encode(
    command: CommandKind,
    channel: u8,
    data1: u8,
    data2: Option<u8>,
) -> HostResult<Message> {
    if channel >= CHANNEL_COUNT {
        return Err(HostError::UnencodableCommand {
            status: command.status_base(),
            channel,
        });
    }
    check_data(data1)?;

    Ok(match command {
        CommandKind::NoteOn
        | CommandKind::NoteOff
        | CommandKind::Aftertouch
        | CommandKind::ControlChange => {
            let data2 = data2.unwrap_or(0);
            check_data(data2)?;
            Message::three(command, channel, data1, data2)
        }
        CommandKind::Preset | CommandKind::ChannelPressure => Message::two(command, channel, data1),
        CommandKind::Pitchwheel => Message::three(command, channel, data1, data1),
    })
}

/// Encode from a raw command code (e.g. `0xB0`), which may not name a command
pub fn encode_status(
    status_base: u8,
    channel: u8,
    data1: u8,
    data2: Option<u8>,
) -> HostResult<Message> {
    match CommandKind::from_status(status_base) {
        Some(command) if status_base & 0x0F == 0 => encode(command, channel, data1, data2),
        _ => Err(HostError::UnencodableCommand {
            status: status_base,
            channel,
        }),
    }
}

fn check_data(value: u8) -> HostResult<()> {
    if value > MAX_DATA {
        return Err(HostError::DataOutOfRange(value));
    }
    Ok(())
}

/// Control change on a channel
pub fn control_change(channel: u8, cc: u8, value: u8) -> HostResult<Message> {
    encode(CommandKind::ControlChange, channel, cc, Some(value))
}

/// The two-step preset selection: CC BANK, then PRESET
pub fn preset_selection(channel: u8, selection: PresetSelection) -> HostResult<[Message; 2]> {
    let bank = control_change(channel, control::BANK, selection.bank)?;
    let preset = encode(CommandKind::Preset, channel, selection.preset, None)?;
    Ok([bank, preset])
}

/// The All Controllers Off sequence for one channel:
///
/// 1. default preset selection (bank, then preset), if PRESET is supported
/// 2. CHANNEL_PRESSURE default, if supported
/// 3. PITCHWHEEL default, if supported
/// 4. AFTERTOUCH default to each of `aftertouch_notes`, if supported
/// 5. CC ALL_CONTROLLERS_OFF
pub fn all_controllers_off(
    channel: u8,
    capabilities: &Capabilities,
    default_preset: PresetSelection,
    aftertouch_notes: &[u8],
) -> HostResult<Vec<Message>> {
    let mut messages = Vec::with_capacity(6 + aftertouch_notes.len());

    if capabilities.supports(CommandKind::Preset) {
        messages.extend(preset_selection(channel, default_preset)?);
    }

    for command in [CommandKind::ChannelPressure, CommandKind::Pitchwheel] {
        if capabilities.supports(command) {
            if let Some(value) = command.default_value() {
                messages.push(encode(command, channel, value, None)?);
            }
        }
    }

    if capabilities.supports(CommandKind::Aftertouch) {
        let pressure = CommandKind::Aftertouch.default_value().unwrap_or(0);
        for &note in aftertouch_notes {
            messages.push(encode(CommandKind::Aftertouch, channel, note, Some(pressure))?);
        }
    }

    messages.push(control_change(channel, control::ALL_CONTROLLERS_OFF, 0)?);
    Ok(messages)
}
