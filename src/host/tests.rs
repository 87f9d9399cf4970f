//! Tests for Host module

use super::*;
use crate::catalog::tests::piano_and_strings;
use crate::catalog::Catalog;
use crate::synth::tests::full_capabilities;
use crate::synth::{ConsoleSynth, ControlSpec, SentLog};

fn catalog() -> Catalog {
    Catalog::from_config(&piano_and_strings()).unwrap()
}

/// Host on a console synth, with the startup messages already cleared
fn make_host(capabilities: Capabilities) -> (Host, SentLog) {
    let synth = ConsoleSynth::new("Test Synth", capabilities, catalog());
    let log = synth.log();
    let host = Host::new(Box::new(synth), None).unwrap();
    log.clear();
    (host, log)
}

/// Console synth that rejects every message with one command nibble
struct FlakySynth {
    inner: ConsoleSynth,
    reject: u8,
}

impl Sink for FlakySynth {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if message.first().map(|s| s & 0xF0) == Some(self.reject) {
            anyhow::bail!("port closed");
        }
        self.inner.send(message)
    }
}

impl Synth for FlakySynth {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> &Capabilities {
        self.inner.capabilities()
    }

    fn catalog(&self) -> &Catalog {
        self.inner.catalog()
    }

    fn open(&mut self) -> Result<()> {
        self.inner.open()
    }
}

#[test]
fn test_startup_resets_every_channel() {
    let synth = ConsoleSynth::new("Test Synth", full_capabilities(), catalog());
    let log = synth.log();
    let host = Host::new(Box::new(synth), None).unwrap();

    let sent = log.messages();
    // preset pair, pressure, pitch wheel, aftertouch per note, controllers off
    assert_eq!(sent.len(), 16 * 7);
    assert_eq!(
        sent[..7].to_vec(),
        vec![
            vec![0xB0, 0x00, 0],
            vec![0xC0, 0],
            vec![0xD0, 0],
            vec![0xE0, 64, 64],
            vec![0xA0, 64, 0],
            vec![0xA0, 68, 0],
            vec![0xB0, 121, 0],
        ]
    );
    assert_eq!(sent[7][0], 0xB1);
    assert_eq!(host.channel(), 0);
    assert_eq!(host.font().map(|f| f.name()), Some("Grand Piano"));
}

#[test]
fn test_single_channel_synth() {
    let mut caps = full_capabilities();
    caps.multi_channel = false;

    let synth = ConsoleSynth::new("Mono", caps, catalog());
    let log = synth.log();
    let mut host = Host::new(Box::new(synth), None).unwrap();

    assert!(log.messages().iter().all(|m| m[0] & 0x0F == 0));
    assert_eq!(host.select_channel(1), Err(HostError::ChannelOutOfRange(1)));
}

#[test]
fn test_preset_selection_sends_bank_then_preset() {
    let (mut host, log) = make_host(full_capabilities());
    host.select_channel(3).unwrap();

    let snapshot = host.select_bank_preset(2, 5).unwrap();

    assert_eq!(log.messages(), vec![vec![0xB3, 0x00, 2], vec![0xC3, 5]]);
    assert_eq!(snapshot.preset, PresetSelection::new(2, 5));
    assert_eq!(host.view().unwrap().preset, "Detuned EP");
}

#[test]
fn test_select_preset_by_index() {
    let (mut host, log) = make_host(full_capabilities());

    host.select_preset(1).unwrap();
    assert_eq!(log.messages(), vec![vec![0xB0, 0x00, 0], vec![0xC0, 5]]);

    assert_eq!(host.select_preset(9), Err(HostError::UnknownPreset(9)));
}

#[test]
fn test_channel_switch_sends_nothing() {
    let (mut host, log) = make_host(full_capabilities());
    host.set_control(control::VOLUME, 90).unwrap();
    host.set_command(CommandKind::Pitchwheel, 100).unwrap();
    let before = host.snapshot().unwrap();
    log.clear();

    let other = host.select_channel(5).unwrap();
    assert_eq!(other, host.tracker().power_on_snapshot(5));
    let back = host.select_channel(0).unwrap();

    assert_eq!(back, before);
    assert!(log.is_empty());
}

#[test]
fn test_all_controllers_off_restores_power_on_state() {
    let (mut host, log) = make_host(full_capabilities());
    host.select_channel(2).unwrap();
    host.set_command(CommandKind::Pitchwheel, 0).unwrap();
    host.set_command(CommandKind::ChannelPressure, 90).unwrap();
    host.set_control(control::PAN, 0).unwrap();
    host.select_bank_preset(2, 5).unwrap();
    log.clear();

    host.send_short_control(control::ALL_CONTROLLERS_OFF).unwrap();

    assert_eq!(host.snapshot().unwrap(), host.tracker().power_on_snapshot(2));
    assert_eq!(log.messages().last(), Some(&vec![0xB2, 121, 0]));
    assert_eq!(log.messages()[..2].to_vec(), vec![vec![0xB2, 0, 0], vec![0xC2, 0]]);
}

#[test]
fn test_incoming_bank_and_preset_resolve() {
    let (mut host, log) = make_host(full_capabilities());

    assert_eq!(host.handle_incoming(&[0xB0, 0x00, 2]), None);
    let repaint = host.handle_incoming(&[0xC0, 5]).unwrap();

    let resolved = catalog().resolve(0, 2, 5).cloned().unwrap();
    let font = host.font().unwrap();
    assert_eq!(font.resolve(repaint.preset.bank, repaint.preset.preset), Some(&resolved));
    assert_eq!(log.messages(), vec![vec![0xB0, 0x00, 2], vec![0xC0, 5]]);
}

#[test]
fn test_incoming_repaints_only_active_channel() {
    let (mut host, _log) = make_host(full_capabilities());

    let repaint = host.handle_incoming(&[0xB0, control::VOLUME, 30]).unwrap();
    assert_eq!(repaint.value(Slot::Control(control::VOLUME)), Some(30));

    assert_eq!(host.handle_incoming(&[0xB4, control::VOLUME, 30]), None);
    assert_eq!(
        host.tracker()
            .snapshot(4)
            .unwrap()
            .value(Slot::Control(control::VOLUME)),
        Some(30)
    );
}

#[test]
fn test_outgoing_then_incoming_keeps_newest() {
    let (mut host, _log) = make_host(full_capabilities());
    host.set_control(control::EXPRESSION, 10).unwrap();
    host.handle_incoming(&[0xB0, control::EXPRESSION, 99]);

    let snapshot = host.snapshot().unwrap();
    assert_eq!(snapshot.value(Slot::Control(control::EXPRESSION)), Some(99));
}

#[test]
fn test_unknown_incoming_is_still_forwarded() {
    let (mut host, log) = make_host(full_capabilities());
    let before = host.snapshot().unwrap();

    assert_eq!(host.handle_incoming(&[0xF8]), None);
    assert_eq!(host.handle_incoming(&[0x40, 0x10]), None);
    assert_eq!(host.handle_incoming(&[0x90, 60, 100]), None);

    assert_eq!(log.messages(), vec![vec![0xF8], vec![0x40, 0x10], vec![0x90, 60, 100]]);
    assert_eq!(host.snapshot().unwrap(), before);
}

#[test]
fn test_send_failure_does_not_abort_sequence() {
    let inner = ConsoleSynth::new("Flaky", full_capabilities(), catalog());
    let log = inner.log();
    let synth = FlakySynth {
        inner,
        reject: 0xD0,
    };
    let mut host = Host::new(Box::new(synth), None).unwrap();
    log.clear();

    host.send_short_control(control::ALL_CONTROLLERS_OFF).unwrap();

    let sent = log.messages();
    assert!(sent.iter().all(|m| m[0] & 0xF0 != 0xD0));
    assert_eq!(sent.len(), 6);
    assert_eq!(sent.last(), Some(&vec![0xB0, 121, 0]));
}

#[test]
fn test_passthrough_gets_a_copy() {
    let mirror = ConsoleSynth::new("Mirror", full_capabilities(), Catalog::default());
    let mirror_log = mirror.log();

    let synth = ConsoleSynth::new("Test Synth", full_capabilities(), catalog());
    let log = synth.log();
    let mut host = Host::new(Box::new(synth), Some(Box::new(mirror))).unwrap();
    log.clear();
    mirror_log.clear();

    host.set_command(CommandKind::ChannelPressure, 12).unwrap();
    assert_eq!(log.messages(), vec![vec![0xD0, 12]]);
    assert_eq!(mirror_log.messages(), vec![vec![0xD0, 12]]);
}

#[test]
fn test_note_off_falls_back_to_zero_velocity() {
    let mut caps = full_capabilities();
    caps.commands.retain(|c| *c != CommandKind::NoteOff);
    caps.polyphonic = false;
    let (mut host, log) = make_host(caps);

    host.set_note(0, 60, 90).unwrap();
    host.note_on().unwrap();
    host.note_off().unwrap();

    assert_eq!(log.messages(), vec![vec![0x90, 60, 90], vec![0x90, 60, 0]]);
}

#[test]
fn test_note_off_uses_note_off_when_declared() {
    let mut caps = full_capabilities();
    caps.polyphonic = false;
    let (mut host, log) = make_host(caps);

    host.note_on().unwrap();
    host.note_off().unwrap();

    assert_eq!(log.messages(), vec![vec![0x90, 64, 100], vec![0x80, 64, 100]]);
}

#[test]
fn test_hold_releases_on_clear() {
    let (mut host, log) = make_host(full_capabilities());
    host.set_hold(true).unwrap();

    host.note_on().unwrap();
    host.note_off().unwrap();
    assert_eq!(log.len(), 2);

    // Held notes stop on the channel they started on
    host.select_channel(6).unwrap();
    host.set_hold(false).unwrap();
    assert_eq!(
        log.messages()[2..].to_vec(),
        vec![vec![0x80, 64, 100], vec![0x80, 68, 100]]
    );
}

#[test]
fn test_aftertouch_goes_to_enabled_notes() {
    let (mut host, log) = make_host(full_capabilities());

    host.set_command(CommandKind::Aftertouch, 50).unwrap();
    assert_eq!(log.messages(), vec![vec![0xA0, 64, 50], vec![0xA0, 68, 50]]);

    log.clear();
    host.set_note_enabled(0, false).unwrap();
    host.set_command(CommandKind::Aftertouch, 51).unwrap();
    assert_eq!(log.messages(), vec![vec![0xA0, 68, 51]]);
    assert_eq!(
        host.snapshot().unwrap().value(Slot::Command(CommandKind::Aftertouch)),
        Some(51)
    );
}

#[test]
fn test_item_control_sends_mapped_value() {
    let mut caps = full_capabilities();
    caps.controls.push(ControlSpec {
        cc: 20,
        name: Some("filter".to_string()),
        default: Some(16),
        items: Some(4),
    });
    let (mut host, log) = make_host(caps);

    host.set_control(20, 3).unwrap();
    assert_eq!(log.messages(), vec![vec![0xB0, 20, 111]]);
    assert_eq!(host.snapshot().unwrap().value(Slot::Control(20)), Some(111));

    let view = host.view().unwrap();
    let row = view.rows.iter().find(|r| r.name == "filter").unwrap();
    assert_eq!(row.value, Some(3));

    assert_eq!(host.set_control(20, 4), Err(HostError::DataOutOfRange(4)));
}

#[test]
fn test_merged_control_sends_first_index() {
    let mut caps = full_capabilities();
    caps.controls.push(ControlSpec::new(control::DATA_ENTRY_FINE));
    let (mut host, log) = make_host(caps);

    host.set_control(control::DATA_ENTRY_FINE, 12).unwrap();
    assert_eq!(log.messages(), vec![vec![0xB0, control::DATA_ENTRY_COARSE, 12]]);
}

#[test]
fn test_select_font_switches_default_preset() {
    let (mut host, log) = make_host(full_capabilities());

    let snapshot = host.select_font(1).unwrap();
    assert_eq!(log.messages(), vec![vec![0xB0, 0x00, 1], vec![0xC0, 48]]);
    assert_eq!(snapshot.preset, PresetSelection::new(1, 48));
    assert_eq!(host.tracker().default_preset(), PresetSelection::new(1, 48));
    assert_eq!(host.view().unwrap().preset, "String Ensemble");

    assert_eq!(host.select_font(7), Err(HostError::UnknownFont(7)));
    assert_eq!(host.font_id(), 1);
}

#[test]
fn test_resend_uses_tracked_value() {
    let (mut host, log) = make_host(full_capabilities());
    host.set_control(control::VOLUME, 77).unwrap();
    host.select_bank_preset(2, 5).unwrap();
    log.clear();

    host.resend(Slot::Control(control::VOLUME)).unwrap();
    host.resend(Slot::Command(CommandKind::Preset)).unwrap();
    host.resend(Slot::Command(CommandKind::Pitchwheel)).unwrap();

    assert_eq!(
        log.messages(),
        vec![
            vec![0xB0, control::VOLUME, 77],
            vec![0xB0, 0x00, 2],
            vec![0xC0, 5],
            vec![0xE0, 64, 64],
        ]
    );
}

#[test]
fn test_unsupported_operations_send_nothing() {
    let mut caps = full_capabilities();
    caps.commands = vec![CommandKind::NoteOn, CommandKind::ControlChange];
    let (mut host, log) = make_host(caps);

    assert_eq!(
        host.set_command(CommandKind::Pitchwheel, 3),
        Err(HostError::Unsupported(CommandKind::Pitchwheel))
    );
    assert_eq!(
        host.select_bank_preset(0, 1),
        Err(HostError::Unsupported(CommandKind::Preset))
    );
    assert_eq!(host.set_control(42, 1), Err(HostError::UnknownControl(42)));
    assert_eq!(
        host.send_short_control(control::VOLUME),
        Err(HostError::UnknownControl(control::VOLUME))
    );
    assert_eq!(
        host.set_control(control::VOLUME, 200),
        Err(HostError::DataOutOfRange(200))
    );
    assert!(log.is_empty());
}

#[test]
fn test_view_serializes() {
    let (host, _log) = make_host(full_capabilities());
    let view = host.view().unwrap();

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["synth"], "Test Synth");
    assert_eq!(json["font"], "Grand Piano");
    assert_eq!(json["preset"], "Acoustic Grand Piano");
    assert!(json["rows"].as_array().map(|rows| !rows.is_empty()).unwrap_or(false));
}

#[test]
fn test_bank_row_shows_last_bank_sent_or_received() {
    let mut caps = full_capabilities();
    caps.general_midi = false;
    let (mut host, log) = make_host(caps);
    let bank_row = |host: &Host| {
        let view = host.view().unwrap();
        view.rows.iter().find(|r| r.name == "bank").and_then(|r| r.value)
    };

    host.set_control(control::BANK, 3).unwrap();
    assert_eq!(log.messages(), vec![vec![0xB0, 0x00, 3]]);
    assert_eq!(bank_row(&host), Some(3));
    // Not committed until a preset follows
    assert_eq!(host.snapshot().unwrap().preset, PresetSelection::new(0, 0));

    let repaint = host.handle_incoming(&[0xB0, control::BANK, 2]);
    assert_eq!(repaint.map(|s| s.bank), Some(2));
    assert_eq!(bank_row(&host), Some(2));
}

#[test]
fn test_incoming_bank_without_bank_row_skips_repaint() {
    let (mut host, log) = make_host(full_capabilities());

    assert_eq!(host.handle_incoming(&[0xB0, control::BANK, 2]), None);
    assert_eq!(log.messages(), vec![vec![0xB0, control::BANK, 2]]);
    assert_eq!(host.snapshot().unwrap().bank, 2);
}

#[test]
fn test_malformed_incoming_is_forwarded_not_recorded() {
    let (mut host, log) = make_host(full_capabilities());
    let before = host.snapshot().unwrap();

    assert_eq!(host.handle_incoming(&[0xB0, control::VOLUME, 0x90]), None);
    assert_eq!(log.messages(), vec![vec![0xB0, control::VOLUME, 0x90]]);
    assert_eq!(host.snapshot().unwrap(), before);
}

#[test]
fn test_view_carries_synth_url() {
    let synth = ConsoleSynth::new("Test Synth", full_capabilities(), catalog())
        .with_url(Some("https://example.org/synth".to_string()));
    let host = Host::new(Box::new(synth), None).unwrap();

    let view = host.view().unwrap();
    assert_eq!(view.url.as_deref(), Some("https://example.org/synth"));
}
