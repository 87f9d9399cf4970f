//! Command-line interface and REPL
//!
//! The REPL is the panel: each line is parsed into a `PanelCommand`, run
//! against the host, and the panel is printed again from the host's view.
//! Channels and notes are numbered from 1 here, as on the hardware.

use anyhow::{anyhow, bail, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::device::{discovery, InputSelection};
use crate::host::{Host, PanelView};
use crate::midi::{control, CommandKind};
use crate::panel::RowKind;
use crate::state::Slot;

const HELP: &str = "\
Commands:
  show                      print the panel
  dump                      print the active channel's state as JSON
  channel <1-16>            select the active channel
  fonts | font <n>          list / select a sound font
  presets | preset <n>      list / select a preset of the active font
  bank <bank> <preset>      select a preset by bank and preset index
  pressure <v>              channel pressure
  pitch <v>                 pitch wheel (64 = centre)
  aftertouch <v>            aftertouch on the enabled notes
  cc <index> <v>            set a control (item controls take an item index)
  trigger <index> | aco     send a short control / all controllers off
  again <slot>              send a tracked value again (preset, pressure, pitch,
                            aftertouch, cc <index>)
  note <n> <key> <velocity> set a note of the note panel
  enable <n> | disable <n>  switch a note of the two-note panel
  on | off                  play / release the notes
  hold on|off               hold switch
  input <pattern>|none      select the hardware input device
  ports                     list MIDI ports
  quit";

/// One line of user intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    Help,
    Show,
    Dump,
    Fonts,
    Presets,
    /// Channel, 0-based
    Channel(u8),
    Font(usize),
    Preset(usize),
    BankPreset(u8, u8),
    Command(CommandKind, u8),
    Control(u8, u8),
    Short(u8),
    Resend(Slot),
    /// Note panel slot (0-based), key, velocity
    Note(usize, u8, u8),
    Enable(usize, bool),
    NoteOn,
    NoteOff,
    Hold(bool),
    Input(Option<String>),
    Ports,
    Quit,
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let word = word.ok_or_else(|| anyhow!("missing {}", what))?;
    word.parse()
        .map_err(|_| anyhow!("'{}' is not a valid {}", word, what))
}

/// 1-based index on screen, 0-based inside
fn ordinal(word: Option<&str>, what: &str) -> Result<usize> {
    match number::<usize>(word, what)? {
        0 => bail!("{} numbers start at 1", what),
        n => Ok(n - 1),
    }
}

fn switch(word: Option<&str>) -> Result<bool> {
    match word {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("expected 'on' or 'off'"),
    }
}

fn command_slot(word: &str) -> Option<CommandKind> {
    match word {
        "pressure" => Some(CommandKind::ChannelPressure),
        "pitch" => Some(CommandKind::Pitchwheel),
        "aftertouch" => Some(CommandKind::Aftertouch),
        "preset" => Some(CommandKind::Preset),
        _ => None,
    }
}

impl PanelCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };
        let arg = words.next();

        let command = match verb.to_lowercase().as_str() {
            "help" | "?" => PanelCommand::Help,
            "show" => PanelCommand::Show,
            "dump" => PanelCommand::Dump,
            "fonts" => PanelCommand::Fonts,
            "presets" => PanelCommand::Presets,
            "channel" | "ch" => {
                let channel = ordinal(arg, "channel")?;
                let channel =
                    u8::try_from(channel).map_err(|_| anyhow!("channel out of range"))?;
                PanelCommand::Channel(channel)
            }
            "font" => PanelCommand::Font(number(arg, "font index")?),
            "preset" => PanelCommand::Preset(number(arg, "preset index")?),
            "bank" => {
                PanelCommand::BankPreset(number(arg, "bank")?, number(words.next(), "preset")?)
            }
            "cc" => PanelCommand::Control(
                number(arg, "control index")?,
                number(words.next(), "value")?,
            ),
            "trigger" => PanelCommand::Short(number(arg, "control index")?),
            "aco" => PanelCommand::Short(control::ALL_CONTROLLERS_OFF),
            "again" => match arg {
                Some("cc") => {
                    PanelCommand::Resend(Slot::Control(number(words.next(), "control index")?))
                }
                Some(word) => PanelCommand::Resend(Slot::Command(
                    command_slot(word).ok_or_else(|| anyhow!("'{}' has no tracked value", word))?,
                )),
                None => bail!("missing slot"),
            },
            "note" => PanelCommand::Note(
                ordinal(arg, "note")?,
                number(words.next(), "key")?,
                number(words.next(), "velocity")?,
            ),
            "enable" => PanelCommand::Enable(ordinal(arg, "note")?, true),
            "disable" => PanelCommand::Enable(ordinal(arg, "note")?, false),
            "on" => PanelCommand::NoteOn,
            "off" => PanelCommand::NoteOff,
            "hold" => PanelCommand::Hold(switch(arg)?),
            "input" => match arg {
                None | Some("none") => PanelCommand::Input(None),
                Some(_) => {
                    // Port names may contain spaces
                    let pattern = line.trim_start()[verb.len()..].trim().to_string();
                    PanelCommand::Input(Some(pattern))
                }
            },
            "ports" => PanelCommand::Ports,
            "quit" | "exit" => PanelCommand::Quit,
            other => match command_slot(other) {
                Some(command) if command != CommandKind::Preset => {
                    PanelCommand::Command(command, number(arg, "value")?)
                }
                _ => bail!("unknown command '{}' (try 'help')", other),
            },
        };
        Ok(command)
    }
}

/// Whether the REPL keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command against the host
pub fn execute(
    host: &mut Host,
    inputs: &mut InputSelection,
    command: PanelCommand,
) -> Result<Flow> {
    match command {
        PanelCommand::Help => println!("{}", HELP),
        PanelCommand::Show => print_view(&host.view()?),
        PanelCommand::Dump => println!("{}", serde_json::to_string_pretty(&host.snapshot()?)?),
        PanelCommand::Fonts => {
            for (index, font) in host.synth().catalog().fonts().iter().enumerate() {
                let marker = if index == host.font_id() { "*" } else { " " };
                let url = font.url().map(|u| format!(" ({})", u)).unwrap_or_default();
                println!("{} {}: {}{}", marker.green(), index, font.name(), url.dimmed());
            }
        }
        PanelCommand::Presets => {
            let current = host.snapshot()?.preset;
            if let Some(font) = host.font() {
                let selected = font.position(current);
                for (index, preset) in font.presets().iter().enumerate() {
                    let marker = if selected == Some(index) { "*" } else { " " };
                    println!(
                        "{} {:>3}: {} {}",
                        marker.green(),
                        index,
                        preset.name,
                        format!("({})", preset.selection()).dimmed()
                    );
                }
            }
        }
        PanelCommand::Channel(channel) => {
            host.select_channel(channel)?;
            print_view(&host.view()?);
        }
        PanelCommand::Font(font) => {
            host.select_font(font)?;
            print_view(&host.view()?);
        }
        PanelCommand::Preset(index) => {
            host.select_preset(index)?;
            print_view(&host.view()?);
        }
        PanelCommand::BankPreset(bank, preset) => {
            host.select_bank_preset(bank, preset)?;
            print_view(&host.view()?);
        }
        PanelCommand::Command(command, value) => host.set_command(command, value)?,
        PanelCommand::Control(cc, value) => host.set_control(cc, value)?,
        PanelCommand::Short(cc) => {
            host.send_short_control(cc)?;
            if cc == control::ALL_CONTROLLERS_OFF {
                print_view(&host.view()?);
            }
        }
        PanelCommand::Resend(slot) => host.resend(slot)?,
        PanelCommand::Note(index, key, velocity) => host.set_note(index, key, velocity)?,
        PanelCommand::Enable(index, enabled) => host.set_note_enabled(index, enabled)?,
        PanelCommand::NoteOn => host.note_on()?,
        PanelCommand::NoteOff => host.note_off()?,
        PanelCommand::Hold(hold) => host.set_hold(hold)?,
        PanelCommand::Input(pattern) => match inputs.select(pattern.as_deref())? {
            Some(name) => println!("{} {}", "Input:".bold(), name.green()),
            None => println!("{} {}", "Input:".bold(), "none".dimmed()),
        },
        PanelCommand::Ports => discovery::print_ports(),
        PanelCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Parse and run one REPL line, printing any error
pub fn handle_line(host: &mut Host, inputs: &mut InputSelection, line: &str) -> Flow {
    if line.trim().is_empty() {
        return Flow::Continue;
    }
    let result = PanelCommand::parse(line).and_then(|command| {
        debug!("REPL: {:?}", command);
        execute(host, inputs, command)
    });
    match result {
        Ok(flow) => flow,
        Err(e) => {
            println!("{} {}", "error:".red().bold(), e);
            Flow::Continue
        }
    }
}

/// Print the panel for the active channel
pub fn print_view(view: &PanelView) {
    println!(
        "\n{} {}  {} {}  {} {}",
        "synth".dimmed(),
        view.synth.bold(),
        "channel".dimmed(),
        (view.channel + 1).to_string().yellow().bold(),
        "preset".dimmed(),
        view.preset.cyan()
    );
    if let Some(url) = &view.url {
        println!("{}", url.dimmed());
    }
    if let Some(font) = &view.font {
        println!("{} {}", "font".dimmed(), font);
    }

    for row in &view.rows {
        let value = match (row.kind, row.value) {
            (RowKind::Short, _) => "[trigger]".dimmed().to_string(),
            (_, Some(value)) => value.to_string().green().to_string(),
            (_, None) => "-".dimmed().to_string(),
        };
        let detail = row.detail.as_deref().unwrap_or_default();
        println!("  {:<10} {:<38} {:>9} {}", row.label.dimmed(), row.name, value, detail.dimmed());
    }

    let notes: Vec<String> = view
        .notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            let text = format!("{}: key {} vel {}", i + 1, note.key, note.velocity);
            if note.enabled {
                text
            } else {
                text.dimmed().to_string()
            }
        })
        .collect();
    let hold = if view.hold { "  [hold]".yellow().to_string() } else { String::new() };
    println!("  {} {}{}", "notes".dimmed(), notes.join("  "), hold);
}

/// Read lines on a dedicated thread and hand them to the host task.
///
/// Ctrl+C and Ctrl+D at the prompt end the session.
pub fn spawn_repl(lines: UnboundedSender<String>) -> Result<std::thread::JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    warn!("REPL unavailable: {}", e);
                    let _ = lines.send("quit".to_string());
                    return;
                }
            };

            loop {
                match editor.readline("synth> ") {
                    Ok(line) => {
                        if let Err(e) = editor.add_history_entry(line.as_str()) {
                            debug!("History not updated: {}", e);
                        }
                        if lines.send(line).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                        let _ = lines.send("quit".to_string());
                        break;
                    }
                    Err(e) => {
                        warn!("REPL stopped: {}", e);
                        let _ = lines.send("quit".to_string());
                        break;
                    }
                }
            }
        })?;

    Ok(handle)
}
