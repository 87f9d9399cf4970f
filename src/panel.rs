//! Panel layout - which rows exist for a synth, and what they show
//!
//! The layout is built once from the synth's capabilities. It keeps no
//! values: `render` reads everything from a tracker snapshot.

use serde::Serialize;

use crate::catalog::SoundFont;
use crate::midi::{control, CommandKind};
use crate::state::{ChannelSnapshot, Slot};
use crate::synth::Capabilities;

const REGISTERED_PARAMETER: &str = "registered parameter";
const DATA_ENTRY: &str = "data entry";
const DATA_ENTRY_LABEL: &str = "data entry (pitch bend sensitivity)";

/// Wire value for item `index` of a control with `items` items
pub fn value_from_index(index: u8, items: u8) -> u8 {
    let items = items.max(1);
    let partition = 127.0 / f64::from(items);
    let value = (partition / 2.0 + partition * f64::from(index.min(items - 1))).round();
    value.clamp(0.0, 127.0) as u8
}

/// Item index a wire value falls into, clamped to the last item
pub fn index_from_value(value: u8, items: u8) -> u8 {
    let items = items.max(1);
    let partition = 127.0 / f64::from(items);
    let index = (f64::from(value) / partition).ceil() - 1.0;
    index.clamp(0.0, f64::from(items - 1)) as u8
}

/// A row in the commands table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRow {
    pub command: CommandKind,
    pub default: u8,
}

/// A control as shown on the panel; coarse/fine pairs merge into one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRow {
    pub name: String,
    /// Every CC index with this name, in declaration order. The first is sent.
    pub ccs: Vec<u8>,
    pub default: Option<u8>,
    pub items: Option<u8>,
}

impl ControlRow {
    pub fn cc(&self) -> u8 {
        self.ccs[0]
    }

    pub fn is_long(&self) -> bool {
        self.default.is_some()
    }

    /// e.g. "CC 6, 38"
    pub fn label(&self) -> String {
        let indices: Vec<String> = self.ccs.iter().map(|cc| cc.to_string()).collect();
        format!("CC {}", indices.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Command,
    Long,
    Short,
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub kind: RowKind,
    pub label: String,
    pub name: String,
    /// Tracked value; the item index for item controls, none for short rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Rows shown for one synth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    commands: Vec<CommandRow>,
    controls: Vec<ControlRow>,
    general_midi: bool,
}

impl Layout {
    pub fn new(capabilities: &Capabilities) -> Self {
        let commands = capabilities
            .commands
            .iter()
            .copied()
            .filter(|c| c.has_row())
            .filter_map(|command| {
                command
                    .default_value()
                    .map(|default| CommandRow { command, default })
            })
            .collect();

        let mut controls: Vec<ControlRow> = Vec::new();
        for spec in &capabilities.controls {
            let name = match spec.display_name() {
                n if n == REGISTERED_PARAMETER => continue,
                n if n == DATA_ENTRY => DATA_ENTRY_LABEL.to_string(),
                n => n,
            };

            match controls.iter_mut().find(|row| row.name == name) {
                Some(row) => {
                    if !row.ccs.contains(&spec.cc) {
                        row.ccs.push(spec.cc);
                    }
                }
                None => controls.push(ControlRow {
                    name,
                    ccs: vec![spec.cc],
                    default: spec.default_value(),
                    items: spec.items,
                }),
            }
        }

        Self {
            commands,
            controls,
            general_midi: capabilities.general_midi,
        }
    }

    pub fn commands(&self) -> &[CommandRow] {
        &self.commands
    }

    /// Controls with a value row. BANK is left out on general-MIDI synths,
    /// where the preset selector chooses the bank.
    pub fn long_controls(&self) -> impl Iterator<Item = &ControlRow> {
        self.controls
            .iter()
            .filter(|row| row.is_long())
            .filter(move |row| !(self.general_midi && row.cc() == control::BANK))
    }

    /// Trigger-only controls
    pub fn short_controls(&self) -> impl Iterator<Item = &ControlRow> {
        self.controls.iter().filter(|row| !row.is_long())
    }

    /// The row sending `cc`, by any of its indices
    pub fn control(&self, cc: u8) -> Option<&ControlRow> {
        self.controls.iter().find(|row| row.ccs.contains(&cc))
    }

    /// Whether a BANK row is visible, so a pending bank needs a repaint
    pub fn shows_bank(&self) -> bool {
        self.long_controls().any(|row| row.cc() == control::BANK)
    }

    /// Row views for every visible row, filled from `snapshot`
    pub fn render(&self, snapshot: &ChannelSnapshot, font: Option<&SoundFont>) -> Vec<RowView> {
        let mut rows = Vec::new();

        for row in &self.commands {
            let (value, detail) = match row.command {
                CommandKind::Preset => (
                    Some(snapshot.preset.preset),
                    font.map(|f| f.display_name(snapshot.preset)),
                ),
                command => (snapshot.value(Slot::Command(command)), None),
            };
            rows.push(RowView {
                kind: RowKind::Command,
                label: format!("0x{:02X}", row.command.status_base()),
                name: row.command.name().to_string(),
                value,
                detail,
            });
        }

        for row in self.long_controls() {
            let raw = if row.cc() == control::BANK {
                Some(snapshot.bank)
            } else {
                snapshot.value(Slot::Control(row.cc()))
            };
            let (value, detail) = match row.items {
                Some(items) => (
                    raw.map(|v| index_from_value(v, items)),
                    Some(format!("{} items", items)),
                ),
                None => (raw, None),
            };
            rows.push(RowView {
                kind: RowKind::Long,
                label: row.label(),
                name: row.name.clone(),
                value,
                detail,
            });
        }

        for row in self.short_controls() {
            rows.push(RowView {
                kind: RowKind::Short,
                label: row.label(),
                name: row.name.clone(),
                value: None,
                detail: None,
            });
        }

        rows
    }
}
