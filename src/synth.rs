//! Synthesizer collaborators
//!
//! The core never branches on which synth is active. Each implementation
//! fills in the same capability set (commands, controls, channel mode and
//! preset catalog) and accepts framed MIDI bytes.

pub mod console;
pub mod port;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Catalog, SoundFont};
use crate::config::SynthConfig;
use crate::midi::{control, CommandKind, CHANNEL_COUNT};

pub use console::{ConsoleSynth, SentLog};
pub use port::PortSynth;

/// Anything that accepts framed MIDI bytes
pub trait Sink {
    /// Send one message. Errors are reported to the caller, which decides
    /// whether they are fatal (the host never treats them as such).
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Synth trait - every synthesizer the host can drive implements this
pub trait Synth: Sink {
    /// Display name (e.g., "ResidentWAFSynth")
    fn name(&self) -> &str;

    /// Project website, if any
    fn url(&self) -> Option<&str> {
        None
    }

    /// Commands and controls this synth understands
    fn capabilities(&self) -> &Capabilities;

    /// Sound fonts this synth can load
    fn catalog(&self) -> &Catalog;

    /// Prepare the synth for sending (open ports, etc.)
    fn open(&mut self) -> Result<()>;

    /// Switch the synth to another sound font
    ///
    /// Default implementation: no-op (the font is chosen on the synth itself)
    fn set_sound_font(&mut self, _font: &SoundFont) -> Result<()> {
        Ok(())
    }
}

/// One declared control of a synth
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControlSpec {
    /// CC index (0-127)
    pub cc: u8,
    /// Overrides the standard control name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides the standard default; a control without any default is a short control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<u8>,
    /// Number of discrete items the widget chooses between
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<u8>,
}

impl ControlSpec {
    pub fn new(cc: u8) -> Self {
        Self {
            cc,
            name: None,
            default: None,
            items: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| control::display_name(self.cc))
    }

    pub fn default_value(&self) -> Option<u8> {
        self.default.or_else(|| control::default_value(self.cc))
    }

    /// Long controls carry a value; short ones are triggers
    pub fn is_long(&self) -> bool {
        self.default_value().is_some()
    }
}

/// Capability set a synth declares
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Capabilities {
    /// Supported commands, in panel order
    pub commands: Vec<CommandKind>,
    /// Supported controls, in panel order
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
    /// Listens on all 16 channels
    #[serde(default)]
    pub multi_channel: bool,
    /// Plays more than one note at a time
    #[serde(default)]
    pub polyphonic: bool,
    /// Bank is chosen through the preset selector, not a control row
    #[serde(default)]
    pub general_midi: bool,
}

impl Capabilities {
    pub fn supports(&self, command: CommandKind) -> bool {
        self.commands.contains(&command)
    }

    pub fn control(&self, cc: u8) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.cc == cc)
    }

    /// Commands whose value the tracker holds per channel, with their defaults.
    /// PRESET is excluded: it is tracked together with BANK as a selection.
    pub fn tracked_commands(&self) -> impl Iterator<Item = (CommandKind, u8)> + '_ {
        self.commands
            .iter()
            .copied()
            .filter(|c| c.has_row() && *c != CommandKind::Preset)
            .filter_map(|c| c.default_value().map(|v| (c, v)))
    }

    /// Long controls the tracker holds per channel, with their defaults.
    /// BANK is excluded: it is tracked together with PRESET as a selection.
    pub fn tracked_controls(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.controls
            .iter()
            .enumerate()
            .filter(|(i, spec)| {
                spec.cc != control::BANK && self.controls[..*i].iter().all(|c| c.cc != spec.cc)
            })
            .filter_map(|(_, spec)| spec.default_value().map(|v| (spec.cc, v)))
    }

    /// Channels the panel can address
    pub fn channel_count(&self) -> u8 {
        if self.multi_channel {
            CHANNEL_COUNT
        } else {
            1
        }
    }
}

/// Build the synth described by the configuration.
///
/// With no output port, or in dry-run mode, messages go to the console synth.
pub fn from_config(config: &SynthConfig, catalog: Catalog, dry_run: bool) -> Box<dyn Synth> {
    match (&config.output_port, dry_run) {
        (Some(port), false) => {
            info!("Synth '{}' on output port '{}'", config.name, port);
            Box::new(PortSynth::new(config, port.clone(), catalog))
        }
        _ => {
            info!("Synth '{}' on the console (dry run)", config.name);
            Box::new(
                ConsoleSynth::new(config.name.clone(), config.capabilities.clone(), catalog)
                    .with_url(config.url.clone()),
            )
        }
    }
}
