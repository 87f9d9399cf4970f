//! Configuration management for Synth Host
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! The file declares the synth (its capabilities and output port), the MIDI
//! devices, and the sound-font catalog.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::catalog::{Catalog, SoundFontConfig};
use crate::midi::{CommandKind, MAX_DATA};
use crate::synth::Capabilities;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub synth: SynthConfig,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub sound_fonts: Vec<SoundFontConfig>,
}

/// Synth declaration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Output port the synth listens on (substring match). Without one,
    /// messages go to the console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

/// MIDI device configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Hardware controller input (substring match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_port: Option<String>,
    /// Extra output that mirrors everything sent to the synth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough_port: Option<String>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Build the sound-font catalog
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::from_config(&self.sound_fonts)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let synth = &self.synth;
        if synth.name.trim().is_empty() {
            anyhow::bail!("Synth name cannot be empty");
        }

        let caps = &synth.capabilities;
        // Without NOTE_ON the host can't play anything
        if !caps.supports(CommandKind::NoteOn) {
            anyhow::bail!("Synth '{}' must declare NOTE_ON", synth.name);
        }

        let mut commands = HashSet::new();
        for command in &caps.commands {
            if !commands.insert(*command) {
                anyhow::bail!("Synth '{}' declares {} twice", synth.name, command);
            }
        }

        for control in &caps.controls {
            if control.cc > MAX_DATA {
                anyhow::bail!("Control CC {} is outside 0-127", control.cc);
            }
            if let Some(default) = control.default {
                if default > MAX_DATA {
                    anyhow::bail!(
                        "Control CC {} default {} is outside 0-127",
                        control.cc,
                        default
                    );
                }
            }
            if let Some(items) = control.items {
                if items == 0 || items > MAX_DATA {
                    anyhow::bail!(
                        "Control CC {} must have 1-127 items, not {}",
                        control.cc,
                        items
                    );
                }
                if !control.is_long() {
                    anyhow::bail!("Item control CC {} needs a default value", control.cc);
                }
            }
        }

        for (label, port) in [
            ("synth output_port", &synth.output_port),
            ("midi input_port", &self.midi.input_port),
            ("midi passthrough_port", &self.midi.passthrough_port),
        ] {
            if port.as_deref().is_some_and(|p| p.trim().is_empty()) {
                anyhow::bail!("{} cannot be empty", label);
            }
        }

        if caps.supports(CommandKind::Preset) && self.sound_fonts.is_empty() {
            anyhow::bail!(
                "Synth '{}' declares PRESET, so at least one sound font must be defined",
                synth.name
            );
        }

        self.catalog().context("Invalid sound font catalog")?;

        Ok(())
    }
}
