//! Port synth - a software synth listening on a MIDI output port
//!
//! The port is found by case-insensitive substring, the same way hardware
//! devices are, so virtual port names with platform suffixes still match.

use anyhow::{anyhow, Result};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info};

use super::{Capabilities, Sink, Synth};
use crate::catalog::{Catalog, SoundFont};
use crate::config::SynthConfig;
use crate::device::find_port;
use crate::midi::format_hex;

/// Synth reached through a midir output connection
pub struct PortSynth {
    name: String,
    url: Option<String>,
    port_pattern: String,
    capabilities: Capabilities,
    catalog: Catalog,
    connection: Option<MidiOutputConnection>,
}

impl PortSynth {
    pub fn new(config: &SynthConfig, port_pattern: String, catalog: Catalog) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            port_pattern,
            capabilities: config.capabilities.clone(),
            catalog,
            connection: None,
        }
    }
}

impl Sink for PortSynth {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| anyhow!("Synth output '{}' is not open", self.port_pattern))?;

        connection
            .send(message)
            .map_err(|e| anyhow!("Synth output '{}': {}", self.port_pattern, e))?;

        debug!("🎹 {} <- {}", self.name, format_hex(message));
        Ok(())
    }
}

impl Synth for PortSynth {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn open(&mut self) -> Result<()> {
        let midi_out = MidiOutput::new("Synth-Host-Out")?;

        let (port, port_name) = find_port(&midi_out, &self.port_pattern)
            .ok_or_else(|| anyhow!("Output port '{}' not found", self.port_pattern))?;

        let connection = midi_out
            .connect(&port, "synth-host-out")
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", port_name, e))?;

        self.connection = Some(connection);
        info!("✅ Synth '{}' connected on '{}'", self.name, port_name);
        Ok(())
    }

    fn set_sound_font(&mut self, font: &SoundFont) -> Result<()> {
        // The font is loaded on the synth side; only the presets change here
        info!("🎼 {} sound font: {}", self.name, font.name());
        Ok(())
    }
}
