//! Console synth - logs every message instead of playing it
//!
//! Useful for:
//! - Trying the panel without a synth listening on a MIDI port
//! - Checking exactly which bytes an action produces
//! - Tests, through the shared sent-message log

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Capabilities, Sink, Synth};
use crate::catalog::{Catalog, SoundFont};
use crate::midi::{format_hex, ChannelVoice};

/// Shared record of every message a console synth accepted
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    /// Messages in send order
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, message: &[u8]) {
        self.0.lock().push(message.to_vec());
    }
}

/// ConsoleSynth accepts everything and logs it
pub struct ConsoleSynth {
    name: String,
    url: Option<String>,
    capabilities: Capabilities,
    catalog: Catalog,
    log: SentLog,
    font: Option<String>,
}

impl ConsoleSynth {
    pub fn new(name: impl Into<String>, capabilities: Capabilities, catalog: Catalog) -> Self {
        Self {
            name: name.into(),
            url: None,
            capabilities,
            catalog,
            log: SentLog::default(),
            font: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// Handle onto the sent-message log, valid after the synth is boxed
    pub fn log(&self) -> SentLog {
        self.log.clone()
    }

    /// Name of the sound font last set
    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }
}

impl Sink for ConsoleSynth {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        match ChannelVoice::parse(message) {
            Some(voice) => debug!("🎹 {} <- {} ({})", self.name, format_hex(message), voice),
            None => debug!("🎹 {} <- {}", self.name, format_hex(message)),
        }
        self.log.push(message);
        Ok(())
    }
}

impl Synth for ConsoleSynth {
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
        info!("✅ Console synth '{}' ready", self.name);
        Ok(())
    }

    fn set_sound_font(&mut self, font: &SoundFont) -> Result<()> {
        info!("🎼 {} sound font: {}", self.name, font.name());
        self.font = Some(font.name().to_string());
        Ok(())
    }
}
