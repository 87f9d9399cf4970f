//! Sound-font catalog: font → bank → preset tree
//!
//! The catalog is declared in the configuration file and is read-only once
//! loaded. Lookups that miss are not errors: hardware input may select a
//! preset that no loaded font contains, and the panel shows a fallback name.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::midi::MAX_DATA;

/// A (bank, preset) pair as sent on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetSelection {
    pub bank: u8,
    pub preset: u8,
}

impl PresetSelection {
    pub fn new(bank: u8, preset: u8) -> Self {
        Self { bank, preset }
    }
}

impl fmt::Display for PresetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bank {}, preset {}", self.bank, self.preset)
    }
}

/// A named instrument sound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub bank: u8,
    pub preset: u8,
    pub name: String,
}

impl Preset {
    pub fn selection(&self) -> PresetSelection {
        PresetSelection::new(self.bank, self.preset)
    }
}

/// Sound font as declared in the configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundFontConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub banks: Vec<BankConfig>,
}

/// Bank as declared in the configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BankConfig {
    pub index: u8,
    pub presets: Vec<PresetConfig>,
}

/// Preset as declared in the configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetConfig {
    pub index: u8,
    pub name: String,
}

/// A loaded sound font with its presets flattened bank by bank
#[derive(Debug, Clone)]
pub struct SoundFont {
    name: String,
    url: Option<String>,
    presets: Vec<Preset>,
}

impl SoundFont {
    /// Build and validate a font from its configuration
    pub fn from_config(config: &SoundFontConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            anyhow::bail!("Sound font name cannot be empty");
        }

        let mut seen = HashSet::new();
        let mut presets = Vec::new();
        for bank in &config.banks {
            if bank.index > MAX_DATA {
                anyhow::bail!(
                    "Sound font '{}': bank index {} is outside 0-127",
                    config.name,
                    bank.index
                );
            }
            for preset in &bank.presets {
                if preset.index > MAX_DATA {
                    anyhow::bail!(
                        "Sound font '{}': preset index {} in bank {} is outside 0-127",
                        config.name,
                        preset.index,
                        bank.index
                    );
                }
                if !seen.insert((bank.index, preset.index)) {
                    anyhow::bail!(
                        "Sound font '{}': bank {} preset {} is declared twice",
                        config.name,
                        bank.index,
                        preset.index
                    );
                }
                presets.push(Preset {
                    bank: bank.index,
                    preset: preset.index,
                    name: preset.name.clone(),
                });
            }
        }

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            presets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Presets in selector order
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// The preset a freshly selected font starts on
    pub fn first(&self) -> Option<&Preset> {
        self.presets.first()
    }

    pub fn resolve(&self, bank: u8, preset: u8) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.bank == bank && p.preset == preset)
    }

    /// Position of a selection in the preset selector
    pub fn position(&self, selection: PresetSelection) -> Option<usize> {
        self.presets
            .iter()
            .position(|p| p.selection() == selection)
    }

    /// Name to show for a selection, with a fallback for presets outside this font
    pub fn display_name(&self, selection: PresetSelection) -> String {
        match self.resolve(selection.bank, selection.preset) {
            Some(preset) => preset.name.clone(),
            None => format!("unknown preset ({})", selection),
        }
    }
}

/// All sound fonts the synth offers, addressed by index
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    fonts: Vec<SoundFont>,
}

impl Catalog {
    pub fn from_config(fonts: &[SoundFontConfig]) -> Result<Self> {
        let mut names = HashSet::new();
        let mut loaded = Vec::with_capacity(fonts.len());
        for font in fonts {
            if !names.insert(font.name.as_str()) {
                anyhow::bail!("Sound font '{}' is declared twice", font.name);
            }
            loaded.push(SoundFont::from_config(font)?);
        }
        Ok(Self { fonts: loaded })
    }

    pub fn fonts(&self) -> &[SoundFont] {
        &self.fonts
    }

    pub fn font(&self, font_id: usize) -> Option<&SoundFont> {
        self.fonts.get(font_id)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Presets of one font, in selector order
    pub fn presets_for(&self, font_id: usize) -> Option<&[Preset]> {
        self.font(font_id).map(SoundFont::presets)
    }

    pub fn resolve(&self, font_id: usize, bank: u8, preset: u8) -> Option<&Preset> {
        self.font(font_id)?.resolve(bank, preset)
    }
}
