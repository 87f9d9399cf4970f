//! Note panel - the keys the host plays, and the hold switch
//!
//! Monophonic synths get one note, polyphonic ones get two with an enable
//! switch each. At least one of the two is always enabled.

use serde::Serialize;

use crate::error::{HostError, HostResult};
use crate::midi::MAX_DATA;

const DEFAULT_VELOCITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Note {
    pub key: u8,
    pub velocity: u8,
    pub enabled: bool,
}

impl Note {
    fn new(key: u8) -> Self {
        Self {
            key,
            velocity: DEFAULT_VELOCITY,
            enabled: true,
        }
    }
}

/// A note that was sent NOTE_ON and not released yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sounding {
    pub channel: u8,
    pub note: Note,
}

#[derive(Debug, Clone)]
pub struct NotePanel {
    notes: Vec<Note>,
    hold: bool,
    sounding: Vec<Sounding>,
}

impl NotePanel {
    pub fn new(polyphonic: bool) -> Self {
        let notes = if polyphonic {
            vec![Note::new(64), Note::new(68)]
        } else {
            vec![Note::new(64)]
        };

        Self {
            notes,
            hold: false,
            sounding: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_dual(&self) -> bool {
        self.notes.len() > 1
    }

    pub fn hold(&self) -> bool {
        self.hold
    }

    pub fn set_note(&mut self, index: usize, key: u8, velocity: u8) -> HostResult<()> {
        for value in [key, velocity] {
            if value > MAX_DATA {
                return Err(HostError::DataOutOfRange(value));
            }
        }
        let note = self
            .notes
            .get_mut(index)
            .ok_or(HostError::UnknownNote(index))?;
        note.key = key;
        note.velocity = velocity;
        Ok(())
    }

    /// Enable or disable a note of the dual panel. Disabling the last enabled
    /// note re-enables note 2.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> HostResult<()> {
        if !self.is_dual() {
            return Err(HostError::UnknownNote(index));
        }
        self.notes
            .get_mut(index)
            .ok_or(HostError::UnknownNote(index))?
            .enabled = enabled;

        if self.notes.iter().all(|n| !n.enabled) {
            if let Some(last) = self.notes.last_mut() {
                last.enabled = true;
            }
        }
        Ok(())
    }

    fn enabled(&self) -> impl Iterator<Item = Note> + '_ {
        self.notes.iter().copied().filter(|n| n.enabled)
    }

    /// Keys that receive aftertouch
    pub fn aftertouch_targets(&self) -> Vec<u8> {
        self.enabled().map(|n| n.key).collect()
    }

    /// Notes to start on `channel`; they are remembered until released
    pub fn press(&mut self, channel: u8) -> Vec<Note> {
        let pressed: Vec<Note> = self.enabled().collect();
        self.sounding
            .extend(pressed.iter().map(|&note| Sounding { channel, note }));
        pressed
    }

    /// Notes to stop when the key is let go. Nothing while hold is on.
    pub fn release(&mut self) -> Vec<Sounding> {
        if self.hold {
            return Vec::new();
        }
        std::mem::take(&mut self.sounding)
    }

    /// Set the hold switch. Clearing it returns the notes to stop.
    pub fn set_hold(&mut self, hold: bool) -> Vec<Sounding> {
        self.hold = hold;
        if hold {
            Vec::new()
        } else {
            std::mem::take(&mut self.sounding)
        }
    }

    /// Forget sounding notes after the synth was silenced some other way
    pub fn clear_sounding(&mut self) {
        self.sounding.clear();
    }

    pub fn sounding(&self) -> &[Sounding] {
        &self.sounding
    }
}
