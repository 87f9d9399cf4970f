//! Synth Host - terminal control panel for software MIDI synthesizers
//!
//! Turns panel actions into framed MIDI messages for a synth, and mirrors
//! the state of a hardware controller into the panel.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod device;
pub mod encoder;
pub mod error;
pub mod host;
pub mod midi;
pub mod panel;
pub mod paths;
pub mod state;
pub mod synth;

pub use error::{HostError, HostResult};
