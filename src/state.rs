//! State management module - control state tracking per MIDI channel
//!
//! The tracker is the single source of truth for what every channel was last
//! told: outgoing sends and incoming device messages both land here, and the
//! panel repaints from a snapshot instead of keeping values of its own.

mod tracker;
mod types;

pub use tracker::Tracker;
pub use types::{ChannelSnapshot, ChannelState, Slot, SlotValue, Update};
