//! # Sport Rules
//!
//! The "rule book" crate - play events, sport configuration, the game clock and
//! the Lead Ladder. This crate is the single source of truth for how a sport is
//! scored and timed and does not contain any narrative logic.

pub mod clock;
pub mod config;
pub mod events;
pub mod ladder;

pub use clock::*;
pub use config::*;
pub use events::*;
pub use ladder::*;
