//! # Moment Core
//!
//! Turns a normalized play-by-play stream into a small, bounded, validated list
//! of narrative moments, plus diagnostic traces explaining every decision.
//!
//! ## Core Components
//!
//! - **boundary**: Lead Ladder boundary detection with hysteresis, density gating
//!   and false-drama suppression, plus run detection and promotion
//! - **moment**: Moment records and the builder that cuts the stream at boundaries
//! - **merge**: Validity rules, merge compatibility and budget enforcement
//! - **construction**: Chapters, dynamic quotas, closing expansion, semantic splits
//! - **importance**: Explainable per-moment importance scores
//! - **selection**: Dynamic budget, rank selection and pacing swaps
//! - **coherence**: Narrative state machine removing spurious drama
//! - **validation**: Structural invariants over the final list
//!
//! ## Design Philosophy
//!
//! - **Pure passes**: every pass takes the previous list and returns a new one
//! - **Explicit configuration**: thresholds are required, tuning is versioned
//! - **Explainable**: suppressions and merges are recorded, never silent

pub mod boundary;
pub mod coherence;
pub mod config;
pub mod construction;
pub mod error;
pub mod importance;
pub mod kind;
pub mod merge;
pub mod moment;
pub mod pipeline;
pub mod recap;
pub mod selection;
pub mod snapshot;
pub mod stream;
pub mod trace;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::*;
pub use error::*;
pub use kind::*;
pub use moment::*;
pub use pipeline::*;
pub use snapshot::*;
pub use stream::*;
