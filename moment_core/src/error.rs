//! Pipeline errors.

use sport_rules::{ConfigError, PlayIndex};
use thiserror::Error;

/// Reasons moment generation failed to produce a usable result.
///
/// Suppression decisions are not errors; they live in the diagnostic traces.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline config is invalid: {0}")]
    InvalidConfig(String),

    #[error("game has no canonical plays")]
    NoCanonicalPlays,

    #[error("canonical play {index} does not follow play {previous}")]
    UnorderedPlays { previous: PlayIndex, index: PlayIndex },

    #[error("validation failed with {count} blocking violation(s)")]
    ValidationFailed { count: usize },

    #[error("failed to serialize moments: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to parse pipeline config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
