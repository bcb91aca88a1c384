//! Configuration errors.

use thiserror::Error;

/// Errors raised while building a sport configuration.
///
/// Any of these aborts moment generation before a single play is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lead thresholds are missing")]
    MissingThresholds,

    #[error("lead thresholds must be strictly ascending, got {0:?}")]
    UnsortedThresholds(Vec<u32>),

    #[error("lead thresholds must be greater than zero")]
    ZeroThreshold,

    #[error("invalid period layout: {0}")]
    InvalidPeriods(String),

    #[error("unknown sport: {0}")]
    UnknownSport(String),

    #[error("failed to parse sport config: {0}")]
    Toml(#[from] toml::de::Error),
}
