//! Sport configuration: lead thresholds, period layout and closing rules.

mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ladder::LeadThresholds;

/// Supported sports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nba,
    Ncaab,
    Nfl,
    Nhl,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Nba => "nba",
            Sport::Ncaab => "ncaab",
            Sport::Nfl => "nfl",
            Sport::Nhl => "nhl",
        }
    }
}

impl std::str::FromStr for Sport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nba" => Ok(Sport::Nba),
            "ncaab" | "ncaam" => Ok(Sport::Ncaab),
            "nfl" => Ok(Sport::Nfl),
            "nhl" => Ok(Sport::Nhl),
            other => Err(ConfigError::UnknownSport(other.to_string())),
        }
    }
}

/// When a late-game situation counts as close or decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosingRules {
    /// Seconds remaining in the final period that open the final phase.
    pub window_seconds: u32,

    /// Margin at or above which the game is considered decided.
    pub decided_margin: u32,

    /// Tier at or above which the game is considered decided.
    pub decided_tier: u8,

    /// Tier at or below which a late game is considered close.
    pub close_tier: u8,
}

/// Everything the pipeline needs to know about a sport.
///
/// There is deliberately no `Default`: thresholds must come from a preset,
/// a config file or an explicit degraded fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportConfig {
    pub sport: Sport,
    pub thresholds: LeadThresholds,
    pub regulation_periods: u8,
    pub period_seconds: u32,
    pub overtime_seconds: u32,
    pub closing: ClosingRules,
}

/// On-disk shape of a sport config. Only `sport` and `thresholds` are required.
#[derive(Debug, Deserialize)]
struct SportConfigFile {
    sport: String,
    thresholds: Option<Vec<u32>>,
    regulation_periods: Option<u8>,
    period_seconds: Option<u32>,
    overtime_seconds: Option<u32>,
    closing: Option<ClosingRules>,
}

impl SportConfig {
    /// Build a config with preset timing rules and caller-provided thresholds.
    pub fn new(sport: Sport, thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        let thresholds = LeadThresholds::new(thresholds)?;
        let (regulation_periods, period_seconds, overtime_seconds) = Self::period_layout(sport);

        Ok(Self {
            sport,
            thresholds,
            regulation_periods,
            period_seconds,
            overtime_seconds,
            closing: Self::closing_rules(sport),
        })
    }

    /// Production preset for a sport.
    pub fn preset(sport: Sport) -> Self {
        let thresholds = match sport {
            Sport::Nba | Sport::Ncaab => vec![3, 6, 10, 16],
            Sport::Nfl => vec![3, 8, 14, 21],
            Sport::Nhl => vec![1, 2, 3],
        };
        let (regulation_periods, period_seconds, overtime_seconds) = Self::period_layout(sport);

        Self {
            sport,
            thresholds: LeadThresholds(thresholds),
            regulation_periods,
            period_seconds,
            overtime_seconds,
            closing: Self::closing_rules(sport),
        }
    }

    /// Explicit single-threshold fallback for callers that choose to degrade.
    pub fn degraded(sport: Sport) -> Self {
        warn!(sport = sport.as_str(), "using degraded lead thresholds [5]");
        Self {
            thresholds: LeadThresholds(vec![5]),
            ..Self::preset(sport)
        }
    }

    /// Parse a sport config from TOML.
    ///
    /// Missing timing fields fall back to the sport preset; missing thresholds
    /// are an error.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: SportConfigFile = toml::from_str(input)?;
        Self::from_file(file)
    }

    /// Parse a sport config from an already-parsed TOML table, such as the
    /// `[sport]` section of a larger config file.
    pub fn from_toml_value(value: toml::Value) -> Result<Self, ConfigError> {
        let file: SportConfigFile = value.try_into()?;
        Self::from_file(file)
    }

    fn from_file(file: SportConfigFile) -> Result<Self, ConfigError> {
        let sport: Sport = file.sport.parse()?;
        let thresholds = file.thresholds.ok_or(ConfigError::MissingThresholds)?;
        let mut config = Self::new(sport, thresholds)?;

        if let Some(periods) = file.regulation_periods {
            config.regulation_periods = periods;
        }
        if let Some(seconds) = file.period_seconds {
            config.period_seconds = seconds;
        }
        if let Some(seconds) = file.overtime_seconds {
            config.overtime_seconds = seconds;
        }
        if let Some(closing) = file.closing {
            config.closing = closing;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.regulation_periods == 0 {
            return Err(ConfigError::InvalidPeriods(
                "regulation_periods must be at least 1".to_string(),
            ));
        }
        if self.period_seconds == 0 {
            return Err(ConfigError::InvalidPeriods(
                "period_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn period_layout(sport: Sport) -> (u8, u32, u32) {
        match sport {
            Sport::Nba => (4, 720, 300),
            Sport::Ncaab => (2, 1200, 300),
            Sport::Nfl => (4, 900, 600),
            Sport::Nhl => (3, 1200, 300),
        }
    }

    fn closing_rules(sport: Sport) -> ClosingRules {
        match sport {
            Sport::Nba | Sport::Ncaab => ClosingRules {
                window_seconds: 300,
                decided_margin: 10,
                decided_tier: 3,
                close_tier: 1,
            },
            Sport::Nfl => ClosingRules {
                window_seconds: 300,
                decided_margin: 17,
                decided_tier: 3,
                close_tier: 1,
            },
            Sport::Nhl => ClosingRules {
                window_seconds: 300,
                decided_margin: 3,
                decided_tier: 3,
                close_tier: 1,
            },
        }
    }
}
