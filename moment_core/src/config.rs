//! Pipeline configuration - the sport plus every tuning parameter set.

use serde::{Deserialize, Serialize};
use sport_rules::{Sport, SportConfig};

use crate::boundary::{BoundaryConfig, RunConfig};
use crate::coherence::CoherenceConfig;
use crate::construction::ConstructionConfig;
use crate::error::{PipelineError, Result};
use crate::importance::ImportanceWeights;
use crate::merge::MergeConfig;
use crate::selection::{BudgetConfig, PacingConfig};
use crate::validation::ValidationConfig;

/// Complete configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub sport: SportConfig,
    pub boundary: BoundaryConfig,
    pub runs: RunConfig,
    pub merge: MergeConfig,
    pub construction: ConstructionConfig,
    pub importance: ImportanceWeights,
    pub budget: BudgetConfig,
    pub pacing: PacingConfig,
    pub coherence: CoherenceConfig,
    pub validation: ValidationConfig,
}

/// Tuning sections of a config file; every one is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TuningFile {
    boundary: BoundaryConfig,
    runs: RunConfig,
    merge: MergeConfig,
    construction: ConstructionConfig,
    importance: ImportanceWeights,
    budget: Option<BudgetConfig>,
    pacing: PacingConfig,
    coherence: CoherenceConfig,
    validation: ValidationConfig,
}

impl PipelineConfig {
    /// Default tuning around an explicit sport config.
    pub fn new(sport: SportConfig) -> Self {
        let budget = BudgetConfig::for_sport(sport.sport);
        Self {
            sport,
            boundary: BoundaryConfig::default(),
            runs: RunConfig::default(),
            merge: MergeConfig::default(),
            construction: ConstructionConfig::default(),
            importance: ImportanceWeights::default(),
            budget,
            pacing: PacingConfig::default(),
            coherence: CoherenceConfig::default(),
            validation: ValidationConfig::default(),
        }
    }

    /// Production preset for a sport.
    pub fn for_sport(sport: Sport) -> Self {
        Self::new(SportConfig::preset(sport))
    }

    /// Parse a full config file.
    ///
    /// The `[sport]` table is required and must carry thresholds. Missing
    /// tuning sections take their defaults; a missing `[budget]` takes the
    /// sport's base budget.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(input)?;
        let sport_table = table
            .remove("sport")
            .ok_or_else(|| PipelineError::InvalidConfig("missing [sport] table".to_string()))?;
        let sport = SportConfig::from_toml_value(sport_table)?;
        let tuning: TuningFile = toml::Value::Table(table).try_into()?;

        let config = Self {
            budget: tuning
                .budget
                .unwrap_or_else(|| BudgetConfig::for_sport(sport.sport)),
            sport,
            boundary: tuning.boundary,
            runs: tuning.runs,
            merge: tuning.merge,
            construction: tuning.construction,
            importance: tuning.importance,
            pacing: tuning.pacing,
            coherence: tuning.coherence,
            validation: tuning.validation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter sets no pass can honour.
    pub fn validate(&self) -> Result<()> {
        if self.budget.min_moments > self.budget.max_moments {
            return Err(PipelineError::InvalidConfig(format!(
                "budget min_moments {} exceeds max_moments {}",
                self.budget.min_moments, self.budget.max_moments
            )));
        }
        let quotas = &self.construction.quotas;
        if quotas.min_quota > quotas.max_quota {
            return Err(PipelineError::InvalidConfig(format!(
                "quota min {} exceeds max {}",
                quotas.min_quota, quotas.max_quota
            )));
        }
        if self.merge.max_total == 0 || self.merge.max_per_period == 0 {
            return Err(PipelineError::InvalidConfig(
                "merge limits must be positive".to_string(),
            ));
        }
        if self.construction.splits.min_segment_plays == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_segment_plays must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::CheckMode;

    #[test]
    fn test_for_sport_applies_budget_base() {
        assert_eq!(PipelineConfig::for_sport(Sport::Nhl).budget.base, 16);
        assert_eq!(PipelineConfig::for_sport(Sport::Nba).budget.base, 22);
    }

    #[test]
    fn test_from_toml_with_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [sport]
            sport = "nfl"
            thresholds = [3, 8, 14, 21]

            [boundary]
            density_window_plays = 6

            [validation]
            coverage = "log"
            "#,
        )
        .unwrap();

        assert_eq!(config.sport.sport, Sport::Nfl);
        assert_eq!(config.boundary.density_window_plays, 6);
        assert_eq!(config.boundary.hysteresis_plays, 2);
        assert_eq!(config.budget.base, 18);
        assert_eq!(config.validation.coverage, CheckMode::Log);
        assert_eq!(config.validation.chronology, CheckMode::Fail);
    }

    #[test]
    fn test_missing_sport_table_is_an_error() {
        let result = PipelineConfig::from_toml_str("[boundary]\nhysteresis_plays = 3\n");
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_thresholds_is_an_error() {
        let result = PipelineConfig::from_toml_str("[sport]\nsport = \"nba\"\n");
        assert!(matches!(
            result,
            Err(PipelineError::Config(sport_rules::ConfigError::MissingThresholds))
        ));
    }

    #[test]
    fn test_inverted_budget_bounds_are_rejected() {
        let mut config = PipelineConfig::for_sport(Sport::Nba);
        config.budget.min_moments = 40;
        assert!(config.validate().is_err());
    }
}
