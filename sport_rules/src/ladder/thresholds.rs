//! Validated threshold lists.

use serde::{Deserialize, Serialize};

use super::{compute_lead_state, LeadState};
use crate::config::ConfigError;
use crate::events::Score;

/// An ascending, non-empty list of margin thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct LeadThresholds(pub(crate) Vec<u32>);

impl LeadThresholds {
    /// Validate and wrap a threshold list.
    pub fn new(thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        if thresholds.is_empty() {
            return Err(ConfigError::MissingThresholds);
        }
        if thresholds.contains(&0) {
            return Err(ConfigError::ZeroThreshold);
        }
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::UnsortedThresholds(thresholds));
        }
        Ok(Self(thresholds))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Highest reachable tier.
    pub fn max_tier(&self) -> u8 {
        u8::try_from(self.0.len()).unwrap_or(u8::MAX)
    }

    /// Smallest margin that counts as a real lead.
    pub fn first(&self) -> u32 {
        self.0[0]
    }

    pub fn state(&self, score: Score) -> LeadState {
        compute_lead_state(score.home, score.away, &self.0)
    }
}

impl TryFrom<Vec<u32>> for LeadThresholds {
    type Error = ConfigError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LeadThresholds> for Vec<u32> {
    fn from(value: LeadThresholds) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_thresholds() {
        assert!(matches!(
            LeadThresholds::new(vec![]),
            Err(ConfigError::MissingThresholds)
        ));
    }

    #[test]
    fn test_rejects_unsorted_and_zero() {
        assert!(matches!(
            LeadThresholds::new(vec![6, 3]),
            Err(ConfigError::UnsortedThresholds(_))
        ));
        assert!(matches!(
            LeadThresholds::new(vec![3, 3]),
            Err(ConfigError::UnsortedThresholds(_))
        ));
        assert!(matches!(
            LeadThresholds::new(vec![0, 3]),
            Err(ConfigError::ZeroThreshold)
        ));
    }

    #[test]
    fn test_state_uses_thresholds() {
        let thresholds = LeadThresholds::new(vec![3, 6, 10, 16]).unwrap();
        assert_eq!(thresholds.max_tier(), 4);
        assert_eq!(thresholds.first(), 3);
        assert_eq!(thresholds.state(Score::new(50, 43)).tier, 2);
    }
}
