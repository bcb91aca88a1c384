//! The Lead Ladder - maps a score pair to a leader and a tier.
//!
//! A sport defines an ascending list of margin thresholds. The tier of a game
//! state is the number of thresholds the current margin meets, so tier 0 is
//! "within reach" and the top tier is "out of sight".

mod thresholds;

pub use thresholds::*;

use serde::{Deserialize, Serialize};

use crate::events::{Score, TeamSide};

/// Who is ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leader {
    Home,
    Away,
    Tied,
}

impl Leader {
    /// Leader from the sign of home minus away.
    pub fn from_scores(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Leader::Home,
            std::cmp::Ordering::Less => Leader::Away,
            std::cmp::Ordering::Equal => Leader::Tied,
        }
    }

    /// The leading side, if any.
    pub fn side(&self) -> Option<TeamSide> {
        match self {
            Leader::Home => Some(TeamSide::Home),
            Leader::Away => Some(TeamSide::Away),
            Leader::Tied => None,
        }
    }

    pub fn is_tied(&self) -> bool {
        matches!(self, Leader::Tied)
    }
}

impl From<TeamSide> for Leader {
    fn from(side: TeamSide) -> Self {
        match side {
            TeamSide::Home => Leader::Home,
            TeamSide::Away => Leader::Away,
        }
    }
}

/// Derived game state at one play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadState {
    pub home_score: u32,
    pub away_score: u32,
    pub margin: u32,
    pub leader: Leader,
    pub tier: u8,
}

impl LeadState {
    pub fn score(&self) -> Score {
        Score::new(self.home_score, self.away_score)
    }

    /// The side chasing the game, if any.
    pub fn trailing(&self) -> Option<TeamSide> {
        self.leader.side().map(TeamSide::opponent)
    }
}

/// Compute the lead state for a score pair.
///
/// `tier` is the number of thresholds less than or equal to the margin.
pub fn compute_lead_state(home: u32, away: u32, thresholds: &[u32]) -> LeadState {
    let margin = home.abs_diff(away);
    let tier = thresholds.iter().filter(|t| **t <= margin).count();

    LeadState {
        home_score: home,
        away_score: away,
        margin,
        leader: Leader::from_scores(home, away),
        tier: u8::try_from(tier).unwrap_or(u8::MAX),
    }
}

/// Kinds of transitions between adjacent lead states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossingKind {
    TierUp,
    TierDown,
    TieReached,
    TieBroken,
    Flip,
}

impl CrossingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossingKind::TierUp => "TIER_UP",
            CrossingKind::TierDown => "TIER_DOWN",
            CrossingKind::TieReached => "TIE_REACHED",
            CrossingKind::TieBroken => "TIE_BROKEN",
            CrossingKind::Flip => "FLIP",
        }
    }

    /// Lead changes and ties, the crossings subject to hysteresis and density gating.
    pub fn is_flip_or_tie(&self) -> bool {
        matches!(self, CrossingKind::Flip | CrossingKind::TieReached)
    }
}

impl std::fmt::Display for CrossingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition between two adjacent lead states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCrossing {
    pub kind: CrossingKind,
    pub prev: LeadState,
    pub curr: LeadState,
}

/// Classify the transition from `prev` to `curr`, if it is one.
pub fn detect_crossing(prev: &LeadState, curr: &LeadState) -> Option<TierCrossing> {
    let kind = match (prev.leader, curr.leader) {
        (a, b) if !a.is_tied() && !b.is_tied() && a != b => CrossingKind::Flip,
        (a, Leader::Tied) if !a.is_tied() => CrossingKind::TieReached,
        (Leader::Tied, b) if !b.is_tied() => CrossingKind::TieBroken,
        _ if curr.tier > prev.tier => CrossingKind::TierUp,
        _ if curr.tier < prev.tier => CrossingKind::TierDown,
        _ => return None,
    };

    Some(TierCrossing {
        kind,
        prev: *prev,
        curr: *curr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NBA: &[u32] = &[3, 6, 10, 16];

    #[test]
    fn test_tier_counts_thresholds_met() {
        assert_eq!(compute_lead_state(0, 0, NBA).tier, 0);
        assert_eq!(compute_lead_state(2, 0, NBA).tier, 0);
        assert_eq!(compute_lead_state(3, 0, NBA).tier, 1);
        assert_eq!(compute_lead_state(40, 46, NBA).tier, 2);
        assert_eq!(compute_lead_state(10, 0, NBA).tier, 3);
        assert_eq!(compute_lead_state(120, 90, NBA).tier, 4);
    }

    #[test]
    fn test_leader_from_sign() {
        assert_eq!(compute_lead_state(5, 3, NBA).leader, Leader::Home);
        assert_eq!(compute_lead_state(3, 5, NBA).leader, Leader::Away);
        assert_eq!(compute_lead_state(4, 4, NBA).leader, Leader::Tied);
        assert_eq!(compute_lead_state(3, 5, NBA).trailing(), Some(TeamSide::Home));
    }

    #[test]
    fn test_detect_flip() {
        let prev = compute_lead_state(10, 8, NBA);
        let curr = compute_lead_state(10, 11, NBA);
        let crossing = detect_crossing(&prev, &curr).unwrap();
        assert_eq!(crossing.kind, CrossingKind::Flip);
    }

    #[test]
    fn test_detect_tie_reached_and_broken() {
        let lead = compute_lead_state(10, 8, NBA);
        let tied = compute_lead_state(10, 10, NBA);

        assert_eq!(
            detect_crossing(&lead, &tied).unwrap().kind,
            CrossingKind::TieReached
        );
        assert_eq!(
            detect_crossing(&tied, &lead).unwrap().kind,
            CrossingKind::TieBroken
        );
    }

    #[test]
    fn test_detect_tier_changes() {
        let low = compute_lead_state(12, 10, NBA);
        let high = compute_lead_state(18, 10, NBA);

        assert_eq!(
            detect_crossing(&low, &high).unwrap().kind,
            CrossingKind::TierUp
        );
        assert_eq!(
            detect_crossing(&high, &low).unwrap().kind,
            CrossingKind::TierDown
        );
    }

    #[test]
    fn test_no_crossing_within_tier() {
        let a = compute_lead_state(10, 10, NBA);
        let b = compute_lead_state(12, 12, NBA);
        assert!(detect_crossing(&a, &b).is_none());

        let c = compute_lead_state(12, 10, NBA);
        let d = compute_lead_state(13, 12, NBA);
        assert!(detect_crossing(&c, &d).is_none());
    }

    #[test]
    fn test_crossing_is_deterministic() {
        let prev = compute_lead_state(20, 14, NBA);
        let curr = compute_lead_state(20, 18, NBA);
        assert_eq!(detect_crossing(&prev, &curr), detect_crossing(&prev, &curr));
    }
}
