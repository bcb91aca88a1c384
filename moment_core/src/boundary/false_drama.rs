//! Late-game false-drama suppression.

use serde::{Deserialize, Serialize};
use sport_rules::{ClosingClassification, ClosingSituation, PlayIndex};

/// Boundary candidates that can be false drama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DramaCandidate {
    TierDown,
    RunCut,
}

impl DramaCandidate {
    pub fn as_str(&self) -> &'static str {
        match self {
            DramaCandidate::TierDown => "TIER_DOWN",
            DramaCandidate::RunCut => "RUN_CUT",
        }
    }
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalseDramaDecision {
    pub index: PlayIndex,
    pub candidate: DramaCandidate,
    pub situation: ClosingSituation,
    pub margin: u32,
    pub tier: u8,
    pub suppressed: bool,
    pub reason: String,
}

/// Decide whether a late cut is false drama.
///
/// A cut is suppressed only when the game is decided in its final phase and
/// no lead change, tie or high-impact play is involved.
pub fn evaluate_false_drama(
    index: PlayIndex,
    candidate: DramaCandidate,
    closing: &ClosingClassification,
    involves_flip_or_tie: bool,
    high_impact: bool,
) -> FalseDramaDecision {
    let (suppressed, reason) = if involves_flip_or_tie {
        (false, "involves_lead_change")
    } else if high_impact {
        (false, "high_impact")
    } else if closing.is_decided() {
        (true, "decided_game_closing")
    } else {
        (false, "not_decided")
    };

    FalseDramaDecision {
        index,
        candidate,
        situation: closing.situation,
        margin: closing.margin,
        tier: closing.tier,
        suppressed,
        reason: reason.to_string(),
    }
}
