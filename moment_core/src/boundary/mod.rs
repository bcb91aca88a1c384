//! Boundary detection - where one narrative beat ends and the next begins.
//!
//! Two independent scans run over the same canonical stream:
//! 1. **Lead Ladder crossings**: tier changes, ties and flips, filtered by
//!    hysteresis, early-game gating, density gating and false-drama suppression
//! 2. **Runs**: unanswered scoring sequences, some of which are promoted to
//!    MOMENTUM_SHIFT boundaries

mod detector;
mod false_drama;
mod runs;

pub use detector::*;
pub use false_drama::*;
pub use runs::*;

use serde::{Deserialize, Serialize};
use sport_rules::{CrossingKind, LeadState, PlayIndex};

use crate::kind::MomentType;

/// A causally justified cut point in the play stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    /// Canonical play the new moment starts at.
    pub index: PlayIndex,
    pub moment_type: MomentType,
    pub prev_state: LeadState,
    pub curr_state: LeadState,
    pub crossing: Option<CrossingKind>,
    pub run: Option<DetectedRun>,
    /// Short machine label of the rule that fired.
    pub trigger: String,
    pub note: String,
}

impl BoundaryEvent {
    /// Which boundary wins when two land on the same play.
    fn precedence(&self) -> u8 {
        match self.moment_type {
            MomentType::HighImpact => 6,
            MomentType::ClosingControl => 5,
            MomentType::Flip => 4,
            MomentType::Tie => 3,
            MomentType::MomentumShift => 2,
            MomentType::Cut => 1,
            MomentType::LeadBuild
            | MomentType::Neutral
            | MomentType::QuarterRecap
            | MomentType::HalftimeRecap
            | MomentType::RegulationRecap
            | MomentType::FinalRecap => 0,
        }
    }
}

/// Sort boundaries by index, keeping one per index.
pub fn order_boundaries(mut boundaries: Vec<BoundaryEvent>) -> Vec<BoundaryEvent> {
    boundaries.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then_with(|| b.precedence().cmp(&a.precedence()))
    });
    boundaries.dedup_by(|later, earlier| later.index == earlier.index);
    boundaries
}
