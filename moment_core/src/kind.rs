//! Moment types.

use serde::{Deserialize, Serialize};

/// The narrative beat a moment represents.
///
/// Closed on purpose: every pass matches exhaustively, so adding a variant
/// forces each pass to decide how to treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentType {
    LeadBuild,
    Cut,
    Tie,
    Flip,
    ClosingControl,
    HighImpact,
    Neutral,
    MomentumShift,
    QuarterRecap,
    HalftimeRecap,
    RegulationRecap,
    FinalRecap,
}

impl MomentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentType::LeadBuild => "LEAD_BUILD",
            MomentType::Cut => "CUT",
            MomentType::Tie => "TIE",
            MomentType::Flip => "FLIP",
            MomentType::ClosingControl => "CLOSING_CONTROL",
            MomentType::HighImpact => "HIGH_IMPACT",
            MomentType::Neutral => "NEUTRAL",
            MomentType::MomentumShift => "MOMENTUM_SHIFT",
            MomentType::QuarterRecap => "QUARTER_RECAP",
            MomentType::HalftimeRecap => "HALFTIME_RECAP",
            MomentType::RegulationRecap => "REGULATION_RECAP",
            MomentType::FinalRecap => "FINAL_RECAP",
        }
    }

    /// Types that never merge with anything.
    pub fn is_protected(&self) -> bool {
        match self {
            MomentType::Flip | MomentType::ClosingControl | MomentType::HighImpact => true,
            MomentType::QuarterRecap
            | MomentType::HalftimeRecap
            | MomentType::RegulationRecap
            | MomentType::FinalRecap => true,
            MomentType::LeadBuild
            | MomentType::Cut
            | MomentType::Tie
            | MomentType::Neutral
            | MomentType::MomentumShift => false,
        }
    }

    /// Types that always survive coherence and may span a single play.
    pub fn is_always_allowed(&self) -> bool {
        match self {
            MomentType::Flip
            | MomentType::Tie
            | MomentType::ClosingControl
            | MomentType::HighImpact => true,
            MomentType::LeadBuild
            | MomentType::Cut
            | MomentType::Neutral
            | MomentType::MomentumShift
            | MomentType::QuarterRecap
            | MomentType::HalftimeRecap
            | MomentType::RegulationRecap
            | MomentType::FinalRecap => false,
        }
    }

    pub fn is_recap(&self) -> bool {
        matches!(
            self,
            MomentType::QuarterRecap
                | MomentType::HalftimeRecap
                | MomentType::RegulationRecap
                | MomentType::FinalRecap
        )
    }

    /// Lead-margin movements that merge with each other under identical control.
    pub fn is_margin_move(&self) -> bool {
        matches!(
            self,
            MomentType::LeadBuild | MomentType::Cut | MomentType::MomentumShift
        )
    }

    /// Types that keep a detected run as `run_info`.
    pub fn owns_runs(&self) -> bool {
        matches!(self, MomentType::LeadBuild | MomentType::Cut | MomentType::Flip)
    }

    /// Merge priority: lower values are merged away first.
    pub fn merge_priority(&self) -> u8 {
        match self {
            MomentType::Neutral => 0,
            MomentType::LeadBuild | MomentType::Cut | MomentType::MomentumShift => 1,
            MomentType::Tie => 2,
            MomentType::Flip
            | MomentType::ClosingControl
            | MomentType::HighImpact
            | MomentType::QuarterRecap
            | MomentType::HalftimeRecap
            | MomentType::RegulationRecap
            | MomentType::FinalRecap => 3,
        }
    }
}

impl std::fmt::Display for MomentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
