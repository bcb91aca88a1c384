use serde::{Deserialize, Serialize};
use sport_rules::{GamePhase, TeamSide};

use crate::kind::MomentType;
use crate::moment::Moment;
use crate::selection::act_of;
use crate::stream::PlayStream;

/// How firmly the leading team controls the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlStrength {
    None,
    Weak,
    Moderate,
    Strong,
}

impl ControlStrength {
    pub fn from_tier(tier: u8, tied: bool) -> Self {
        match (tied, tier) {
            (true, _) => ControlStrength::None,
            (false, 0 | 1) => ControlStrength::Weak,
            (false, 2) => ControlStrength::Moderate,
            (false, _) => ControlStrength::Strong,
        }
    }
}

/// Whether the trailing team threatens that control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    None,
    Potential,
    Real,
}

impl ThreatLevel {
    /// Threat after a moment ends.
    ///
    /// A CUT that drops two or more tiers is at least a potential threat even
    /// when the lead is still large.
    pub fn after(moment: &Moment) -> Self {
        if moment.controlling_team.is_none() {
            return ThreatLevel::None;
        }
        match moment.tier_after {
            0 => ThreatLevel::Real,
            1 => ThreatLevel::Potential,
            _ if moment.moment_type == MomentType::Cut
                && moment.tier_before >= moment.tier_after + 2 =>
            {
                ThreatLevel::Potential
            }
            _ => ThreatLevel::None,
        }
    }
}

/// Narrative state after a moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeState {
    pub controlling_team: Option<TeamSide>,
    pub strength: ControlStrength,
    pub threat: ThreatLevel,
    pub phase: GamePhase,
    /// Same-control CUTs in a row, this one included.
    pub consecutive_cuts: u32,
    /// LEAD_BUILDs in a row, this one included.
    pub consecutive_builds: u32,
    /// Canonical plays since strength, threat or control last changed.
    pub dormancy: usize,
}

impl NarrativeState {
    /// State before the first moment.
    pub fn initial() -> Self {
        Self {
            controlling_team: None,
            strength: ControlStrength::None,
            threat: ThreatLevel::None,
            phase: GamePhase::Opening,
            consecutive_cuts: 0,
            consecutive_builds: 0,
            dormancy: 0,
        }
    }

    /// State after applying `moment` on top of `self`.
    pub fn advance(&self, moment: &Moment, stream: &PlayStream) -> Self {
        let controlling_team = moment.controlling_team;
        let strength = ControlStrength::from_tier(moment.tier_after, controlling_team.is_none());
        let threat = ThreatLevel::after(moment);
        let same_control = controlling_team == self.controlling_team;

        let consecutive_cuts = match moment.moment_type {
            MomentType::Cut if same_control => self.consecutive_cuts + 1,
            MomentType::Cut => 1,
            _ => 0,
        };
        let consecutive_builds = match moment.moment_type {
            MomentType::LeadBuild => self.consecutive_builds + 1,
            _ => 0,
        };

        let changed = !same_control || strength != self.strength || threat != self.threat;
        let dormancy = if changed {
            0
        } else {
            self.dormancy + moment.play_count
        };

        Self {
            controlling_team,
            strength,
            threat,
            phase: act_of(moment, stream),
            consecutive_cuts,
            consecutive_builds,
            dormancy,
        }
    }

    /// Whether control, strength, threat or phase differ from `other`.
    pub fn differs_from(&self, other: &Self) -> bool {
        self.controlling_team != other.controlling_team
            || self.strength != other.strength
            || self.threat != other.threat
            || self.phase != other.phase
    }
}
