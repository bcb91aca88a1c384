//! Coherence enforcement - a narrative state machine over the selected moments.
//!
//! Each moment advances a [`NarrativeState`]. A moment survives when it is an
//! always-allowed type, or when it changes control, strength, threat or phase,
//! or crosses a tier before the game has gone dormant. Everything else is
//! merged into its predecessor. Suppression rules for fake comebacks, late
//! CUTs under firm control and dormant split segments run first, and a final
//! pass downgrades long runs of the same structural beat to NEUTRAL.

mod state;

pub use state::*;

use serde::{Deserialize, Serialize};
use sport_rules::GamePhase;
use tracing::{debug, info};

use crate::kind::MomentType;
use crate::merge::{absorb_into_neighbor, MergeReason, MergeRecord};
use crate::moment::{Moment, MomentId};
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceConfig {
    /// Plays without a state change after which tier crossings stop counting.
    pub dormancy_plays: usize,
    /// Kept moments that must separate two comebacks.
    pub comeback_cooldown: usize,
    /// The nth consecutive same-control CUT and later become NEUTRAL.
    pub cut_downgrade_at: u32,
    /// The nth consecutive LEAD_BUILD and later become NEUTRAL.
    pub build_downgrade_at: u32,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            dormancy_plays: 15,
            comeback_cooldown: 3,
            cut_downgrade_at: 3,
            build_downgrade_at: 4,
        }
    }
}

/// Why a moment was kept or suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoherenceVerdict {
    FirstMoment,
    AlwaysAllowed,
    Chapter,
    StateChange,
    TierCrossing,
    LateCutUnderControl,
    FakeComeback,
    RepeatedComeback,
    DormantSplit,
    NoStateChange,
}

impl CoherenceVerdict {
    pub fn keeps(&self) -> bool {
        matches!(
            self,
            CoherenceVerdict::FirstMoment
                | CoherenceVerdict::AlwaysAllowed
                | CoherenceVerdict::Chapter
                | CoherenceVerdict::StateChange
                | CoherenceVerdict::TierCrossing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceDecision {
    pub id: MomentId,
    pub moment_type: MomentType,
    pub verdict: CoherenceVerdict,
    pub state: NarrativeState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowngradeRecord {
    pub id: MomentId,
    pub from: MomentType,
    pub consecutive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoherenceResult {
    pub decisions: Vec<CoherenceDecision>,
    pub downgrades: Vec<DowngradeRecord>,
    pub merges: Vec<MergeRecord>,
}

impl CoherenceResult {
    pub fn suppressed(&self) -> usize {
        self.decisions.iter().filter(|d| !d.verdict.keeps()).count()
    }
}

pub struct CoherenceEnforcer {
    config: CoherenceConfig,
}

impl CoherenceEnforcer {
    pub fn new(config: CoherenceConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CoherenceConfig::default())
    }

    fn judge(
        &self,
        moment: &Moment,
        prev: &NarrativeState,
        next: &NarrativeState,
        kept: usize,
        last_comeback: Option<usize>,
    ) -> CoherenceVerdict {
        if kept == 0 {
            return CoherenceVerdict::FirstMoment;
        }

        // A later split segment has to earn its place whatever its type.
        let state_change = next.differs_from(prev);
        if let Some(split) = &moment.split {
            if split.segment > 0 && (split.dormant || !state_change) {
                return CoherenceVerdict::DormantSplit;
            }
        }

        if moment.moment_type.is_always_allowed() {
            return CoherenceVerdict::AlwaysAllowed;
        }
        if moment.is_chapter() {
            return CoherenceVerdict::Chapter;
        }

        if moment.moment_type == MomentType::Cut {
            let firm = next.strength == ControlStrength::Strong || next.threat == ThreatLevel::None;
            if next.phase == GamePhase::Closing && firm {
                return CoherenceVerdict::LateCutUnderControl;
            }
            if next.threat != ThreatLevel::Real {
                return CoherenceVerdict::FakeComeback;
            }
            if last_comeback.is_some_and(|at| kept - at <= self.config.comeback_cooldown) {
                return CoherenceVerdict::RepeatedComeback;
            }
        }

        if state_change {
            CoherenceVerdict::StateChange
        } else if moment.has_tier_change() && prev.dormancy < self.config.dormancy_plays {
            CoherenceVerdict::TierCrossing
        } else {
            CoherenceVerdict::NoStateChange
        }
    }

    /// Walk the moments left to right, merging incoherent ones away.
    pub fn enforce(
        &self,
        moments: Vec<Moment>,
        stream: &PlayStream,
    ) -> (Vec<Moment>, CoherenceResult) {
        let before = moments.len();
        let mut result = CoherenceResult::default();
        let mut out: Vec<Moment> = Vec::with_capacity(moments.len());
        // states[k] is the state after out[k].
        let mut states: Vec<NarrativeState> = Vec::with_capacity(moments.len());
        let mut last_comeback: Option<usize> = None;

        for moment in moments {
            let prev = states.last().copied().unwrap_or_else(NarrativeState::initial);
            let next = prev.advance(&moment, stream);
            let verdict = self.judge(&moment, &prev, &next, out.len(), last_comeback);

            result.decisions.push(CoherenceDecision {
                id: moment.id,
                moment_type: moment.moment_type,
                verdict,
                state: next,
            });

            if verdict.keeps() {
                if moment.moment_type == MomentType::Cut && next.threat == ThreatLevel::Real {
                    last_comeback = Some(out.len());
                }
                out.push(moment);
                states.push(next);
                continue;
            }

            debug!(
                moment = %moment.id,
                verdict = ?verdict,
                "coherence suppressed {}",
                moment.moment_type
            );
            out.push(moment);
            let last = out.len() - 1;
            let detail = format!("{verdict:?}");
            let reason = MergeReason::Coherence;
            if let Some(merge) =
                absorb_into_neighbor(&mut out, last, last - 1, reason, detail, stream)
            {
                result.merges.push(merge);
            }
            // Re-derive the survivor's state from the state before it.
            let base = if states.len() >= 2 {
                states[states.len() - 2]
            } else {
                NarrativeState::initial()
            };
            if let (Some(survivor), Some(slot)) = (out.last(), states.last_mut()) {
                *slot = base.advance(survivor, stream);
            }
        }

        result.downgrades = downgrade_repeats(&mut out, stream, &self.config);

        info!(
            before,
            after = out.len(),
            suppressed = result.suppressed(),
            downgraded = result.downgrades.len(),
            "coherence enforced"
        );
        (out, result)
    }
}

/// Downgrade long runs of same-control CUTs and of LEAD_BUILDs to NEUTRAL.
///
/// Streaks are read from the narrative state, which counts a moment before
/// its type changes, so a downgraded moment still extends its streak.
pub fn downgrade_repeats(
    moments: &mut [Moment],
    stream: &PlayStream,
    config: &CoherenceConfig,
) -> Vec<DowngradeRecord> {
    let mut records = Vec::new();
    let mut state = NarrativeState::initial();

    for moment in moments.iter_mut() {
        state = state.advance(moment, stream);
        let from = moment.moment_type;
        let consecutive = match from {
            MomentType::Cut => {
                Some(state.consecutive_cuts).filter(|&n| n >= config.cut_downgrade_at)
            }
            MomentType::LeadBuild => {
                Some(state.consecutive_builds).filter(|&n| n >= config.build_downgrade_at)
            }
            _ => None,
        };

        if let Some(consecutive) = consecutive {
            debug!(moment = %moment.id, consecutive, "downgraded {} to NEUTRAL", from);
            moment.moment_type = MomentType::Neutral;
            records.push(DowngradeRecord {
                id: moment.id,
                from,
                consecutive,
            });
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moment::{Reason, SplitInfo};
    use crate::test_support::ScriptedGame;

    fn moment(stream: &PlayStream, start: u32, end: u32, moment_type: MomentType) -> Moment {
        Moment::from_range(stream, start, end, moment_type, Reason::new("test"))
    }

    #[test]
    fn test_late_cut_under_strong_control_is_merged() {
        let stream = ScriptedGame::new()
            .home(20)
            .idle(3)
            .at(4, 600)
            .away(3)
            .idle(2)
            .build_stream();
        let moments = vec![
            moment(&stream, 0, 3, MomentType::LeadBuild),
            moment(&stream, 4, 6, MomentType::Cut),
        ];

        let (out, result) = CoherenceEnforcer::with_defaults().enforce(moments, &stream);

        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start_play, out[0].end_play), (0, 6));
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::LateCutUnderControl);
        assert_eq!(result.merges[0].reason, MergeReason::Coherence);
    }

    #[test]
    fn test_fake_and_real_comebacks() {
        let fake = ScriptedGame::new().home(12).idle(3).away(3).idle(2).build_stream();
        let (out, result) = CoherenceEnforcer::with_defaults().enforce(
            vec![moment(&fake, 0, 3, MomentType::LeadBuild), moment(&fake, 4, 6, MomentType::Cut)],
            &fake,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::FakeComeback);

        let real = ScriptedGame::new().home(12).idle(3).away(10).idle(2).build_stream();
        let (out, result) = CoherenceEnforcer::with_defaults().enforce(
            vec![moment(&real, 0, 3, MomentType::LeadBuild), moment(&real, 4, 6, MomentType::Cut)],
            &real,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::StateChange);
        assert_eq!(result.decisions[1].state.threat, ThreatLevel::Real);
    }

    #[test]
    fn test_always_allowed_types_survive() {
        let stream = ScriptedGame::new().home(3).away(5).idle(2).build_stream();
        let moments = vec![
            moment(&stream, 0, 0, MomentType::LeadBuild),
            moment(&stream, 1, 3, MomentType::Flip),
        ];

        let (out, result) = CoherenceEnforcer::with_defaults().enforce(moments, &stream);

        assert_eq!(out.len(), 2);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::AlwaysAllowed);
        assert_eq!(result.suppressed(), 0);
    }

    #[test]
    fn test_dormant_split_segment_is_merged() {
        let stream = ScriptedGame::new().home(12).idle(10).build_stream();
        let first = moment(&stream, 0, 4, MomentType::LeadBuild);
        let mut second = moment(&stream, 5, 10, MomentType::LeadBuild);
        second.split = Some(SplitInfo {
            parent: first.id,
            segment: 1,
            segments: 2,
            cue: Some("period_transition".to_string()),
            dormant: true,
        });

        let (out, result) =
            CoherenceEnforcer::with_defaults().enforce(vec![first, second], &stream);

        assert_eq!(out.len(), 1);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::DormantSplit);
    }

    #[test]
    fn test_repeated_builds_and_cuts_are_downgraded() {
        let stream = ScriptedGame::new()
            .home(3)
            .home(3)
            .home(4)
            .home(6)
            .home(6)
            .away(2)
            .away(2)
            .away(2)
            .build_stream();
        let mut moments: Vec<Moment> = (0..5)
            .map(|i| moment(&stream, i, i, MomentType::LeadBuild))
            .collect();
        moments.extend((5..8).map(|i| moment(&stream, i, i, MomentType::Cut)));

        let records = downgrade_repeats(&mut moments, &stream, &CoherenceConfig::default());

        let downgraded: Vec<u32> = records.iter().map(|r| r.consecutive).collect();
        assert_eq!(downgraded, vec![4, 5, 3]);
        assert_eq!(moments[3].moment_type, MomentType::Neutral);
        assert_eq!(moments[7].moment_type, MomentType::Neutral);
        assert_eq!(moments[5].moment_type, MomentType::Cut);
    }

    #[test]
    fn test_dormant_split_tie_is_not_always_allowed() {
        let stream = ScriptedGame::new().home(12).idle(10).build_stream();
        let first = moment(&stream, 0, 4, MomentType::LeadBuild);
        let mut second = moment(&stream, 5, 10, MomentType::Tie);
        second.split = Some(SplitInfo {
            parent: first.id,
            segment: 1,
            segments: 2,
            cue: Some("drought_end".to_string()),
            dormant: true,
        });

        let (out, result) =
            CoherenceEnforcer::with_defaults().enforce(vec![first, second], &stream);

        assert_eq!(out.len(), 1);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::DormantSplit);
    }

    #[test]
    fn test_second_comeback_inside_cooldown_is_merged() {
        // 12-0, 12-10, 22-10, 22-20: two real comebacks two moments apart.
        let stream = ScriptedGame::new().home(12).away(10).home(10).away(10).build_stream();
        let moments = vec![
            moment(&stream, 0, 0, MomentType::LeadBuild),
            moment(&stream, 1, 1, MomentType::Cut),
            moment(&stream, 2, 2, MomentType::LeadBuild),
            moment(&stream, 3, 3, MomentType::Cut),
        ];

        let (out, result) = CoherenceEnforcer::with_defaults().enforce(moments, &stream);

        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::StateChange);
        assert_eq!(result.decisions[3].verdict, CoherenceVerdict::RepeatedComeback);
        assert_eq!(out.len(), 3);
        assert_eq!((out[2].start_play, out[2].end_play), (2, 3));
    }

    #[test]
    fn test_tier_crossing_counts_only_before_dormancy() {
        // 12-0, a quiet stretch, 18-0 on play 20, then 18-4 on play 23.
        let stream = ScriptedGame::new()
            .home(12)
            .idle(19)
            .home(6)
            .idle(2)
            .away(4)
            .build_stream();
        let moments = vec![
            moment(&stream, 0, 0, MomentType::LeadBuild),
            moment(&stream, 1, 20, MomentType::LeadBuild),
            moment(&stream, 21, 23, MomentType::Neutral),
        ];

        let (out, result) = CoherenceEnforcer::with_defaults().enforce(moments, &stream);

        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::TierCrossing);
        assert_eq!(result.decisions[1].state.dormancy, 20);
        assert_eq!(result.decisions[2].verdict, CoherenceVerdict::NoStateChange);
        assert_eq!(out.len(), 2);
    }
}
