//! Lead Ladder boundary detector.
//!
//! The detector walks the canonical stream once and runs a small state machine:
//! 1. **High impact**: ejections, injuries and flagrants cut immediately
//! 2. **Pending**: ties (and soft flips) must persist for N plays before they count
//! 3. **Crossing**: each new crossing is gated, then emitted or logged as suppressed

use serde::{Deserialize, Serialize};
use sport_rules::{detect_crossing, CrossingKind, Leader, PlayIndex, TierCrossing};
use tracing::{debug, info};

use super::{
    evaluate_false_drama, order_boundaries, BoundaryEvent, DramaCandidate, FalseDramaDecision,
};
use crate::kind::MomentType;
use crate::stream::PlayStream;

/// Tuning for boundary detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Plays a pending FLIP/TIE must persist before it is confirmed.
    pub hysteresis_plays: u32,

    /// Progress below which early-game gating applies.
    pub early_game_progress: f64,

    /// Highest previous tier that counts as a level early game.
    pub early_game_max_tier: u8,

    /// Minimum resulting tier for a FLIP to skip hysteresis.
    pub flip_immediate_min_tier: u8,

    /// Minimum canonical plays between consecutive FLIP/TIE boundaries.
    pub density_window_plays: usize,

    /// Progress from which a close game may override density gating.
    pub late_close_progress: f64,

    /// Highest tier that still counts as close for the override.
    pub late_close_max_tier: u8,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            hysteresis_plays: 2,
            early_game_progress: 0.15,
            early_game_max_tier: 0,
            flip_immediate_min_tier: 1,
            density_window_plays: 8,
            late_close_progress: 0.85,
            late_close_max_tier: 1,
        }
    }
}

/// Density-gate verdict for one FLIP/TIE candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityDecision {
    pub index: PlayIndex,
    pub crossing: CrossingKind,
    pub previous_index: Option<PlayIndex>,
    pub distance_plays: Option<usize>,
    pub window_plays: usize,
    pub suppressed: bool,
    pub late_close_override: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HysteresisOutcome {
    Confirmed,
    /// The leader changed before the crossing persisted.
    Invalidated,
    /// The game ended while the crossing was still pending.
    Expired,
}

/// What happened to one pending crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisDecision {
    pub index: PlayIndex,
    pub crossing: CrossingKind,
    pub outcome: HysteresisOutcome,
    pub persisted_plays: u32,
    pub early_game_forced: bool,
}

/// Boundaries plus the decision logs that explain them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub boundaries: Vec<BoundaryEvent>,
    pub density_decisions: Vec<DensityDecision>,
    pub false_drama_decisions: Vec<FalseDramaDecision>,
    pub hysteresis_decisions: Vec<HysteresisDecision>,
}

impl DetectionResult {
    /// Plays whose FLIP/TIE was dropped by the density gate.
    pub fn density_suppressed(&self) -> Vec<PlayIndex> {
        self.density_decisions
            .iter()
            .filter(|d| d.suppressed)
            .map(|d| d.index)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    crossing: TierCrossing,
    position: usize,
    leader: Leader,
    persisted: u32,
    early_forced: bool,
}

/// Walks the canonical stream and emits boundaries.
pub struct BoundaryDetector<'a> {
    stream: &'a PlayStream,
    config: &'a BoundaryConfig,
}

impl<'a> BoundaryDetector<'a> {
    pub fn new(stream: &'a PlayStream, config: &'a BoundaryConfig) -> Self {
        Self { stream, config }
    }

    /// Run detection over the whole stream.
    pub fn detect(&self) -> DetectionResult {
        let mut result = DetectionResult::default();
        let mut pending: Option<Pending> = None;
        let mut last_flip_tie: Option<(usize, PlayIndex)> = None;
        let mut closing_locked = false;

        for pos in 0..self.stream.len() {
            let prev = self.stream.state_before_position(pos);
            let curr = self.stream.state(pos);
            let play = self.stream.play(pos);
            let high_impact = play.has_high_impact_marker();

            if high_impact {
                result.boundaries.push(BoundaryEvent {
                    index: play.index,
                    moment_type: MomentType::HighImpact,
                    prev_state: prev,
                    curr_state: curr,
                    crossing: detect_crossing(&prev, &curr).map(|c| c.kind),
                    run: None,
                    trigger: "high_impact".to_string(),
                    note: play.description.clone(),
                });
            }

            // Step 1: advance or drop the pending crossing
            if let Some(mut waiting) = pending.take() {
                if curr.leader != waiting.leader {
                    result.hysteresis_decisions.push(self.hysteresis_record(
                        &waiting,
                        HysteresisOutcome::Invalidated,
                    ));
                } else {
                    waiting.persisted += 1;
                    if waiting.persisted >= self.config.hysteresis_plays {
                        result.hysteresis_decisions.push(self.hysteresis_record(
                            &waiting,
                            HysteresisOutcome::Confirmed,
                        ));
                        self.gate_density(
                            &waiting.crossing,
                            waiting.position,
                            &mut last_flip_tie,
                            &mut result,
                        );
                    } else {
                        pending = Some(waiting);
                    }
                }
            }

            // Step 2: classify this play's crossing
            let Some(crossing) = detect_crossing(&prev, &curr) else {
                continue;
            };
            let closing = self.stream.closing(pos);

            match crossing.kind {
                CrossingKind::Flip => {
                    if closing.is_close() {
                        result.boundaries.push(self.boundary(
                            pos,
                            &crossing,
                            MomentType::ClosingControl,
                            "closing_flip",
                        ));
                        continue;
                    }
                    let early_forced = self.stream.progress(pos) < self.config.early_game_progress
                        && prev.tier <= self.config.early_game_max_tier;
                    let immediate =
                        curr.tier >= self.config.flip_immediate_min_tier && !early_forced;

                    if immediate {
                        self.gate_density(&crossing, pos, &mut last_flip_tie, &mut result);
                    } else {
                        pending = Some(Pending {
                            crossing,
                            position: pos,
                            leader: curr.leader,
                            persisted: 0,
                            early_forced,
                        });
                    }
                }
                CrossingKind::TieReached => {
                    let early_forced = self.stream.progress(pos) < self.config.early_game_progress
                        && prev.tier <= self.config.early_game_max_tier;
                    pending = Some(Pending {
                        crossing,
                        position: pos,
                        leader: curr.leader,
                        persisted: 0,
                        early_forced,
                    });
                }
                CrossingKind::TieBroken => {
                    if curr.tier >= 1 {
                        result.boundaries.push(self.boundary(
                            pos,
                            &crossing,
                            MomentType::LeadBuild,
                            "tie_broken",
                        ));
                    }
                }
                CrossingKind::TierUp => {
                    if pending.is_some() {
                        continue;
                    }
                    if closing.is_decided() && !closing_locked {
                        closing_locked = true;
                        result.boundaries.push(self.boundary(
                            pos,
                            &crossing,
                            MomentType::ClosingControl,
                            "closing_lock",
                        ));
                    } else {
                        result.boundaries.push(self.boundary(
                            pos,
                            &crossing,
                            MomentType::LeadBuild,
                            "tier_up",
                        ));
                    }
                }
                CrossingKind::TierDown => {
                    if pending.is_some() {
                        continue;
                    }
                    let decision = evaluate_false_drama(
                        play.index,
                        DramaCandidate::TierDown,
                        &closing,
                        false,
                        high_impact,
                    );
                    let suppressed = decision.suppressed;
                    if suppressed {
                        debug!(index = play.index, "late cut suppressed as false drama");
                    }
                    result.false_drama_decisions.push(decision);
                    if !suppressed {
                        result.boundaries.push(self.boundary(
                            pos,
                            &crossing,
                            MomentType::Cut,
                            "tier_down",
                        ));
                    }
                }
            }
        }

        if let Some(waiting) = pending {
            result
                .hysteresis_decisions
                .push(self.hysteresis_record(&waiting, HysteresisOutcome::Expired));
        }

        result.boundaries = order_boundaries(result.boundaries);
        info!(
            boundaries = result.boundaries.len(),
            density_suppressed = result.density_suppressed().len(),
            "boundary detection complete"
        );
        result
    }

    /// Apply the density window to a FLIP/TIE and emit it if it survives.
    fn gate_density(
        &self,
        crossing: &TierCrossing,
        pos: usize,
        last_flip_tie: &mut Option<(usize, PlayIndex)>,
        result: &mut DetectionResult,
    ) {
        let index = self.stream.index(pos);
        let window = self.config.density_window_plays;
        let distance = last_flip_tie.map(|(last_pos, _)| pos.saturating_sub(last_pos));

        let within_window = distance.is_some_and(|d| d < window);
        let late_close = self.stream.progress(pos) >= self.config.late_close_progress
            && crossing.curr.tier <= self.config.late_close_max_tier;
        let suppressed = within_window && !late_close;
        let late_close_override = within_window && late_close;

        let reason = if suppressed {
            format!("within_window_{window}_plays")
        } else if late_close_override {
            "late_close_override".to_string()
        } else {
            "outside_window".to_string()
        };

        if suppressed {
            debug!(index, reason = %reason, "density gate suppressed {}", crossing.kind);
        }

        result.density_decisions.push(DensityDecision {
            index,
            crossing: crossing.kind,
            previous_index: last_flip_tie.map(|(_, idx)| idx),
            distance_plays: distance,
            window_plays: window,
            suppressed,
            late_close_override,
            reason,
        });

        if !suppressed {
            let (moment_type, trigger) = match crossing.kind {
                CrossingKind::TieReached => (MomentType::Tie, "tie"),
                _ => (MomentType::Flip, "flip"),
            };
            result
                .boundaries
                .push(self.boundary(pos, crossing, moment_type, trigger));
            *last_flip_tie = Some((pos, index));
        }
    }

    fn boundary(
        &self,
        pos: usize,
        crossing: &TierCrossing,
        moment_type: MomentType,
        trigger: &str,
    ) -> BoundaryEvent {
        BoundaryEvent {
            index: self.stream.index(pos),
            moment_type,
            prev_state: crossing.prev,
            curr_state: crossing.curr,
            crossing: Some(crossing.kind),
            run: None,
            trigger: trigger.to_string(),
            note: format!("{} -> {}", crossing.prev.score(), crossing.curr.score()),
        }
    }

    fn hysteresis_record(
        &self,
        pending: &Pending,
        outcome: HysteresisOutcome,
    ) -> HysteresisDecision {
        HysteresisDecision {
            index: self.stream.index(pending.position),
            crossing: pending.crossing.kind,
            outcome,
            persisted_plays: pending.persisted,
            early_game_forced: pending.early_forced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{nba, ScriptedGame};

    fn detect(game: &ScriptedGame) -> DetectionResult {
        let stream = game.build_stream();
        BoundaryDetector::new(&stream, &BoundaryConfig::default()).detect()
    }

    fn kinds(result: &DetectionResult) -> Vec<(PlayIndex, MomentType)> {
        result
            .boundaries
            .iter()
            .map(|b| (b.index, b.moment_type))
            .collect()
    }

    #[test]
    fn test_lead_build_then_confirmed_tie_then_nothing() {
        // 0-0 -> 10-0 -> 10-10 (held two plays) -> 12-10
        let game = ScriptedGame::new().home(10).away(10).idle(2).home(2);
        let result = detect(&game);

        assert_eq!(
            kinds(&result),
            vec![(0, MomentType::LeadBuild), (1, MomentType::Tie)]
        );
        assert_eq!(result.boundaries[0].curr_state.tier, 3);
        assert_eq!(
            result.hysteresis_decisions[0].outcome,
            HysteresisOutcome::Confirmed
        );
    }

    #[test]
    fn test_unconfirmed_tie_is_invalidated() {
        let game = ScriptedGame::new().home(10).away(10).home(2);
        let result = detect(&game);

        assert_eq!(kinds(&result), vec![(0, MomentType::LeadBuild)]);
        assert_eq!(
            result.hysteresis_decisions[0].outcome,
            HysteresisOutcome::Invalidated
        );
    }

    #[test]
    fn test_second_flip_inside_density_window_is_suppressed() {
        let game = ScriptedGame::new()
            .at(2, 600)
            .home(4)
            .away(8)
            .idle(2)
            .home(8);
        let result = detect(&game);

        assert_eq!(
            kinds(&result),
            vec![(0, MomentType::LeadBuild), (1, MomentType::Flip)]
        );
        let suppressed: Vec<_> = result
            .density_decisions
            .iter()
            .filter(|d| d.suppressed)
            .collect();
        assert_eq!(suppressed.len(), 1);
        assert_eq!(suppressed[0].index, 4);
        assert_eq!(suppressed[0].reason, "within_window_8_plays");
        assert_eq!(result.density_suppressed(), vec![4]);
    }

    #[test]
    fn test_late_close_game_overrides_density() {
        // Keep the closing classifier out of the way so flips stay plain flips.
        let mut sport = nba();
        sport.closing.window_seconds = 0;
        let stream = ScriptedGame::new()
            .at(4, 200)
            .home(2)
            .away(5)
            .idle(2)
            .home(6)
            .build_stream_with(&sport);

        let result = BoundaryDetector::new(&stream, &BoundaryConfig::default()).detect();

        assert_eq!(result.density_decisions.len(), 2);
        let second = &result.density_decisions[1];
        assert!(!second.suppressed);
        assert!(second.late_close_override);
        assert_eq!(second.reason, "late_close_override");
    }

    #[test]
    fn test_high_impact_always_emits() {
        let game = ScriptedGame::new()
            .home(2)
            .note("Flagrant foul type 1 on Brown")
            .home(1);
        let result = detect(&game);

        assert!(result
            .boundaries
            .iter()
            .any(|b| b.index == 1 && b.moment_type == MomentType::HighImpact));
    }

    #[test]
    fn test_closing_flip_becomes_closing_control() {
        let game = ScriptedGame::new().at(4, 120).home(2).away(3);
        let result = detect(&game);

        assert!(result
            .boundaries
            .iter()
            .any(|b| b.index == 1 && b.moment_type == MomentType::ClosingControl));
        assert!(result.density_decisions.is_empty());
    }

    #[test]
    fn test_decided_late_cut_is_false_drama() {
        let game = ScriptedGame::new()
            .at(4, 400)
            .home(25)
            .at(4, 120)
            .away(10);
        let result = detect(&game);

        assert!(result.boundaries.iter().all(|b| b.moment_type != MomentType::Cut));
        assert!(result
            .false_drama_decisions
            .iter()
            .any(|d| d.suppressed && d.candidate == DramaCandidate::TierDown));
    }

    #[test]
    fn test_early_flip_waits_for_hysteresis() {
        // 2-0 then 2-5 in the opening minutes, answered by a tie.
        let game = ScriptedGame::new().home(2).away(5).home(3);
        let result = detect(&game);

        assert!(result.boundaries.iter().all(|b| b.moment_type != MomentType::Flip));
        let decision = &result.hysteresis_decisions[0];
        assert_eq!(decision.crossing, CrossingKind::Flip);
        assert!(decision.early_game_forced);
        assert_eq!(decision.outcome, HysteresisOutcome::Invalidated);
    }

    #[test]
    fn test_first_decided_tier_up_locks_closing_control() {
        // 8-0, 12-0 (decided inside the final five minutes), 18-0.
        let game = ScriptedGame::new().at(4, 290).home(8).home(4).home(6);
        let result = detect(&game);

        assert_eq!(
            kinds(&result),
            vec![
                (0, MomentType::LeadBuild),
                (1, MomentType::ClosingControl),
                (2, MomentType::LeadBuild)
            ]
        );
        assert_eq!(result.boundaries[1].trigger, "closing_lock");
        assert_eq!(result.boundaries[2].trigger, "tier_up");
    }
}
