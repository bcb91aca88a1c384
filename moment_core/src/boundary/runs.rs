//! Run detection and run-to-boundary promotion.

use serde::{Deserialize, Serialize};
use sport_rules::{PlayIndex, TeamSide};
use tracing::{debug, info};

use super::{
    evaluate_false_drama, order_boundaries, BoundaryEvent, DramaCandidate, FalseDramaDecision,
};
use crate::kind::MomentType;
use crate::stream::PlayStream;

/// Tuning for run detection and promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Unanswered points before a sequence is recorded as a run.
    pub min_run_points: u32,

    /// Unanswered points before a run may become a boundary.
    pub promotion_min_points: u32,

    /// Progress after which a lopsided run is garbage time.
    pub garbage_time_progress: f64,

    /// Resulting tier at or above which a late run is garbage time.
    pub garbage_time_min_tier: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_run_points: 6,
            promotion_min_points: 8,
            garbage_time_progress: 0.9,
            garbage_time_min_tier: 3,
        }
    }
}

/// An unanswered scoring sequence by one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedRun {
    pub team: TeamSide,
    pub points: u32,
    pub start_play: PlayIndex,
    pub end_play: PlayIndex,
    pub scoring_plays: Vec<PlayIndex>,
}

impl DetectedRun {
    pub fn contains(&self, index: PlayIndex) -> bool {
        (self.start_play..=self.end_play).contains(&index)
    }
}

/// Why a run was or was not promoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPromotionDecision {
    pub team: TeamSide,
    pub points: u32,
    pub start_play: PlayIndex,
    pub end_play: PlayIndex,
    pub tier_delta: u8,
    pub leader_changed: bool,
    pub promoted: bool,
    pub reason: String,
}

/// Boundaries after run promotion, with the decisions behind them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunEvaluation {
    pub boundaries: Vec<BoundaryEvent>,
    pub decisions: Vec<RunPromotionDecision>,
    pub false_drama_decisions: Vec<FalseDramaDecision>,
}

impl RunEvaluation {
    pub fn promoted(&self) -> impl Iterator<Item = &RunPromotionDecision> {
        self.decisions.iter().filter(|d| d.promoted)
    }
}

struct OpenRun {
    team: TeamSide,
    points: u32,
    scoring_plays: Vec<PlayIndex>,
}

impl OpenRun {
    fn close(self, min_points: u32, runs: &mut Vec<DetectedRun>) {
        if self.points < min_points {
            return;
        }
        if let (Some(&start_play), Some(&end_play)) =
            (self.scoring_plays.first(), self.scoring_plays.last())
        {
            runs.push(DetectedRun {
                team: self.team,
                points: self.points,
                start_play,
                end_play,
                scoring_plays: self.scoring_plays,
            });
        }
    }
}

/// Find unanswered scoring sequences of at least `min_run_points`.
///
/// A run closes when the opponent scores, or when both teams score on the
/// same play.
pub fn detect_runs(stream: &PlayStream, config: &RunConfig) -> Vec<DetectedRun> {
    let mut runs = Vec::new();
    let mut current: Option<OpenRun> = None;

    for pos in 0..stream.len() {
        let before = stream.state_before_position(pos).score();
        let after = stream.state(pos).score();
        let home = after.home.saturating_sub(before.home);
        let away = after.away.saturating_sub(before.away);

        let (team, points) = match (home, away) {
            (0, 0) => continue,
            (h, 0) => (TeamSide::Home, h),
            (0, a) => (TeamSide::Away, a),
            _ => {
                if let Some(open) = current.take() {
                    open.close(config.min_run_points, &mut runs);
                }
                continue;
            }
        };

        match current.as_mut() {
            Some(open) if open.team == team => {
                open.points += points;
                open.scoring_plays.push(stream.index(pos));
            }
            _ => {
                if let Some(open) = current.take() {
                    open.close(config.min_run_points, &mut runs);
                }
                current = Some(OpenRun {
                    team,
                    points,
                    scoring_plays: vec![stream.index(pos)],
                });
            }
        }
    }

    if let Some(open) = current {
        open.close(config.min_run_points, &mut runs);
    }

    debug!(runs = runs.len(), "run detection complete");
    runs
}

/// Promote qualifying runs into MOMENTUM_SHIFT boundaries.
///
/// LEAD_BUILD and CUT boundaries sitting on a promoted run's own scoring plays
/// are effects of the run and are replaced by the run boundary.
pub fn evaluate_run_boundaries(
    stream: &PlayStream,
    runs: &[DetectedRun],
    boundaries: &[BoundaryEvent],
    config: &RunConfig,
) -> RunEvaluation {
    let mut evaluation = RunEvaluation::default();
    let mut promoted_runs: Vec<&DetectedRun> = Vec::new();
    let mut added = Vec::new();

    for run in runs {
        let (Some(start_pos), Some(end_pos)) =
            (stream.position_of(run.start_play), stream.position_of(run.end_play))
        else {
            continue;
        };
        let before = stream.state_before_position(start_pos);
        let after = stream.state(end_pos);
        let tier_delta = before.tier.abs_diff(after.tier);
        let leader_changed = before.leader != after.leader;

        let reason = if run.points < config.promotion_min_points {
            "below_promotion_points"
        } else if tier_delta == 0 && !leader_changed {
            "no_tier_or_leader_change"
        } else if boundaries
            .iter()
            .any(|b| run.contains(b.index) && !is_run_effect(b, run))
        {
            "overlaps_boundary"
        } else if stream.progress(end_pos) > config.garbage_time_progress
            && after.tier >= config.garbage_time_min_tier
        {
            "garbage_time"
        } else if before.trailing() == Some(run.team) {
            let decision = evaluate_false_drama(
                run.start_play,
                DramaCandidate::RunCut,
                &stream.closing(end_pos),
                leader_changed || after.leader.is_tied(),
                stream.has_high_impact(start_pos..end_pos + 1),
            );
            let suppressed = decision.suppressed;
            evaluation.false_drama_decisions.push(decision);
            if suppressed {
                "false_drama"
            } else {
                "promoted"
            }
        } else {
            "promoted"
        };

        let promoted = reason == "promoted";
        debug!(
            team = ?run.team,
            points = run.points,
            start = run.start_play,
            reason,
            "run evaluated"
        );

        if promoted {
            added.push(BoundaryEvent {
                index: run.start_play,
                moment_type: MomentType::MomentumShift,
                prev_state: before,
                curr_state: stream.state(start_pos),
                crossing: None,
                run: Some(run.clone()),
                trigger: "run".to_string(),
                note: format!("{}-0 run", run.points),
            });
            promoted_runs.push(run);
        }

        evaluation.decisions.push(RunPromotionDecision {
            team: run.team,
            points: run.points,
            start_play: run.start_play,
            end_play: run.end_play,
            tier_delta,
            leader_changed,
            promoted,
            reason: reason.to_string(),
        });
    }

    let mut merged: Vec<BoundaryEvent> = boundaries
        .iter()
        .filter(|b| !promoted_runs.iter().any(|run| is_run_effect(b, run)))
        .cloned()
        .collect();
    merged.extend(added);
    evaluation.boundaries = order_boundaries(merged);

    info!(
        runs = runs.len(),
        promoted = evaluation.promoted().count(),
        "run promotion complete"
    );
    evaluation
}

fn is_run_effect(boundary: &BoundaryEvent, run: &DetectedRun) -> bool {
    matches!(boundary.moment_type, MomentType::LeadBuild | MomentType::Cut)
        && run.scoring_plays.contains(&boundary.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryConfig, BoundaryDetector};
    use crate::test_support::ScriptedGame;

    fn evaluate(game: &ScriptedGame) -> (Vec<DetectedRun>, RunEvaluation) {
        let stream = game.build_stream();
        let detection = BoundaryDetector::new(&stream, &BoundaryConfig::default()).detect();
        let config = RunConfig::default();
        let runs = detect_runs(&stream, &config);
        let evaluation = evaluate_run_boundaries(&stream, &runs, &detection.boundaries, &config);
        (runs, evaluation)
    }

    #[test]
    fn test_detects_unanswered_runs() {
        let stream = ScriptedGame::new()
            .home(2)
            .home(3)
            .home(2)
            .away(2)
            .away(2)
            .home(1)
            .build_stream();

        let runs = detect_runs(&stream, &RunConfig::default());

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].team, TeamSide::Home);
        assert_eq!(runs[0].points, 7);
        assert_eq!(runs[0].scoring_plays, vec![0, 1, 2]);
    }

    #[test]
    fn test_both_teams_scoring_closes_run() {
        let stream = ScriptedGame::new()
            .home(3)
            .home(3)
            .both(1, 1)
            .home(3)
            .build_stream();

        let runs = detect_runs(&stream, &RunConfig::default());

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].end_play, 1);
    }

    #[test]
    fn test_regulation_run_is_promoted() {
        let game = ScriptedGame::new()
            .at(2, 600)
            .home(2)
            .home(2)
            .home(2)
            .home(2)
            .home(2);
        let (runs, evaluation) = evaluate(&game);

        assert_eq!(runs.len(), 1);
        assert_eq!(evaluation.decisions[0].reason, "promoted");
        // The tier-up boundaries on the run's own baskets fold into the shift.
        let summary: Vec<_> = evaluation
            .boundaries
            .iter()
            .map(|b| (b.index, b.moment_type))
            .collect();
        assert_eq!(summary, vec![(0, MomentType::MomentumShift)]);
        assert_eq!(evaluation.boundaries[0].run.as_ref().map(|r| r.points), Some(10));
    }

    #[test]
    fn test_late_blowout_run_is_garbage_time() {
        let game = ScriptedGame::new()
            .at(4, 200)
            .home(25)
            .away(2)
            .away(2)
            .away(2)
            .away(2)
            .away(2);
        let (_, evaluation) = evaluate(&game);

        let away_run = evaluation
            .decisions
            .iter()
            .find(|d| d.team == TeamSide::Away)
            .unwrap();
        assert!(!away_run.promoted);
        assert_eq!(away_run.reason, "garbage_time");
        assert!(evaluation
            .boundaries
            .iter()
            .all(|b| b.moment_type != MomentType::MomentumShift));
    }

    #[test]
    fn test_run_through_flip_overlaps() {
        let game = ScriptedGame::new()
            .at(2, 600)
            .away(3)
            .home(2)
            .home(2)
            .home(2)
            .home(2);
        let (_, evaluation) = evaluate(&game);

        let home_run = evaluation
            .decisions
            .iter()
            .find(|d| d.team == TeamSide::Home)
            .unwrap();
        assert!(home_run.leader_changed);
        assert_eq!(home_run.reason, "overlaps_boundary");
    }

    #[test]
    fn test_short_run_is_not_promoted() {
        let game = ScriptedGame::new().at(2, 600).home(3).home(3).away(1);
        let (_, evaluation) = evaluate(&game);

        assert_eq!(evaluation.decisions[0].reason, "below_promotion_points");
    }

    #[test]
    fn test_trailing_run_in_decided_closing_is_false_drama() {
        // 20-0 at 5:20 of the fourth, then an 8-0 answer at 5:00.
        let game = ScriptedGame::new().at(4, 320).home(20).away(8);
        let (_, evaluation) = evaluate(&game);

        let away_run = evaluation
            .decisions
            .iter()
            .find(|d| d.team == TeamSide::Away)
            .unwrap();
        assert!(!away_run.promoted);
        assert_eq!(away_run.reason, "false_drama");
        assert!(evaluation
            .false_drama_decisions
            .iter()
            .any(|d| d.suppressed && d.candidate == DramaCandidate::RunCut && d.index == 1));
    }
}
