//! Importance scoring - an explainable weighted sum per moment.
//!
//! The score is built from six factors:
//! 1. **time**: how late in the game the moment ends (overtime adds a bonus)
//! 2. **margin**: how close the game is afterwards on the Lead Ladder
//! 3. **lead_change**: FLIP, TIE, CLOSING_CONTROL, control shifts and chapters
//! 4. **run**: magnitude of the largest run inside the moment (capped)
//! 5. **high_impact**: ejections, injuries and flagrants
//! 6. **volatility**: lead changes and ties inside the span (capped)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::DetectedRun;
use crate::kind::MomentType;
use crate::moment::Moment;
use crate::stream::PlayStream;

/// Factor weights for importance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceWeights {
    /// Multiplied by end progress in `[0, 1]`.
    pub time: f64,
    pub overtime_bonus: f64,

    /// Multiplied by closeness (1.0 at tier 0, 0.0 at the top tier).
    pub margin: f64,

    pub flip: f64,
    pub tie: f64,
    pub closing_control: f64,
    pub control_shift: f64,
    pub chapter: f64,

    pub run_per_point: f64,
    pub run_cap: f64,

    pub high_impact: f64,

    pub volatility_per_change: f64,
    pub volatility_cap: f64,
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            time: 2.0,
            overtime_bonus: 1.0,
            margin: 3.0,
            flip: 2.5,
            tie: 1.5,
            closing_control: 2.0,
            control_shift: 1.0,
            chapter: 1.0,
            run_per_point: 0.25,
            run_cap: 3.0,
            high_impact: 3.0,
            volatility_per_change: 0.5,
            volatility_cap: 2.0,
        }
    }
}

/// A score with its factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceScore {
    pub total: f64,
    pub factors: BTreeMap<String, f64>,
}

/// Round to four decimals so scores serialize identically across runs.
pub fn round_score(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Scores moments; never reorders or drops them.
pub struct ImportanceScorer {
    weights: ImportanceWeights,
}

impl ImportanceScorer {
    pub fn new(weights: ImportanceWeights) -> Self {
        Self { weights }
    }

    pub fn with_defaults() -> Self {
        Self::new(ImportanceWeights::default())
    }

    pub fn weights(&self) -> &ImportanceWeights {
        &self.weights
    }

    /// Score one moment.
    pub fn score(
        &self,
        moment: &Moment,
        stream: &PlayStream,
        runs: &[DetectedRun],
    ) -> ImportanceScore {
        let w = &self.weights;
        let positions = stream.positions(moment.start_play, moment.end_play);

        let mut time = w.time * moment.end_progress;
        if moment.is_overtime(stream) {
            time += w.overtime_bonus;
        }

        let max_tier = f64::from(stream.sport().thresholds.max_tier().max(1));
        let tier = f64::from(moment.tier_after).min(max_tier);
        let margin = w.margin * (1.0 - tier / max_tier);

        let mut lead_change = match moment.moment_type {
            MomentType::Flip => w.flip,
            MomentType::Tie => w.tie,
            MomentType::ClosingControl => w.closing_control,
            MomentType::LeadBuild
            | MomentType::Cut
            | MomentType::HighImpact
            | MomentType::Neutral
            | MomentType::MomentumShift
            | MomentType::QuarterRecap
            | MomentType::HalftimeRecap
            | MomentType::RegulationRecap
            | MomentType::FinalRecap => 0.0,
        };
        if moment.reason.control_shift && moment.moment_type != MomentType::Flip {
            lead_change += w.control_shift;
        }
        if moment.is_chapter() {
            lead_change += w.chapter;
        }

        let contained_run = runs
            .iter()
            .filter(|run| moment.contains(run.start_play) && moment.contains(run.end_play))
            .map(|run| run.points)
            .max()
            .unwrap_or(0);
        let run_points = moment.run_points().max(contained_run);
        let run = (f64::from(run_points) * w.run_per_point).min(w.run_cap);

        let high_impact = if stream.has_high_impact(positions.clone()) {
            w.high_impact
        } else {
            0.0
        };

        let (changes, ties) = stream.lead_changes(positions);
        let volatility =
            (f64::from(changes + ties) * w.volatility_per_change).min(w.volatility_cap);

        let factors: BTreeMap<String, f64> = [
            ("time", time),
            ("margin", margin),
            ("lead_change", lead_change),
            ("run", run),
            ("high_impact", high_impact),
            ("volatility", volatility),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), round_score(value)))
        .collect();

        let total = round_score(time + margin + lead_change + run + high_impact + volatility);
        ImportanceScore { total, factors }
    }

    /// Score every moment in place order.
    ///
    /// Chapters keep the importance inherited from their members when it is
    /// higher than their own score.
    pub fn score_all(
        &self,
        mut moments: Vec<Moment>,
        stream: &PlayStream,
        runs: &[DetectedRun],
    ) -> Vec<Moment> {
        for moment in &mut moments {
            let score = self.score(moment, stream, runs);
            let total = if moment.is_chapter() {
                score.total.max(moment.importance)
            } else {
                score.total
            };
            debug!(moment = %moment.id, importance = total, "moment scored");
            moment.importance = total;
            moment.importance_factors = score.factors;
        }
        moments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moment::{ChapterInfo, Reason};
    use crate::test_support::ScriptedGame;

    #[test]
    fn test_late_flip_outscores_early_build() {
        let stream = ScriptedGame::new()
            .home(3)
            .idle(2)
            .at(4, 60)
            .away(4)
            .build_stream();
        let scorer = ImportanceScorer::with_defaults();
        let early =
            Moment::from_range(&stream, 0, 2, MomentType::LeadBuild, Reason::new("tie_broken"));
        let late = Moment::from_range(&stream, 3, 3, MomentType::Flip, Reason::new("flip"));

        let early_score = scorer.score(&early, &stream, &[]);
        let late_score = scorer.score(&late, &stream, &[]);

        assert!(late_score.total > early_score.total);
        assert_eq!(late_score.factors["lead_change"], 2.5);
        assert_eq!(late_score.factors["volatility"], 0.5);
    }

    #[test]
    fn test_run_factor_is_capped() {
        let mut game = ScriptedGame::new();
        for _ in 0..10 {
            game = game.home(2);
        }
        let stream = game.build_stream();
        let runs = crate::boundary::detect_runs(&stream, &crate::boundary::RunConfig::default());
        let moment = Moment::from_range(&stream, 0, 9, MomentType::LeadBuild, Reason::new("run"));

        let score = ImportanceScorer::with_defaults().score(&moment, &stream, &runs);

        assert_eq!(score.factors["run"], 3.0);
    }

    #[test]
    fn test_scores_are_rounded() {
        assert_eq!(round_score(1.234_567), 1.2346);
        assert_eq!(round_score(2.0), 2.0);
    }

    #[test]
    fn test_chapter_keeps_inherited_importance() {
        let stream = ScriptedGame::new().home(2).away(2).home(2).build_stream();
        let mut chapter =
            Moment::from_range(&stream, 0, 2, MomentType::Neutral, Reason::new("chapter"));
        chapter.chapter = Some(ChapterInfo {
            members: 2,
            lead_changes: 0,
            ties: 1,
        });
        chapter.importance = 42.0;

        let scored = ImportanceScorer::with_defaults().score_all(vec![chapter], &stream, &[]);

        assert_eq!(scored[0].importance, 42.0);
        assert!(scored[0].importance_factors.contains_key("time"));
    }
}
