//! Pacing constraints applied to a ranked selection through swaps.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sport_rules::GamePhase;
use tracing::debug;

use crate::moment::{Moment, MomentId};
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Regulation progress before which a moment counts as early game.
    pub early_progress: f64,
    pub early_cap_share: f64,
    /// Early moments at or above this importance ignore the cap.
    pub early_override_importance: f64,

    pub closing_share: f64,
    pub close_game_closing_share: f64,
    pub close_game_margin: u32,

    pub require_act_coverage: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            early_progress: 0.5,
            early_cap_share: 0.35,
            early_override_importance: 7.5,
            closing_share: 0.20,
            close_game_closing_share: 0.35,
            close_game_margin: 5,
            require_act_coverage: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingRule {
    EarlyCap,
    ClosingReserve,
    OpeningCoverage,
    MiddleCoverage,
    ClosingCoverage,
}

impl PacingRule {
    fn coverage(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Opening => PacingRule::OpeningCoverage,
            GamePhase::Middle => PacingRule::MiddleCoverage,
            GamePhase::Closing => PacingRule::ClosingCoverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingDecision {
    pub rule: PacingRule,
    pub required: usize,
    pub observed_before: usize,
    pub observed_after: usize,
    pub satisfied: bool,
}

/// A selection change made for pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub cause: PacingRule,
    pub added: Option<MomentId>,
    pub removed: Option<MomentId>,
    pub added_importance: Option<f64>,
    pub removed_importance: Option<f64>,
}

/// The act a moment belongs to, by where it starts.
pub fn act_of(moment: &Moment, stream: &PlayStream) -> GamePhase {
    GamePhase::from_progress(moment.start_progress, stream.sport().is_overtime(moment.period))
}

struct Pacer<'a> {
    moments: &'a [Moment],
    selected: &'a mut [bool],
    swaps: Vec<SwapRecord>,
}

impl Pacer<'_> {
    fn count(&self, filter: impl Fn(&Moment) -> bool) -> usize {
        self.moments
            .iter()
            .zip(self.selected.iter())
            .filter(|(m, s)| **s && filter(*m))
            .count()
    }

    /// Unselected (or selected) moment matching `filter` with the highest
    /// (or lowest) importance.
    fn pick(
        &self,
        want_selected: bool,
        highest: bool,
        filter: impl Fn(&Moment) -> bool,
    ) -> Option<usize> {
        let candidates = (0..self.moments.len())
            .filter(|&i| self.selected[i] == want_selected && filter(&self.moments[i]));
        let by_importance = |a: &usize, b: &usize| {
            let (x, y) = (&self.moments[*a], &self.moments[*b]);
            x.importance
                .partial_cmp(&y.importance)
                .unwrap_or(Ordering::Equal)
                .then(x.start_play.cmp(&y.start_play))
        };
        if highest {
            candidates.max_by(by_importance)
        } else {
            candidates.min_by(by_importance)
        }
    }

    fn swap(&mut self, cause: PacingRule, add: Option<usize>, remove: Option<usize>) {
        if let Some(i) = add {
            self.selected[i] = true;
        }
        if let Some(i) = remove {
            self.selected[i] = false;
        }
        let record = SwapRecord {
            cause,
            added: add.map(|i| self.moments[i].id),
            removed: remove.map(|i| self.moments[i].id),
            added_importance: add.map(|i| self.moments[i].importance),
            removed_importance: remove.map(|i| self.moments[i].importance),
        };
        debug!(
            cause = ?cause,
            added = ?record.added,
            removed = ?record.removed,
            "pacing swap"
        );
        self.swaps.push(record);
    }
}

/// Enforce early cap, closing reserve and act coverage on `selected`.
pub fn apply_pacing(
    moments: &[Moment],
    selected: &mut [bool],
    target: usize,
    stream: &PlayStream,
    config: &PacingConfig,
) -> (Vec<PacingDecision>, Vec<SwapRecord>) {
    let mut decisions = Vec::new();
    let mut pacer = Pacer {
        moments,
        selected,
        swaps: Vec::new(),
    };

    let is_early = |m: &Moment| {
        m.start_progress < config.early_progress && !stream.sport().is_overtime(m.period)
    };
    let is_closing = |m: &Moment| act_of(m, stream) == GamePhase::Closing;

    // Step 1: Early-game cap
    let cap = (target as f64 * config.early_cap_share).floor() as usize;
    let before = pacer.count(is_early);
    while pacer.count(is_early) > cap {
        let Some(remove) = pacer.pick(true, false, |m| {
            is_early(m) && m.importance < config.early_override_importance
        }) else {
            break;
        };
        let add = pacer.pick(false, true, |m| !is_early(m));
        pacer.swap(PacingRule::EarlyCap, add, Some(remove));
    }
    let after = pacer.count(is_early);
    decisions.push(PacingDecision {
        rule: PacingRule::EarlyCap,
        required: cap,
        observed_before: before,
        observed_after: after,
        satisfied: after <= cap,
    });

    // Step 2: Closing reservation
    let share = if stream.final_state().margin <= config.close_game_margin {
        config.close_game_closing_share
    } else {
        config.closing_share
    };
    let available = moments.iter().filter(|m| is_closing(m)).count();
    let required = ((target as f64 * share).ceil() as usize).min(available);
    let before = pacer.count(is_closing);
    while pacer.count(is_closing) < required {
        let Some(add) = pacer.pick(false, true, is_closing) else {
            break;
        };
        let Some(remove) = pacer.pick(true, false, |m| !is_closing(m)) else {
            break;
        };
        pacer.swap(PacingRule::ClosingReserve, Some(add), Some(remove));
    }
    let after = pacer.count(is_closing);
    decisions.push(PacingDecision {
        rule: PacingRule::ClosingReserve,
        required,
        observed_before: before,
        observed_after: after,
        satisfied: after >= required,
    });

    // Step 3: Act coverage
    if config.require_act_coverage {
        for phase in [GamePhase::Opening, GamePhase::Middle, GamePhase::Closing] {
            let in_act = |m: &Moment| act_of(m, stream) == phase;
            if !moments.iter().any(in_act) {
                continue;
            }
            let rule = PacingRule::coverage(phase);
            let before = pacer.count(in_act);
            if before == 0 {
                if let Some(add) = pacer.pick(false, true, in_act) {
                    if pacer.count(|_| true) < target {
                        pacer.swap(rule, Some(add), None);
                    } else {
                        // Only take from an act that keeps at least one moment.
                        let remove = pacer.pick(true, false, |m| {
                            let act = act_of(m, stream);
                            act != phase && pacer.count(|o| act_of(o, stream) == act) > 1
                        });
                        if remove.is_some() {
                            pacer.swap(rule, Some(add), remove);
                        }
                    }
                }
            }
            let after = pacer.count(in_act);
            decisions.push(PacingDecision {
                rule,
                required: 1,
                observed_before: before,
                observed_after: after,
                satisfied: after >= 1,
            });
        }
    }

    (decisions, pacer.swaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::MomentType;
    use crate::moment::Reason;
    use crate::test_support::ScriptedGame;
    use sport_rules::{Sport, SportConfig};

    /// Eight 18-play moments covering a tied regulation game.
    fn spread() -> (PlayStream, Vec<Moment>) {
        let mut game = ScriptedGame::new();
        for i in 0..144 {
            game = if i % 2 == 0 { game.home(2) } else { game.away(2) };
        }
        let stream = game.build_stream();
        let moments = (0..8)
            .map(|k| {
                let start = k * 18;
                let reason = Reason::new("test");
                Moment::from_range(&stream, start, start + 17, MomentType::Neutral, reason)
            })
            .collect();
        (stream, moments)
    }

    #[test]
    fn test_early_cap_swaps_in_later_moments() {
        let (stream, mut moments) = spread();
        for (k, moment) in moments.iter_mut().enumerate() {
            moment.importance = if k < 4 { 5.0 } else { 1.0 };
        }
        let mut selected = vec![true, true, true, true, false, false, false, false];
        let config = PacingConfig {
            require_act_coverage: false,
            ..PacingConfig::default()
        };

        let (decisions, swaps) = apply_pacing(&moments, &mut selected, 4, &stream, &config);

        // Cap is floor(4 * 0.35) = 1 early moment.
        assert_eq!(selected, vec![false, false, false, true, false, true, true, true]);
        assert!(decisions[0].satisfied);
        assert_eq!(swaps.len(), 3);
        assert!(swaps.iter().all(|s| s.cause == PacingRule::EarlyCap));
    }

    #[test]
    fn test_override_importance_exempts_early_moments() {
        let (stream, mut moments) = spread();
        for moment in moments.iter_mut().take(4) {
            moment.importance = 9.0;
        }
        let mut selected = vec![true, true, true, true, false, false, false, false];

        let (decisions, _) =
            apply_pacing(&moments, &mut selected, 4, &stream, &PacingConfig::default());

        assert!(!decisions[0].satisfied);
        assert_eq!(decisions[0].observed_after, 4);
    }

    #[test]
    fn test_closing_reserve_pulls_in_late_moment() {
        let (stream, mut moments) = spread();
        for (k, moment) in moments.iter_mut().enumerate() {
            moment.importance = k as f64;
        }
        // Select two third-period moments only.
        let mut selected = vec![false, false, false, false, true, true, false, false];
        let config = PacingConfig {
            require_act_coverage: false,
            ..PacingConfig::default()
        };

        let (decisions, swaps) = apply_pacing(&moments, &mut selected, 2, &stream, &config);

        // Tied final score: ceil(2 * 0.35) = 1 closing moment.
        assert_eq!(decisions[1].required, 1);
        assert!(decisions[1].satisfied);
        assert!(selected[7]);
        assert!(!selected[4]);
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].cause, PacingRule::ClosingReserve);
    }

    #[test]
    fn test_early_game_is_the_first_half_of_a_two_half_sport() {
        let mut game = ScriptedGame::new().at(1, 1200);
        for i in 0..120 {
            if i == 60 {
                game = game.at(2, 1200);
            }
            game = if i % 2 == 0 { game.home(2) } else { game.away(2) };
        }
        let stream = game.build_stream_with(&SportConfig::preset(Sport::Ncaab));
        let moments: Vec<Moment> = (0..8)
            .map(|k| {
                let start = k * 15;
                let reason = Reason::new("test");
                let mut moment =
                    Moment::from_range(&stream, start, start + 14, MomentType::Neutral, reason);
                moment.importance = f64::from(k + 1);
                moment
            })
            .collect();
        let mut selected = vec![true; 8];

        let (decisions, swaps) =
            apply_pacing(&moments, &mut selected, 8, &stream, &PacingConfig::default());

        // Only the four first-half moments are early; the cap of two drops
        // the weakest, and opening coverage adds one back below target.
        assert_eq!(decisions[0].rule, PacingRule::EarlyCap);
        assert_eq!((decisions[0].observed_before, decisions[0].observed_after), (4, 2));
        assert_eq!(decisions[2].rule, PacingRule::OpeningCoverage);
        assert!(decisions[2].satisfied);
        assert_eq!(selected, vec![false, true, true, true, true, true, true, true]);
        assert_eq!(swaps.len(), 3);
        assert_eq!(swaps[2].cause, PacingRule::OpeningCoverage);
        assert_eq!(swaps[2].removed, None);
    }
}
