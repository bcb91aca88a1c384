//! Dynamic moment budget.

use serde::{Deserialize, Serialize};
use sport_rules::{Leader, Sport};

use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub base: u32,

    pub close_margin: u32,
    pub close_bonus: f64,
    pub blowout_margin: u32,
    pub blowout_penalty: f64,

    /// Plays at or below this tier count as close.
    pub closeness_max_tier: u8,
    pub closeness_bonus: f64,

    pub per_lead_change: f64,
    pub lead_change_cap: f64,

    pub per_overtime: f64,
    pub overtime_cap: f64,

    pub comeback_margin: u32,
    pub comeback_bonus: f64,
    pub big_comeback_margin: u32,
    pub big_comeback_bonus: f64,

    pub min_moments: u32,
    pub max_moments: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            base: 22,
            close_margin: 5,
            close_bonus: 4.0,
            blowout_margin: 20,
            blowout_penalty: 6.0,
            closeness_max_tier: 1,
            closeness_bonus: 4.0,
            per_lead_change: 0.5,
            lead_change_cap: 4.0,
            per_overtime: 2.0,
            overtime_cap: 4.0,
            comeback_margin: 10,
            comeback_bonus: 2.0,
            big_comeback_margin: 15,
            big_comeback_bonus: 3.0,
            min_moments: 12,
            max_moments: 36,
        }
    }
}

impl BudgetConfig {
    /// Defaults with the sport's base budget.
    pub fn for_sport(sport: Sport) -> Self {
        let base = match sport {
            Sport::Nba => 22,
            Sport::Ncaab => 20,
            Sport::Nfl => 18,
            Sport::Nhl => 16,
        };
        Self {
            base,
            ..Self::default()
        }
    }
}

/// Every adjustment that went into a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetComputation {
    pub base: u32,
    pub margin: f64,
    pub closeness: f64,
    pub lead_changes: f64,
    pub overtime: f64,
    pub comeback: f64,
    pub final_margin: u32,
    /// Largest deficit the winner overcame.
    pub deficit_overcome: u32,
    pub target: usize,
}

fn margin_adjustment(margin: u32, config: &BudgetConfig) -> f64 {
    if margin <= config.close_margin {
        return config.close_bonus;
    }
    if margin >= config.blowout_margin {
        return -config.blowout_penalty;
    }
    // Linear between the close bonus and the blowout penalty.
    let span = f64::from(config.blowout_margin - config.close_margin);
    let t = f64::from(margin - config.close_margin) / span;
    config.close_bonus - t * (config.close_bonus + config.blowout_penalty)
}

fn deficit_overcome(stream: &PlayStream) -> u32 {
    let Some(winner) = stream.final_state().leader.side() else {
        return 0;
    };
    (0..stream.len())
        .map(|pos| stream.state(pos))
        .filter(|state| state.leader != Leader::Tied && state.leader.side() != Some(winner))
        .map(|state| state.margin)
        .max()
        .unwrap_or(0)
}

/// Compute the moment target for one game.
pub fn compute_budget(stream: &PlayStream, config: &BudgetConfig) -> BudgetComputation {
    let final_margin = stream.final_state().margin;
    let margin = margin_adjustment(final_margin, config);

    let close_plays = (0..stream.len())
        .filter(|&pos| stream.state(pos).tier <= config.closeness_max_tier)
        .count();
    let closeness = config.closeness_bonus * close_plays as f64 / stream.len().max(1) as f64;

    let (changes, _) = stream.lead_changes(0..stream.len());
    let lead_changes = (f64::from(changes) * config.per_lead_change).min(config.lead_change_cap);

    let last_period = stream.plays().last().map_or(0, |play| play.period);
    let overtime_periods = last_period.saturating_sub(stream.sport().regulation_periods);
    let overtime = (f64::from(overtime_periods) * config.per_overtime).min(config.overtime_cap);

    let deficit = deficit_overcome(stream);
    let comeback = if deficit >= config.big_comeback_margin {
        config.big_comeback_bonus
    } else if deficit >= config.comeback_margin {
        config.comeback_bonus
    } else {
        0.0
    };

    let raw = f64::from(config.base) + margin + closeness + lead_changes + overtime + comeback;
    let clamped = raw
        .round()
        .clamp(f64::from(config.min_moments), f64::from(config.max_moments));

    BudgetComputation {
        base: config.base,
        margin,
        closeness,
        lead_changes,
        overtime,
        comeback,
        final_margin,
        deficit_overcome: deficit,
        target: clamped as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGame;

    #[test]
    fn test_margin_adjustment_is_linear() {
        let config = BudgetConfig::default();
        assert_eq!(margin_adjustment(3, &config), 4.0);
        assert_eq!(margin_adjustment(25, &config), -6.0);
        assert!((margin_adjustment(11, &config) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_blowout_gets_a_small_budget() {
        let stream = ScriptedGame::new().home(10).home(10).home(10).build_stream();

        let budget = compute_budget(&stream, &BudgetConfig::default());

        // Every play sits above tier 1, so only the blowout penalty applies.
        assert_eq!(budget.closeness, 0.0);
        assert_eq!(budget.target, 16);
        assert_eq!(budget.comeback, 0.0);
    }

    #[test]
    fn test_comeback_and_lead_changes_raise_budget() {
        let stream = ScriptedGame::new()
            .away(8)
            .away(8)
            .home(10)
            .home(8)
            .build_stream();

        let budget = compute_budget(&stream, &BudgetConfig::default());

        assert_eq!(budget.deficit_overcome, 16);
        assert_eq!(budget.comeback, 3.0);
        assert_eq!(budget.lead_changes, 0.5);
        assert_eq!(budget.margin, 4.0);
    }

    #[test]
    fn test_sport_bases() {
        assert_eq!(BudgetConfig::for_sport(Sport::Nfl).base, 18);
        assert_eq!(BudgetConfig::for_sport(Sport::Nhl).base, 16);
    }
}
