//! Dynamic per-period quotas.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::merge::{absorb_into_neighbor, MergeReason, MergeRecord};
use crate::moment::Moment;
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub baseline: i32,

    /// Extra moments for the final regulation period and overtime of a close game.
    pub close_game_bonus: i32,
    pub close_game_margin: u32,

    /// Fewer moments everywhere in a blowout.
    pub blowout_reduction: i32,
    pub blowout_margin: u32,

    /// Moments at or above this importance each earn one extra slot.
    pub importance_threshold: f64,
    pub importance_bonus_cap: i32,

    pub min_quota: i32,
    pub max_quota: i32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            baseline: 6,
            close_game_bonus: 2,
            close_game_margin: 5,
            blowout_reduction: 2,
            blowout_margin: 20,
            importance_threshold: 6.0,
            importance_bonus_cap: 2,
            min_quota: 2,
            max_quota: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub period: u8,
    pub quota: usize,
    pub close_bonus: i32,
    pub blowout_reduction: i32,
    pub importance_bonus: i32,
    pub before: usize,
    pub after: usize,
}

/// Quota for one period given the moments currently in it.
pub fn period_quota(
    period: u8,
    moments: &[Moment],
    stream: &PlayStream,
    config: &QuotaConfig,
) -> QuotaRecord {
    let final_margin = stream.final_state().margin;
    let late = period >= stream.sport().regulation_periods;

    let close_bonus = if late && final_margin <= config.close_game_margin {
        config.close_game_bonus
    } else {
        0
    };
    let blowout_reduction = if final_margin >= config.blowout_margin {
        config.blowout_reduction
    } else {
        0
    };
    let in_period = moments.iter().filter(|m| m.period == period);
    let important = in_period
        .clone()
        .filter(|m| m.importance >= config.importance_threshold)
        .count();
    let importance_bonus = i32::try_from(important)
        .unwrap_or(i32::MAX)
        .min(config.importance_bonus_cap);

    let quota = (config.baseline + close_bonus - blowout_reduction + importance_bonus)
        .clamp(config.min_quota, config.max_quota);
    let before = in_period.count();

    QuotaRecord {
        period,
        quota: usize::try_from(quota).unwrap_or(0),
        close_bonus,
        blowout_reduction,
        importance_bonus,
        before,
        after: before,
    }
}

/// Compress every period down to its quota.
///
/// The adjacent non-protected pair with the lowest combined importance merges
/// first; the more important side survives.
pub fn apply_quotas(
    mut moments: Vec<Moment>,
    stream: &PlayStream,
    config: &QuotaConfig,
) -> (Vec<Moment>, Vec<QuotaRecord>, Vec<MergeRecord>) {
    let mut records = Vec::new();
    let mut merges = Vec::new();

    let mut periods: Vec<u8> = moments.iter().map(|m| m.period).collect();
    periods.dedup();

    for period in periods {
        let mut record = period_quota(period, &moments, stream, config);

        while moments.iter().filter(|m| m.period == period).count() > record.quota {
            let Some(first) = cheapest_pair(&moments, period) else {
                debug!(period, quota = record.quota, "quota unreachable");
                break;
            };
            let (absorbed, into) = if keeps_first(&moments[first], &moments[first + 1]) {
                (first + 1, first)
            } else {
                (first, first + 1)
            };
            let detail = format!("period {period} quota {}", record.quota);
            let reason = MergeReason::Quota;
            if let Some(merge) =
                absorb_into_neighbor(&mut moments, absorbed, into, reason, detail, stream)
            {
                merges.push(merge);
            }
        }

        record.after = moments.iter().filter(|m| m.period == period).count();
        debug!(
            period,
            quota = record.quota,
            before = record.before,
            after = record.after,
            "quota applied"
        );
        records.push(record);
    }

    (moments, records, merges)
}

/// Index of the first moment of the cheapest mergeable pair in a period.
fn cheapest_pair(moments: &[Moment], period: u8) -> Option<usize> {
    (0..moments.len().saturating_sub(1))
        .filter(|&i| {
            let (a, b) = (&moments[i], &moments[i + 1]);
            a.period == period
                && b.period == period
                && !a.moment_type.is_protected()
                && !b.moment_type.is_protected()
        })
        .min_by(|&x, &y| {
            let cost = |i: usize| moments[i].importance + moments[i + 1].importance;
            cost(x).partial_cmp(&cost(y)).unwrap_or(Ordering::Equal)
        })
}

fn keeps_first(first: &Moment, second: &Moment) -> bool {
    match first.importance.partial_cmp(&second.importance) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Less) => false,
        _ => first.moment_type.merge_priority() >= second.moment_type.merge_priority(),
    }
}
