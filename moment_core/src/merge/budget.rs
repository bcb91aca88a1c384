//! Budget enforcement - invalid moments, per-period limits and a global cap.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{absorb_into_neighbor, can_merge, is_valid_moment, MergeReason, MergeRecord};
use crate::moment::Moment;
use crate::stream::PlayStream;

/// Limits applied right after moments are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum moments starting in one period.
    pub max_per_period: usize,

    /// Maximum moments in the whole game.
    pub max_total: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_per_period: 7,
            max_total: 40,
        }
    }
}

/// Moments after enforcement, with every merge performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetOutcome {
    pub moments: Vec<Moment>,
    pub merges: Vec<MergeRecord>,
}

/// Merge away invalid moments, then enforce the period limit and global cap.
pub fn enforce_budget(
    mut moments: Vec<Moment>,
    stream: &PlayStream,
    config: &MergeConfig,
) -> BudgetOutcome {
    let mut merges = Vec::new();

    // Step 1: invalid moments always merge, previous neighbour preferred
    while moments.len() > 1 {
        let Some(idx) = moments.iter().position(|m| !is_valid_moment(m)) else {
            break;
        };
        let into = if idx > 0 { idx - 1 } else { 1 };
        let detail = format!("invalid {} moment", moments[idx].moment_type);
        let reason = MergeReason::InvalidMoment;
        if let Some(record) =
            absorb_into_neighbor(&mut moments, idx, into, reason, detail, stream)
        {
            merges.push(record);
        }
    }

    // Step 2: per-period limit
    let mut periods: Vec<u8> = moments.iter().map(|m| m.period).collect();
    periods.dedup();
    for period in periods {
        while moments.iter().filter(|m| m.period == period).count() > config.max_per_period {
            match merge_lowest_priority(
                &mut moments,
                |m| m.period == period,
                MergeReason::PeriodLimit,
                stream,
            ) {
                Some(record) => merges.push(record),
                None => {
                    debug!(period, "period over limit with nothing mergeable");
                    break;
                }
            }
        }
    }

    // Step 3: global cap
    while moments.len() > config.max_total {
        match merge_lowest_priority(&mut moments, |_| true, MergeReason::GlobalCap, stream) {
            Some(record) => merges.push(record),
            None => {
                debug!(moments = moments.len(), "global cap exceeded with nothing mergeable");
                break;
            }
        }
    }

    info!(
        moments = moments.len(),
        merges = merges.len(),
        "budget enforcement complete"
    );
    BudgetOutcome { moments, merges }
}

/// Merge the lowest-priority moment in scope into a compatible neighbour from
/// the same period.
///
/// Candidates are ordered by merge priority, then importance, then position.
pub fn merge_lowest_priority(
    moments: &mut Vec<Moment>,
    in_scope: impl Fn(&Moment) -> bool,
    reason: MergeReason,
    stream: &PlayStream,
) -> Option<MergeRecord> {
    let mut order: Vec<usize> = (0..moments.len())
        .filter(|&i| in_scope(&moments[i]) && !moments[i].moment_type.is_protected())
        .collect();
    order.sort_by(|&a, &b| {
        let (ma, mb) = (&moments[a], &moments[b]);
        ma.moment_type
            .merge_priority()
            .cmp(&mb.moment_type.merge_priority())
            .then_with(|| {
                ma.importance
                    .partial_cmp(&mb.importance)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.cmp(&b))
    });

    for idx in order {
        let neighbours = [idx.checked_sub(1), Some(idx + 1)];
        for into in neighbours.into_iter().flatten() {
            let Some(neighbour) = moments.get(into) else {
                continue;
            };
            if neighbour.period != moments[idx].period || !can_merge(&moments[idx], neighbour) {
                continue;
            }
            let detail = format!(
                "{} (priority {}) into {}",
                moments[idx].moment_type,
                moments[idx].moment_type.merge_priority(),
                neighbour.moment_type
            );
            return absorb_into_neighbor(moments, idx, into, reason, detail, stream);
        }
    }
    None
}
