//! Narrative selection - fitting the constructed moments into a dynamic budget.
//!
//! Selection works in four steps:
//! 1. **Budget**: derive a target from margin, closeness, lead changes,
//!    overtime and comebacks
//! 2. **Rank**: order by importance and keep the top `target`
//! 3. **Pace**: swap moments to respect the early cap, the closing
//!    reservation and act coverage
//! 4. **Merge**: every rejected moment is absorbed by a kept neighbour

mod budget;
mod pacing;

pub use budget::*;
pub use pacing::*;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sport_rules::PlayIndex;
use tracing::{debug, info};

use crate::merge::{absorb_into_neighbor, MergeReason, MergeRecord};
use crate::moment::{Moment, MomentId};
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRecord {
    pub id: MomentId,
    pub rank: usize,
    pub importance: f64,
    pub start_play: PlayIndex,
    /// Final selection after pacing.
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub budget: BudgetComputation,
    pub ranks: Vec<RankRecord>,
    pub pacing: Vec<PacingDecision>,
    pub swaps: Vec<SwapRecord>,
    pub merges: Vec<MergeRecord>,
    pub selected: usize,
    pub rejected: usize,
}

/// Ranking order: importance descending, later moments first on ties.
pub fn rank_order(moments: &[Moment]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..moments.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (&moments[a], &moments[b]);
        y.importance
            .partial_cmp(&x.importance)
            .unwrap_or(Ordering::Equal)
            .then(y.start_play.cmp(&x.start_play))
    });
    order
}

pub struct NarrativeSelector {
    budget: BudgetConfig,
    pacing: PacingConfig,
}

impl NarrativeSelector {
    pub fn new(budget: BudgetConfig, pacing: PacingConfig) -> Self {
        Self { budget, pacing }
    }

    pub fn with_defaults() -> Self {
        Self::new(BudgetConfig::default(), PacingConfig::default())
    }

    /// Select at most `target` moments and merge the rest away.
    pub fn select(
        &self,
        moments: Vec<Moment>,
        stream: &PlayStream,
    ) -> (Vec<Moment>, SelectionResult) {
        // Step 1: Budget
        let budget = compute_budget(stream, &self.budget);
        let target = budget.target;

        // Step 2: Rank
        let order = rank_order(&moments);
        let mut selected = vec![false; moments.len()];
        for &i in order.iter().take(target) {
            selected[i] = true;
        }

        // Step 3: Pacing
        let (pacing, swaps) = apply_pacing(&moments, &mut selected, target, stream, &self.pacing);

        let ranks: Vec<RankRecord> = order
            .iter()
            .enumerate()
            .map(|(rank, &i)| RankRecord {
                id: moments[i].id,
                rank: rank + 1,
                importance: moments[i].importance,
                start_play: moments[i].start_play,
                selected: selected[i],
            })
            .collect();
        let kept = selected.iter().filter(|s| **s).count();
        let rejected = moments.len() - kept;

        // Step 4: Merge rejected moments
        let (moments, merges) = merge_rejected(moments, selected, stream);

        info!(
            target,
            candidates = ranks.len(),
            selected = moments.len(),
            rejected,
            swaps = swaps.len(),
            "selection complete"
        );
        let result = SelectionResult {
            budget,
            ranks,
            pacing,
            swaps,
            merges,
            selected: moments.len(),
            rejected,
        };
        (moments, result)
    }
}

/// Absorb each rejected moment into the previous kept one, or into the next
/// kept one when nothing precedes it.
fn merge_rejected(
    mut moments: Vec<Moment>,
    mut selected: Vec<bool>,
    stream: &PlayStream,
) -> (Vec<Moment>, Vec<MergeRecord>) {
    let mut merges = Vec::new();
    if !selected.iter().any(|s| *s) {
        return (moments, merges);
    }

    while !selected[0] {
        let Some(merge) = absorb_into_neighbor(
            &mut moments,
            0,
            1,
            MergeReason::SelectionRejected,
            "rejected before first selected moment",
            stream,
        ) else {
            break;
        };
        selected.remove(0);
        merges.push(merge);
    }

    let mut i = 1;
    while i < moments.len() {
        if selected[i] {
            i += 1;
            continue;
        }
        let detail = format!("importance {} below the selection cut", moments[i].importance);
        let reason = MergeReason::SelectionRejected;
        match absorb_into_neighbor(&mut moments, i, i - 1, reason, detail, stream) {
            Some(merge) => {
                debug!(into = %merge.into, "rejected moment absorbed");
                selected.remove(i);
                merges.push(merge);
            }
            None => i += 1,
        }
    }

    (moments, merges)
}
