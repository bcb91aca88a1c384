//! Merge rules - which moments are valid, which may merge, and how.
//!
//! Every pass that shrinks the moment list goes through [`absorb_into_neighbor`],
//! so play coverage and score continuity survive any sequence of merges.

mod budget;

pub use budget::*;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kind::MomentType;
use crate::moment::{Moment, MomentId};
use crate::stream::PlayStream;

/// Which pass asked for a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeReason {
    InvalidMoment,
    PeriodLimit,
    GlobalCap,
    Quota,
    ClosingCompression,
    RedundantSplit,
    SelectionRejected,
    Coherence,
}

/// One merge, for the generation trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub absorbed: MomentId,
    pub absorbed_type: MomentType,
    pub into: MomentId,
    pub into_type: MomentType,
    pub reason: MergeReason,
    pub detail: String,
}

/// Which side of an adjacent pair keeps its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Survivor {
    First,
    Second,
}

/// Structural validity of a moment.
///
/// A valid moment has a causal trigger, at least one participant team, and
/// either a score or tier delta or a protected type. Single-play moments are
/// valid only for FLIP, TIE, CLOSING_CONTROL and HIGH_IMPACT.
pub fn is_valid_moment(moment: &Moment) -> bool {
    if moment.reason.trigger.is_empty() || moment.teams.is_empty() {
        return false;
    }
    let moves = moment.has_score_change() || moment.has_tier_change();
    if !(moves || moment.moment_type.is_protected()) {
        return false;
    }
    moment.play_count > 1 || moment.moment_type.is_always_allowed()
}

/// Whether two adjacent moments may merge.
pub fn can_merge(a: &Moment, b: &Moment) -> bool {
    let (x, y) = (a.moment_type, b.moment_type);
    if x.is_protected() || y.is_protected() {
        return false;
    }
    if x == y {
        return true;
    }
    if x == MomentType::Neutral || y == MomentType::Neutral {
        return true;
    }
    if x.is_margin_move() && y.is_margin_move() {
        return a.controlling_team == b.controlling_team;
    }
    false
}

/// Merge two adjacent moments into one spanning both.
///
/// The survivor keeps its type, trigger and annotations. Importance is the
/// max of the two, key plays are unioned, the larger run is kept and the
/// lineage of both sides is preserved.
pub fn merge_adjacent(
    first: &Moment,
    second: &Moment,
    survivor: Survivor,
    stream: &PlayStream,
) -> Moment {
    let (keep, other) = match survivor {
        Survivor::First => (first, second),
        Survivor::Second => (second, first),
    };

    let mut merged = keep.clone();
    merged.start_play = first.start_play;
    merged.end_play = second.end_play;
    merged.importance = keep.importance.max(other.importance);
    merged.key_play_ids.extend(other.key_play_ids.iter().copied());
    merged.closing = keep.closing.clone().or_else(|| other.closing.clone());

    let runs = [keep.run_info.clone(), other.run_info.clone()];
    let mut runs: Vec<_> = runs.into_iter().flatten().collect();
    runs.sort_by(|a, b| b.points.cmp(&a.points));
    merged.run_info = None;
    for run in runs {
        if merged.moment_type.owns_runs() && merged.run_info.is_none() {
            merged.run_info = Some(run);
        } else {
            merged.key_play_ids.extend(run.scoring_plays);
        }
    }

    merged.absorbed.extend(other.absorbed.iter().copied());
    merged.absorbed.push(other.id);
    merged.refresh(stream);
    merged
}

/// Merge `moments[absorbed]` into its neighbour `moments[into]`.
///
/// The neighbour survives. Returns `None` when the two are not adjacent.
pub fn absorb_into_neighbor(
    moments: &mut Vec<Moment>,
    absorbed: usize,
    into: usize,
    reason: MergeReason,
    detail: impl Into<String>,
    stream: &PlayStream,
) -> Option<MergeRecord> {
    if absorbed.abs_diff(into) != 1 || absorbed.max(into) >= moments.len() {
        return None;
    }

    let (first, second) = (absorbed.min(into), absorbed.max(into));
    let survivor = if into == first {
        Survivor::First
    } else {
        Survivor::Second
    };
    let absorbed_moment = &moments[absorbed];
    let (absorbed_id, absorbed_type) = (absorbed_moment.id, absorbed_moment.moment_type);

    let merged = merge_adjacent(&moments[first], &moments[second], survivor, stream);
    let record = MergeRecord {
        absorbed: absorbed_id,
        absorbed_type,
        into: merged.id,
        into_type: merged.moment_type,
        reason,
        detail: detail.into(),
    };
    debug!(
        absorbed = %record.absorbed,
        into = %record.into,
        reason = ?reason,
        "merged {} into {}",
        absorbed_type,
        merged.moment_type
    );

    moments[first] = merged;
    moments.remove(second);
    Some(record)
}
