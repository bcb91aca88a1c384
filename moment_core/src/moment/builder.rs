//! Moment builder - cuts the canonical stream at boundaries.

use sport_rules::PlayIndex;
use tracing::{debug, info};

use super::{Moment, Reason};
use crate::boundary::{BoundaryEvent, DetectedRun};
use crate::kind::MomentType;
use crate::stream::PlayStream;

/// Build contiguous moments from ordered boundaries, then attach runs.
///
/// A NEUTRAL `game_start` moment opens the game when no boundary sits on the
/// first canonical play. Each moment ends at the play before the next
/// boundary; the last one ends at the last canonical play.
pub fn build_moments(
    stream: &PlayStream,
    boundaries: &[BoundaryEvent],
    runs: &[DetectedRun],
) -> Vec<Moment> {
    let first = stream.first_index();
    let last = stream.last_index();

    let mut openers: Vec<(PlayIndex, MomentType, Reason)> =
        Vec::with_capacity(boundaries.len() + 1);
    if boundaries.first().map_or(true, |b| b.index != first) {
        openers.push((first, MomentType::Neutral, Reason::new("game_start")));
    }
    for boundary in boundaries {
        if boundary.index < first || boundary.index > last {
            continue;
        }
        let reason = Reason::new(boundary.trigger.clone());
        openers.push((boundary.index, boundary.moment_type, reason));
    }

    let mut moments = Vec::with_capacity(openers.len());
    for (i, (start, moment_type, reason)) in openers.iter().enumerate() {
        let end = openers
            .get(i + 1)
            .map_or(last, |(next_start, _, _)| next_start - 1);
        let mut moment = Moment::from_range(stream, *start, end, *moment_type, reason.clone());
        moment.key_play_ids.insert(*start);
        moments.push(moment);
    }

    attach_runs(&mut moments, runs);

    info!(
        moments = moments.len(),
        boundaries = boundaries.len(),
        "moments built"
    );
    moments
}

/// Attach each run to the moment holding its last scoring play.
///
/// LEAD_BUILD, CUT and FLIP moments keep the larger run as `run_info`; every
/// other run contributes its scoring plays to `key_play_ids`.
pub fn attach_runs(moments: &mut [Moment], runs: &[DetectedRun]) {
    for run in runs {
        let Some(owner) = moments.iter_mut().find(|m| m.contains(run.end_play)) else {
            continue;
        };

        if !owner.moment_type.owns_runs() {
            owner.key_play_ids.extend(run.scoring_plays.iter().copied());
            continue;
        }

        match &owner.run_info {
            Some(existing) if existing.points >= run.points => {
                owner.key_play_ids.extend(run.scoring_plays.iter().copied());
            }
            _ => {
                if let Some(displaced) = owner.run_info.take() {
                    owner.key_play_ids.extend(displaced.scoring_plays);
                }
                debug!(moment = %owner.id, points = run.points, "run attached");
                owner.run_info = Some(run.clone());
            }
        }
    }
}
