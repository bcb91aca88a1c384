//! Event normalization - ordering, clock parsing and score carry-forward.
//!
//! Corrections are applied in place and every one of them is recorded as a
//! [`DataQualityViolation`]; nothing is dropped silently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Event, PlayIndex, Score, TeamSide};
use crate::clock::parse_clock;

/// What was wrong with an incoming event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Event arrived after an event with a higher index.
    OutOfOrder { previous_index: PlayIndex },
    /// A second event with the same index; the later one was discarded.
    DuplicateIndex,
    /// One side's score went down; the last valid value was carried forward.
    ScoreDecrease {
        side: TeamSide,
        previous: u32,
        observed: u32,
    },
    /// Both scores dropped back to zero mid-game.
    ScoreReset { previous: Score },
    UnparseableClock { raw: String },
}

/// A recorded data-quality correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityViolation {
    pub index: PlayIndex,
    pub issue: DataQualityIssue,
}

/// Events after normalization plus the corrections that were applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedEvents {
    pub events: Vec<Event>,
    pub violations: Vec<DataQualityViolation>,
}

/// Normalize a raw event sequence.
///
/// Scores are guaranteed monotonic non-decreasing per team afterwards.
pub fn normalize_events(mut events: Vec<Event>) -> NormalizedEvents {
    let mut violations = Vec::new();

    for pair in events.windows(2) {
        if pair[1].index < pair[0].index {
            violations.push(DataQualityViolation {
                index: pair[1].index,
                issue: DataQualityIssue::OutOfOrder {
                    previous_index: pair[0].index,
                },
            });
        }
    }
    events.sort_by_key(|event| event.index);

    let mut normalized: Vec<Event> = Vec::with_capacity(events.len());
    let mut last_score: Option<Score> = None;

    for mut event in events {
        if normalized.last().is_some_and(|prev| prev.index == event.index) {
            violations.push(DataQualityViolation {
                index: event.index,
                issue: DataQualityIssue::DuplicateIndex,
            });
            continue;
        }

        if event.clock_seconds.is_none() {
            if let Some(raw) = event.clock.clone() {
                match parse_clock(&raw) {
                    Some(seconds) => event.clock_seconds = Some(seconds),
                    None => violations.push(DataQualityViolation {
                        index: event.index,
                        issue: DataQualityIssue::UnparseableClock { raw },
                    }),
                }
            }
        }

        if let (Some(score), Some(previous)) = (event.score(), last_score) {
            let corrected = carry_forward(event.index, score, previous, &mut violations);
            event.home_score = Some(corrected.home);
            event.away_score = Some(corrected.away);
        }
        if let Some(score) = event.score() {
            last_score = Some(score);
        }

        normalized.push(event);
    }

    if !violations.is_empty() {
        debug!(count = violations.len(), "normalization applied corrections");
    }

    NormalizedEvents {
        events: normalized,
        violations,
    }
}

fn carry_forward(
    index: PlayIndex,
    observed: Score,
    previous: Score,
    violations: &mut Vec<DataQualityViolation>,
) -> Score {
    if observed == Score::default() && previous.total() > 0 {
        violations.push(DataQualityViolation {
            index,
            issue: DataQualityIssue::ScoreReset { previous },
        });
        return previous;
    }

    let mut corrected = observed;
    for side in [TeamSide::Home, TeamSide::Away] {
        let (seen, last) = (observed.points(side), previous.points(side));
        if seen < last {
            violations.push(DataQualityViolation {
                index,
                issue: DataQualityIssue::ScoreDecrease {
                    side,
                    previous: last,
                    observed: seen,
                },
            });
            match side {
                TeamSide::Home => corrected.home = last,
                TeamSide::Away => corrected.away = last,
            }
        }
    }
    corrected
}
