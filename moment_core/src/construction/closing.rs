//! Closing-window expansion and decided-game compression.

use serde::{Deserialize, Serialize};
use sport_rules::{ClosingSituation, CrossingKind, PlayIndex};
use tracing::debug;

use crate::boundary::DensityDecision;
use crate::kind::MomentType;
use crate::merge::{absorb_into_neighbor, MergeReason, MergeRecord};
use crate::moment::{ClosingAnnotation, Moment, Reason};
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosingConfig {
    /// Minimum canonical plays on each side of an expansion split.
    pub relaxed_min_plays: usize,
}

impl Default for ClosingConfig {
    fn default() -> Self {
        Self { relaxed_min_plays: 2 }
    }
}

/// The trailing final-phase stretch of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingWindow {
    pub situation: ClosingSituation,
    pub start_play: PlayIndex,
    pub end_play: PlayIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingRecord {
    pub window: ClosingWindow,
    pub annotated: usize,
    pub expansion_splits: usize,
    pub compressed: usize,
}

/// Scan backward from the last play through the final phase.
///
/// The window is close when any play in it is CLOSE_GAME_CLOSING, decided
/// when none is and the final play is DECIDED_GAME_CLOSING.
pub fn detect_closing_window(stream: &PlayStream) -> Option<ClosingWindow> {
    let last = stream.len().checked_sub(1)?;
    let final_classification = stream.closing(last);
    if !final_classification.in_final_phase {
        return None;
    }

    let mut start = last;
    let mut found_close = false;
    for pos in (0..=last).rev() {
        let classification = stream.closing(pos);
        if !classification.in_final_phase {
            break;
        }
        start = pos;
        found_close |= classification.is_close();
    }

    let situation = if found_close {
        ClosingSituation::CloseGameClosing
    } else if final_classification.is_decided() {
        ClosingSituation::DecidedGameClosing
    } else {
        return None;
    };

    Some(ClosingWindow {
        situation,
        start_play: stream.index(start),
        end_play: stream.index(last),
    })
}

/// Expand a close finish or compress a decided one.
pub fn apply_closing(
    mut moments: Vec<Moment>,
    stream: &PlayStream,
    density: &[DensityDecision],
    config: &ClosingConfig,
) -> (Vec<Moment>, Option<ClosingRecord>, Vec<MergeRecord>) {
    let Some(window) = detect_closing_window(stream) else {
        return (moments, None, Vec::new());
    };
    let mut record = ClosingRecord {
        window,
        annotated: 0,
        expansion_splits: 0,
        compressed: 0,
    };
    let mut merges = Vec::new();

    match window.situation {
        ClosingSituation::CloseGameClosing => {
            for decision in density.iter().filter(|d| {
                d.suppressed && (window.start_play..=window.end_play).contains(&d.index)
            }) {
                if split_at(&mut moments, decision.index, decision.crossing, stream, config) {
                    record.expansion_splits += 1;
                }
            }
            for moment in moments.iter_mut().filter(|m| m.end_play >= window.start_play) {
                moment.closing = Some(ClosingAnnotation {
                    situation: window.situation,
                    expansion_eligible: true,
                    compressed: false,
                });
                record.annotated += 1;
            }
        }
        ClosingSituation::DecidedGameClosing => {
            let mut i = 0;
            while i + 1 < moments.len() {
                let (a, b) = (&moments[i], &moments[i + 1]);
                let compressible = a.end_play >= window.start_play
                    && !a.moment_type.is_protected()
                    && !b.moment_type.is_protected();
                if !compressible {
                    i += 1;
                    continue;
                }
                let detail = format!("decided finish from play {}", window.start_play);
                if let Some(merge) = absorb_into_neighbor(
                    &mut moments,
                    i + 1,
                    i,
                    MergeReason::ClosingCompression,
                    detail,
                    stream,
                ) {
                    merges.push(merge);
                    record.compressed += 1;
                    moments[i].closing = Some(ClosingAnnotation {
                        situation: window.situation,
                        expansion_eligible: false,
                        compressed: true,
                    });
                }
            }
        }
        ClosingSituation::NotClosing => {}
    }

    debug!(
        situation = window.situation.as_str(),
        start = window.start_play,
        annotated = record.annotated,
        splits = record.expansion_splits,
        compressed = record.compressed,
        "closing pass complete"
    );
    (moments, Some(record), merges)
}

/// Split the moment containing `index` so a new FLIP/TIE moment starts there.
fn split_at(
    moments: &mut Vec<Moment>,
    index: PlayIndex,
    crossing: CrossingKind,
    stream: &PlayStream,
    config: &ClosingConfig,
) -> bool {
    let Some(pos) = moments.iter().position(|m| m.contains(index)) else {
        return false;
    };
    let original = &moments[pos];
    if original.start_play == index {
        return false;
    }
    let head_plays = stream.positions(original.start_play, index - 1).len();
    let tail_plays = stream.positions(index, original.end_play).len();
    if head_plays < config.relaxed_min_plays || tail_plays < config.relaxed_min_plays {
        return false;
    }

    let moment_type = match crossing {
        CrossingKind::TieReached => MomentType::Tie,
        CrossingKind::Flip
        | CrossingKind::TierUp
        | CrossingKind::TierDown
        | CrossingKind::TieBroken => MomentType::Flip,
    };

    let mut head = original.clone();
    head.end_play = index - 1;
    head.refresh(stream);

    let mut tail = Moment::from_range(
        stream,
        index,
        original.end_play,
        moment_type,
        Reason::new("closing_expansion"),
    );
    tail.importance = original.importance;
    tail.key_play_ids = original
        .key_play_ids
        .iter()
        .copied()
        .filter(|&play| play >= index)
        .collect();
    tail.key_play_ids.insert(index);
    head.key_play_ids.retain(|&play| play < index);
    if original.run_info.as_ref().is_some_and(|run| run.end_play >= index) {
        tail.run_info = head.run_info.take().filter(|_| moment_type.owns_runs());
    }

    debug!(index, "closing expansion split {}", moment_type);
    moments[pos] = head;
    moments.insert(pos + 1, tail);
    true
}
