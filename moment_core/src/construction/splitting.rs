//! Semantic splitting of mega-moments.
//!
//! A mega-moment is scanned in four steps:
//! 1. **Cues**: run starts, tier changes, pressure ends, post-swing timeouts,
//!    drought ends and period transitions become candidate split points
//! 2. **Dedupe**: candidates within a few plays of each other keep the
//!    highest-priority cue
//! 3. **Select**: points are accepted by priority while they stay far enough
//!    apart and leave long enough segments
//! 4. **Filter**: redundant segments merge back into their predecessor

use std::ops::Range;

use serde::{Deserialize, Serialize};
use sport_rules::{PlayIndex, TeamSide};
use tracing::debug;

use crate::boundary::DetectedRun;
use crate::importance::round_score;
use crate::kind::MomentType;
use crate::merge::{absorb_into_neighbor, MergeReason, MergeRecord};
use crate::moment::{Moment, MomentId, Reason, SplitInfo};
use crate::stream::PlayStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Canonical plays at which a moment counts as a mega-moment.
    pub mega_moment_plays: usize,
    pub min_split_gap: usize,
    pub min_segment_plays: usize,
    pub max_splits: usize,
    pub dedupe_window: usize,

    /// Margin whose crossing qualifies a run-start split.
    pub threat_margin: u32,
    /// Plays without a score before a drought ends.
    pub drought_plays: usize,
    /// Length of unanswered trailing-team pressure before its end counts.
    pub pressure_plays: usize,
    /// Differential swing that makes a timeout a split cue.
    pub swing_points: u32,
    pub swing_lookback: usize,
    /// Progress from which any run start qualifies.
    pub late_progress: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            mega_moment_plays: 50,
            min_split_gap: 15,
            min_segment_plays: 10,
            max_splits: 3,
            dedupe_window: 5,
            threat_margin: 6,
            drought_plays: 12,
            pressure_plays: 8,
            swing_points: 6,
            swing_lookback: 10,
            late_progress: 0.75,
        }
    }
}

/// Why a mega-moment may be cut at a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCue {
    RunStart,
    TierChange,
    PressureEnd,
    PostSwingTimeout,
    DroughtEnd,
    PeriodTransition,
}

impl SplitCue {
    /// Lower is stronger.
    pub fn priority(&self) -> u8 {
        match self {
            SplitCue::RunStart => 1,
            SplitCue::TierChange => 2,
            SplitCue::PressureEnd => 3,
            SplitCue::PostSwingTimeout => 4,
            SplitCue::DroughtEnd => 5,
            SplitCue::PeriodTransition => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitCue::RunStart => "run_start",
            SplitCue::TierChange => "tier_change",
            SplitCue::PressureEnd => "pressure_end",
            SplitCue::PostSwingTimeout => "post_swing_timeout",
            SplitCue::DroughtEnd => "drought_end",
            SplitCue::PeriodTransition => "period_transition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPoint {
    pub index: PlayIndex,
    pub cue: SplitCue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub parent: MomentId,
    pub play_count: usize,
    pub candidates: usize,
    pub chosen: Vec<SplitPoint>,
    pub segments: usize,
    pub merged_back: usize,
}

fn scoring_side(stream: &PlayStream, pos: usize) -> Option<TeamSide> {
    let before = stream.state_before_position(pos).score();
    let after = stream.state(pos).score();
    match (after.home > before.home, after.away > before.away) {
        (true, false) => Some(TeamSide::Home),
        (false, true) => Some(TeamSide::Away),
        _ => None,
    }
}

/// Candidate cues inside a moment, deduplicated by priority.
pub fn find_split_points(
    moment: &Moment,
    stream: &PlayStream,
    runs: &[DetectedRun],
    config: &SplitConfig,
) -> Vec<(usize, SplitCue)> {
    let range = stream.positions(moment.start_play, moment.end_play);
    let mut candidates: Vec<(usize, SplitCue)> = Vec::new();
    if range.len() < 2 {
        return candidates;
    }

    // Scoring state carried in from before the moment.
    let mut last_score = (0..range.start).rev().find(|&pos| stream.is_scoring(pos));
    let mut pressure_start: Option<usize> = None;
    let mut pressure_scores = 0u32;

    for pos in range.clone() {
        let interior = pos > range.start;
        let before = stream.state_before_position(pos);
        let after = stream.state(pos);

        if interior && after.tier != before.tier {
            candidates.push((pos, SplitCue::TierChange));
        }
        if interior && stream.play(pos).period != stream.play(pos - 1).period {
            candidates.push((pos, SplitCue::PeriodTransition));
        }
        if interior && stream.play(pos - 1).is_timeout() {
            let lookback = pos.saturating_sub(1 + config.swing_lookback).max(range.start);
            let swing = stream.state(pos - 1).score().differential()
                - stream.state_before_position(lookback).score().differential();
            if swing.unsigned_abs() >= u64::from(config.swing_points) {
                candidates.push((pos, SplitCue::PostSwingTimeout));
            }
        }

        if stream.is_scoring(pos) {
            let quiet = last_score.map_or(pos, |last| pos - last - 1);
            if interior && quiet >= config.drought_plays {
                candidates.push((pos, SplitCue::DroughtEnd));
            }
            last_score = Some(pos);

            match (scoring_side(stream, pos), before.leader.side()) {
                (Some(scorer), Some(leader)) if scorer == leader => {
                    if let Some(start) = pressure_start.take() {
                        let sustained = pos - start >= config.pressure_plays;
                        if interior && pressure_scores >= 2 && sustained {
                            candidates.push((pos, SplitCue::PressureEnd));
                        }
                    }
                    pressure_scores = 0;
                }
                (Some(_), Some(_)) => {
                    pressure_start.get_or_insert(pos);
                    pressure_scores += 1;
                }
                _ => {
                    pressure_start = None;
                    pressure_scores = 0;
                }
            }
        }
    }

    for run in runs {
        let (Some(start), Some(end)) =
            (stream.position_of(run.start_play), stream.position_of(run.end_play))
        else {
            continue;
        };
        if start <= range.start || start >= range.end {
            continue;
        }
        let before = stream.state_before_position(start);
        let after = stream.state(end);
        let threat_crossed =
            (before.margin > config.threat_margin) != (after.margin > config.threat_margin);
        let late = stream.progress(start) >= config.late_progress;
        if before.tier != after.tier || threat_crossed || late {
            candidates.push((start, SplitCue::RunStart));
        }
    }

    candidates.sort_by_key(|&(pos, cue)| (pos, cue.priority()));
    let mut deduped: Vec<(usize, SplitCue)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(last) = deduped.last_mut() {
            if candidate.0 - last.0 < config.dedupe_window {
                if candidate.1.priority() < last.1.priority() {
                    *last = candidate;
                }
                continue;
            }
        }
        deduped.push(candidate);
    }
    deduped
}

/// Accept candidates by priority while spacing rules hold.
pub fn choose_split_points(
    range: Range<usize>,
    candidates: &[(usize, SplitCue)],
    config: &SplitConfig,
) -> Vec<(usize, SplitCue)> {
    let mut ordered = candidates.to_vec();
    ordered.sort_by_key(|&(pos, cue)| (cue.priority(), pos));
    let spacing = config.min_split_gap.max(config.min_segment_plays);

    let mut chosen: Vec<(usize, SplitCue)> = Vec::new();
    for (pos, cue) in ordered {
        if chosen.len() >= config.max_splits {
            break;
        }
        let head = pos - range.start;
        let tail = range.end - pos;
        if head < config.min_segment_plays || tail < config.min_segment_plays {
            continue;
        }
        if chosen.iter().any(|&(other, _)| pos.abs_diff(other) < spacing) {
            continue;
        }
        chosen.push((pos, cue));
    }
    chosen.sort_by_key(|&(pos, _)| pos);
    chosen
}

fn is_dormant(segment: &Moment, stream: &PlayStream) -> bool {
    let before = stream.state_before(segment.start_play);
    stream
        .positions(segment.start_play, segment.end_play)
        .all(|pos| {
            let state = stream.state(pos);
            state.tier == before.tier && state.leader == before.leader
        })
}

/// Split every mega-moment at its chosen cues.
pub fn split_mega_moments(
    moments: Vec<Moment>,
    stream: &PlayStream,
    runs: &[DetectedRun],
    config: &SplitConfig,
) -> (Vec<Moment>, Vec<SplitRecord>, Vec<MergeRecord>) {
    let mut out = Vec::with_capacity(moments.len());
    let mut records = Vec::new();
    let mut merges = Vec::new();

    for moment in moments {
        if moment.play_count < config.mega_moment_plays {
            out.push(moment);
            continue;
        }

        let range = stream.positions(moment.start_play, moment.end_play);
        let candidates = find_split_points(&moment, stream, runs, config);
        let chosen = choose_split_points(range, &candidates, config);
        if chosen.is_empty() {
            out.push(moment);
            continue;
        }

        let mut segments = cut_segments(&moment, &chosen, stream);
        let created = segments.len();
        let mut merged_back = 0;

        let mut k = 1;
        while k < segments.len() {
            if is_redundant(&segments[k - 1], &segments[k], stream, runs) {
                let detail = format!("segment {k} repeats its predecessor");
                if let Some(merge) = absorb_into_neighbor(
                    &mut segments,
                    k,
                    k - 1,
                    MergeReason::RedundantSplit,
                    detail,
                    stream,
                ) {
                    merges.push(merge);
                    merged_back += 1;
                    continue;
                }
            }
            k += 1;
        }

        let total = segments.len();
        for (k, segment) in segments.iter_mut().enumerate() {
            if total == 1 {
                segment.split = None;
                segment.importance = moment.importance;
                continue;
            }
            if let Some(split) = segment.split.as_mut() {
                split.segment = k;
                split.segments = total;
            }
        }

        debug!(
            parent = %moment.id,
            plays = moment.play_count,
            segments = total,
            merged_back,
            "mega-moment split"
        );
        records.push(SplitRecord {
            parent: moment.id,
            play_count: moment.play_count,
            candidates: candidates.len(),
            chosen: chosen
                .iter()
                .map(|&(pos, cue)| SplitPoint {
                    index: stream.index(pos),
                    cue,
                })
                .collect(),
            segments: created,
            merged_back,
        });
        out.extend(segments);
    }

    (out, records, merges)
}

fn cut_segments(moment: &Moment, chosen: &[(usize, SplitCue)], stream: &PlayStream) -> Vec<Moment> {
    let mut starts: Vec<(PlayIndex, Option<SplitCue>)> = vec![(moment.start_play, None)];
    starts.extend(chosen.iter().map(|&(pos, cue)| (stream.index(pos), Some(cue))));

    let mut segments = Vec::with_capacity(starts.len());
    for (k, &(start, cue)) in starts.iter().enumerate() {
        let end = starts.get(k + 1).map_or(moment.end_play, |&(next, _)| next - 1);

        let mut segment = if k == 0 {
            let mut head = moment.clone();
            head.end_play = end;
            head.refresh(stream);
            head
        } else {
            let trigger = format!("split_{}", cue.map_or("none", |c| c.as_str()));
            let mut tail =
                Moment::from_range(stream, start, end, MomentType::Neutral, Reason::new(trigger));
            tail.moment_type = tail_type(&tail);
            tail.closing = moment.closing.clone();
            tail
        };

        segment.key_play_ids = moment
            .key_play_ids
            .iter()
            .copied()
            .filter(|&play| segment.contains(play))
            .collect();
        segment.key_play_ids.insert(start);
        segment.run_info = moment
            .run_info
            .clone()
            .filter(|run| segment.moment_type.owns_runs() && segment.contains(run.end_play));

        let share = segment.play_count as f64 / moment.play_count.max(1) as f64;
        segment.importance = round_score(moment.importance * share);
        segment.split = Some(SplitInfo {
            parent: moment.id,
            segment: k,
            segments: starts.len(),
            cue: cue.map(|c| c.as_str().to_string()),
            dormant: is_dormant(&segment, stream),
        });
        segments.push(segment);
    }
    segments
}

/// Type of a segment cut out after the opening play.
///
/// Only the first segment holds the play that opened the parent, so later
/// segments are typed by their own tier movement.
fn tail_type(segment: &Moment) -> MomentType {
    match segment.tier_after.cmp(&segment.tier_before) {
        std::cmp::Ordering::Greater => MomentType::LeadBuild,
        std::cmp::Ordering::Less => MomentType::Cut,
        std::cmp::Ordering::Equal => MomentType::Neutral,
    }
}

/// Same tier signature as the previous segment, no run of its own and no
/// high-impact play.
fn is_redundant(
    previous: &Moment,
    segment: &Moment,
    stream: &PlayStream,
    runs: &[DetectedRun],
) -> bool {
    let signature = |m: &Moment| (m.tier_before, m.tier_after, m.leader_after);
    let own_run = runs.iter().any(|run| segment.contains(run.start_play));
    let high_impact =
        stream.has_high_impact(stream.positions(segment.start_play, segment.end_play));
    signature(previous) == signature(segment) && !own_run && !high_impact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::{CoherenceEnforcer, CoherenceVerdict};
    use crate::test_support::ScriptedGame;

    fn mega(stream: &PlayStream) -> Moment {
        let mut moment = Moment::from_range(
            stream,
            stream.first_index(),
            stream.last_index(),
            MomentType::LeadBuild,
            Reason::new("tie_broken"),
        );
        moment.importance = 6.0;
        moment
    }

    #[test]
    fn test_tier_change_outranks_drought_end() {
        let stream = ScriptedGame::new().home(2).idle(24).home(6).idle(34).build_stream();
        let moment = mega(&stream);

        let candidates = find_split_points(&moment, &stream, &[], &SplitConfig::default());

        assert!(candidates.contains(&(25, SplitCue::TierChange)));
        assert!(!candidates.iter().any(|&(_, cue)| cue == SplitCue::DroughtEnd));
        assert!(candidates.contains(&(36, SplitCue::PeriodTransition)));
    }

    #[test]
    fn test_mega_moment_splits_with_proportional_importance() {
        let stream = ScriptedGame::new().home(2).idle(24).home(6).idle(34).build_stream();

        let (out, records, merges) =
            split_mega_moments(vec![mega(&stream)], &stream, &[], &SplitConfig::default());

        assert_eq!(out.len(), 2);
        assert_eq!((out[0].start_play, out[0].end_play), (0, 24));
        assert_eq!((out[1].start_play, out[1].end_play), (25, 59));
        assert_eq!(out[0].importance, 2.5);
        assert_eq!(out[1].importance, 3.5);
        assert_eq!(out[1].reason.trigger, "split_tier_change");
        assert_eq!(records[0].chosen.len(), 1);
        assert!(merges.is_empty());
    }

    #[test]
    fn test_redundant_segment_merges_back() {
        let stream = ScriptedGame::new().home(2).idle(59).build_stream();
        let original = mega(&stream);

        let (out, records, merges) =
            split_mega_moments(vec![original.clone()], &stream, &[], &SplitConfig::default());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, original.id);
        assert!(out[0].split.is_none());
        assert_eq!(out[0].importance, 6.0);
        assert_eq!(records[0].merged_back, 1);
        assert_eq!(merges[0].reason, MergeReason::RedundantSplit);
    }

    #[test]
    fn test_small_moments_are_untouched() {
        let stream = ScriptedGame::new().home(2).idle(20).home(6).build_stream();
        let moment = mega(&stream);

        let (out, records, _) =
            split_mega_moments(vec![moment], &stream, &[], &SplitConfig::default());

        assert_eq!(out.len(), 1);
        assert!(records.is_empty());
    }

    #[test]
    fn test_choose_respects_spacing() {
        let config = SplitConfig::default();
        let candidates = vec![
            (12, SplitCue::PeriodTransition),
            (20, SplitCue::RunStart),
            (30, SplitCue::TierChange),
            (45, SplitCue::DroughtEnd),
            (55, SplitCue::PressureEnd),
        ];

        let chosen = choose_split_points(0..60, &candidates, &config);

        let points: Vec<_> = chosen.iter().map(|&(pos, _)| pos).collect();
        assert_eq!(points, vec![20, 45]);
    }

    fn span(stream: &PlayStream, start: PlayIndex, end: PlayIndex) -> Moment {
        Moment::from_range(stream, start, end, MomentType::LeadBuild, Reason::new("tier_up"))
    }

    #[test]
    fn test_split_tail_is_typed_by_its_own_range() {
        // Away takes the lead on play 1, then stretches it on play 32.
        let stream = ScriptedGame::new()
            .home(5)
            .away(8)
            .idle(30)
            .away(10)
            .idle(30)
            .build_stream();
        let flip = Moment::from_range(&stream, 1, 62, MomentType::Flip, Reason::new("flip"));

        let (out, _, _) = split_mega_moments(vec![flip], &stream, &[], &SplitConfig::default());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].moment_type, MomentType::Flip);
        assert_eq!((out[1].start_play, out[1].end_play), (32, 62));
        assert_eq!(out[1].moment_type, MomentType::LeadBuild);

        let (_, result) = CoherenceEnforcer::with_defaults().enforce(out, &stream);
        assert_eq!(result.decisions[1].verdict, CoherenceVerdict::StateChange);
    }

    #[test]
    fn test_quiet_tail_becomes_neutral() {
        assert_eq!(
            tail_type(&span(&ScriptedGame::new().home(3).idle(3).build_stream(), 1, 3)),
            MomentType::Neutral
        );
        assert_eq!(
            tail_type(&span(&ScriptedGame::new().home(12).away(4).build_stream(), 1, 1)),
            MomentType::Cut
        );
    }

    #[test]
    fn test_scoring_drought_end_is_a_cue() {
        let stream = ScriptedGame::new().home(3).idle(15).home(2).idle(5).build_stream();

        let candidates =
            find_split_points(&span(&stream, 0, 21), &stream, &[], &SplitConfig::default());

        assert_eq!(candidates, vec![(16, SplitCue::DroughtEnd)]);
    }

    #[test]
    fn test_answered_pressure_is_a_cue() {
        // Two unanswered away baskets over nine plays, then home answers.
        let stream = ScriptedGame::new()
            .home(20)
            .away(1)
            .idle(4)
            .away(1)
            .idle(3)
            .home(2)
            .idle(2)
            .build_stream();

        let candidates =
            find_split_points(&span(&stream, 0, 12), &stream, &[], &SplitConfig::default());

        assert_eq!(candidates, vec![(10, SplitCue::PressureEnd)]);
    }

    #[test]
    fn test_timeout_after_swing_is_a_cue() {
        let stream = ScriptedGame::new()
            .home(30)
            .idle(2)
            .away(3)
            .away(3)
            .timeout()
            .idle(3)
            .build_stream();

        let candidates =
            find_split_points(&span(&stream, 1, 8), &stream, &[], &SplitConfig::default());

        assert_eq!(candidates, vec![(6, SplitCue::PostSwingTimeout)]);
    }
}
