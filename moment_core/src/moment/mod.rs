//! Moments - contiguous, typed, scored segments of the play stream.

mod builder;

pub use builder::*;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sport_rules::{ClosingSituation, Leader, PlayIndex, Score, TeamSide};
use uuid::Uuid;

use crate::boundary::DetectedRun;
use crate::kind::MomentType;
use crate::stream::PlayStream;

/// Namespace for deterministic moment ids.
const MOMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d0e_3a51_8c2f_4b7e_9f10_2d4c_5a6b_7c8d);

/// Unique, deterministic identifier for a moment.
///
/// Derived from the game id and the play range, so identical input always
/// produces identical ids and no two moments in one list can collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MomentId(pub Uuid);

impl MomentId {
    pub fn derive(game_id: &str, start_play: PlayIndex, end_play: PlayIndex) -> Self {
        let name = format!("{game_id}:{start_play}:{end_play}");
        Self(Uuid::new_v5(&MOMENT_NAMESPACE, name.as_bytes()))
    }
}

impl std::fmt::Display for MomentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a moment exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    /// Machine label of the rule that opened the moment.
    pub trigger: String,
    /// Whether the leader differs between the start and end of the moment.
    pub control_shift: bool,
    /// Short human description of what changed.
    pub narrative_delta: String,
}

impl Reason {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            control_shift: false,
            narrative_delta: String::new(),
        }
    }
}

/// Marks a moment formed by absorbing early back-and-forth moments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub members: usize,
    pub lead_changes: u32,
    pub ties: u32,
}

/// Closing-window annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingAnnotation {
    pub situation: ClosingSituation,
    /// Minimum-play and density rules are relaxed for this moment.
    pub expansion_eligible: bool,
    /// Moment is the product of decided-game compression.
    pub compressed: bool,
}

/// Provenance of a segment cut out of a mega-moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInfo {
    pub parent: MomentId,
    pub segment: usize,
    pub segments: usize,
    /// Cue that opened this segment; `None` for the first segment.
    pub cue: Option<String>,
    pub dormant: bool,
}

/// Period summary carried by recap moments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapContext {
    pub period: u8,
    pub score: Score,
    pub lead_changes: u32,
    pub ties: u32,
    pub largest_lead: Option<(TeamSide, u32)>,
    pub moment_ids: Vec<MomentId>,
}

/// One narrative beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub id: MomentId,
    pub moment_type: MomentType,

    /// First play index, inclusive.
    pub start_play: PlayIndex,
    /// Last play index, inclusive.
    pub end_play: PlayIndex,
    /// Canonical plays inside the range.
    pub play_count: usize,

    pub period: u8,
    pub end_period: u8,
    pub start_progress: f64,
    pub end_progress: f64,

    pub score_before: Score,
    pub score_after: Score,
    pub tier_before: u8,
    pub tier_after: u8,
    pub leader_before: Leader,
    pub leader_after: Leader,
    pub controlling_team: Option<TeamSide>,

    pub teams: BTreeSet<TeamSide>,
    pub team_names: Vec<String>,
    pub players: BTreeSet<String>,
    pub key_play_ids: BTreeSet<PlayIndex>,

    pub reason: Reason,
    pub run_info: Option<DetectedRun>,

    pub importance: f64,
    pub importance_factors: BTreeMap<String, f64>,

    pub chapter: Option<ChapterInfo>,
    pub closing: Option<ClosingAnnotation>,
    pub split: Option<SplitInfo>,
    pub recap: Option<RecapContext>,

    /// Ids of every moment merged into this one.
    pub absorbed: Vec<MomentId>,
}

impl Moment {
    /// Build a moment over `[start_play, end_play]` with all stream-derived
    /// fields filled in.
    pub fn from_range(
        stream: &PlayStream,
        start_play: PlayIndex,
        end_play: PlayIndex,
        moment_type: MomentType,
        reason: Reason,
    ) -> Self {
        let mut moment = Self {
            id: MomentId::derive(&stream.context().game_id, start_play, end_play),
            moment_type,
            start_play,
            end_play,
            play_count: 0,
            period: 0,
            end_period: 0,
            start_progress: 0.0,
            end_progress: 0.0,
            score_before: Score::default(),
            score_after: Score::default(),
            tier_before: 0,
            tier_after: 0,
            leader_before: Leader::Tied,
            leader_after: Leader::Tied,
            controlling_team: None,
            teams: BTreeSet::new(),
            team_names: Vec::new(),
            players: BTreeSet::new(),
            key_play_ids: BTreeSet::new(),
            reason,
            run_info: None,
            importance: 0.0,
            importance_factors: BTreeMap::new(),
            chapter: None,
            closing: None,
            split: None,
            recap: None,
            absorbed: Vec::new(),
        };
        moment.refresh(stream);
        moment
    }

    /// Recompute every field that depends only on the play range.
    pub fn refresh(&mut self, stream: &PlayStream) {
        let positions = stream.positions(self.start_play, self.end_play);
        let before = stream.state_before(self.start_play);
        let after = stream.state_at_end(self.end_play);

        self.id = MomentId::derive(&stream.context().game_id, self.start_play, self.end_play);
        self.play_count = positions.len();

        if !positions.is_empty() {
            let (first, last) = (positions.start, positions.end - 1);
            self.period = stream.play(first).period;
            self.end_period = stream.play(last).period;
            self.start_progress = stream.progress(first);
            self.end_progress = stream.progress(last);
        }

        self.score_before = before.score();
        self.score_after = after.score();
        self.tier_before = before.tier;
        self.tier_after = after.tier;
        self.leader_before = before.leader;
        self.leader_after = after.leader;
        self.controlling_team = after.leader.side();

        self.teams.clear();
        self.players.clear();
        for pos in positions {
            if let Some(side) = stream.side(pos) {
                self.teams.insert(side);
            }
            let prev = stream.state_before_position(pos).score();
            let curr = stream.state(pos).score();
            if curr.home > prev.home {
                self.teams.insert(TeamSide::Home);
            }
            if curr.away > prev.away {
                self.teams.insert(TeamSide::Away);
            }
            if let Some(player) = &stream.play(pos).player {
                self.players.insert(player.clone());
            }
        }
        self.team_names = self
            .teams
            .iter()
            .map(|side| stream.context().team(*side).abbreviation.clone())
            .collect();

        self.reason.control_shift = self.leader_before != self.leader_after;
        self.reason.narrative_delta = format!(
            "{} -> {} (tier {} -> {})",
            self.score_before, self.score_after, self.tier_before, self.tier_after
        );
    }

    pub fn contains(&self, index: PlayIndex) -> bool {
        (self.start_play..=self.end_play).contains(&index)
    }

    pub fn has_score_change(&self) -> bool {
        self.score_before != self.score_after
    }

    pub fn has_tier_change(&self) -> bool {
        self.tier_before != self.tier_after
    }

    pub fn is_chapter(&self) -> bool {
        self.chapter.is_some()
    }

    pub fn is_overtime(&self, stream: &PlayStream) -> bool {
        stream.sport().is_overtime(self.end_period)
    }

    /// Points of the attached run, zero without one.
    pub fn run_points(&self) -> u32 {
        self.run_info.as_ref().map_or(0, |run| run.points)
    }
}
