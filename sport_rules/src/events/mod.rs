//! Play-by-play event definitions.

mod context;
mod normalize;

pub use context::*;
pub use normalize::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sequence index of a play within a game.
pub type PlayIndex = u32;

/// Description fragments that mark a play as high impact.
pub const HIGH_IMPACT_KEYWORDS: &[&str] = &["ejected", "ejection", "flagrant", "injury", "injured"];

/// One side of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

/// Cumulative score at a point in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Absolute point difference.
    pub fn margin(&self) -> u32 {
        self.home.abs_diff(self.away)
    }

    /// Home score minus away score.
    pub fn differential(&self) -> i64 {
        i64::from(self.home) - i64::from(self.away)
    }

    /// Points scored by one side.
    pub fn points(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::Home => self.home,
            TeamSide::Away => self.away,
        }
    }

    /// Total points scored in the game so far.
    pub fn total(&self) -> u32 {
        self.home + self.away
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Play classification as delivered by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayType {
    FieldGoal,
    FreeThrow,
    Rebound,
    Turnover,
    Foul,
    Timeout,
    Substitution,
    Violation,
    PeriodStart,
    PeriodEnd,
    Ejection,
    Injury,
    #[default]
    #[serde(other)]
    Other,
}

/// A single play-by-play event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub index: PlayIndex,
    pub period: u8,

    /// Raw clock string as delivered by the feed.
    #[serde(default)]
    pub clock: Option<String>,

    /// Seconds remaining in the period.
    #[serde(default)]
    pub clock_seconds: Option<u32>,

    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,

    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub play_type: PlayType,

    /// Team abbreviation or name of the acting team.
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub player: Option<String>,

    /// Feed-specific fields carried through untouched.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Event {
    /// Create an empty event at the given index and period.
    pub fn new(index: PlayIndex, period: u8) -> Self {
        Self {
            index,
            period,
            clock: None,
            clock_seconds: None,
            home_score: None,
            away_score: None,
            description: String::new(),
            play_type: PlayType::Other,
            team: None,
            player: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the clock from seconds remaining in the period.
    pub fn with_clock_seconds(mut self, seconds: u32) -> Self {
        self.clock = Some(format!("{}:{:02}", seconds / 60, seconds % 60));
        self.clock_seconds = Some(seconds);
        self
    }

    /// Set the raw clock string without parsing it.
    pub fn with_raw_clock(mut self, clock: impl Into<String>) -> Self {
        self.clock = Some(clock.into());
        self
    }

    pub fn with_score(mut self, home: u32, away: u32) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_play_type(mut self, play_type: PlayType) -> Self {
        self.play_type = play_type;
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    /// The cumulative score, if both sides are present.
    pub fn score(&self) -> Option<Score> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(Score::new(home, away)),
            _ => None,
        }
    }

    /// Canonical plays carry a valid score and feed the narrative stream.
    pub fn is_canonical(&self) -> bool {
        self.score().is_some()
    }

    pub fn is_timeout(&self) -> bool {
        self.play_type == PlayType::Timeout
            || self.description.to_ascii_lowercase().contains("timeout")
    }

    /// Ejections, injuries and flagrant fouls.
    pub fn has_high_impact_marker(&self) -> bool {
        if matches!(self.play_type, PlayType::Ejection | PlayType::Injury) {
            return true;
        }
        let description = self.description.to_ascii_lowercase();
        HIGH_IMPACT_KEYWORDS
            .iter()
            .any(|keyword| description.contains(keyword))
    }
}
