//! Game context - team identities used to resolve play participants.

use serde::{Deserialize, Serialize};

use super::TeamSide;

/// Display identity of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub abbreviation: String,
}

impl TeamInfo {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
        }
    }

    /// Whether a feed label refers to this team.
    pub fn matches(&self, label: &str) -> bool {
        let label = label.trim();
        label.eq_ignore_ascii_case(&self.abbreviation) || label.eq_ignore_ascii_case(&self.name)
    }
}

/// Per-game context supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameContext {
    pub game_id: String,
    pub home: TeamInfo,
    pub away: TeamInfo,
}

impl GameContext {
    pub fn new(game_id: impl Into<String>, home: TeamInfo, away: TeamInfo) -> Self {
        Self {
            game_id: game_id.into(),
            home,
            away,
        }
    }

    pub fn team(&self, side: TeamSide) -> &TeamInfo {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    /// Resolve a feed team label (abbreviation or full name) to a side.
    pub fn resolve_side(&self, label: &str) -> Option<TeamSide> {
        if self.home.matches(label) {
            Some(TeamSide::Home)
        } else if self.away.matches(label) {
            Some(TeamSide::Away)
        } else {
            None
        }
    }
}
