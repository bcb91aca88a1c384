//! Shared builders for unit tests.

use sport_rules::{Event, GameContext, PlayType, Sport, SportConfig, TeamInfo};

use crate::stream::PlayStream;

/// Seconds each scripted play takes off the clock.
pub const SECONDS_PER_PLAY: u32 = 20;

pub fn nba() -> SportConfig {
    SportConfig::preset(Sport::Nba)
}

pub fn context() -> GameContext {
    GameContext::new(
        "game-0001",
        TeamInfo::new("Boston Celtics", "BOS"),
        TeamInfo::new("New York Knicks", "NYK"),
    )
}

/// Scripts a game play by play.
///
/// Every scripted play is canonical unless added with [`ScriptedGame::unscored`].
/// The clock starts at 12:00 of the first period and drops by
/// [`SECONDS_PER_PLAY`] after each play, rolling into the next period at 0:00.
#[derive(Debug, Clone)]
pub struct ScriptedGame {
    events: Vec<Event>,
    home: u32,
    away: u32,
    period: u8,
    clock: u32,
}

impl Default for ScriptedGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGame {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            home: 0,
            away: 0,
            period: 1,
            clock: 720,
        }
    }

    /// Jump to a period and clock for the next play.
    pub fn at(mut self, period: u8, clock: u32) -> Self {
        self.period = period;
        self.clock = clock;
        self
    }

    pub fn home(mut self, points: u32) -> Self {
        self.home += points;
        self.push(format!("BOS scores {points}"), Some("BOS"), PlayType::FieldGoal, true)
    }

    pub fn away(mut self, points: u32) -> Self {
        self.away += points;
        self.push(format!("NYK scores {points}"), Some("NYK"), PlayType::FieldGoal, true)
    }

    /// Both teams score on the same play.
    pub fn both(mut self, home: u32, away: u32) -> Self {
        self.home += home;
        self.away += away;
        self.push("Both teams score".to_string(), None, PlayType::FreeThrow, true)
    }

    /// `n` canonical plays that leave the score alone.
    pub fn idle(mut self, n: usize) -> Self {
        for _ in 0..n {
            self = self.push("Defensive rebound".to_string(), Some("NYK"), PlayType::Rebound, true);
        }
        self
    }

    /// A canonical non-scoring play with a custom description.
    pub fn note(self, description: &str) -> Self {
        self.push(description.to_string(), None, PlayType::Other, true)
    }

    pub fn timeout(self) -> Self {
        self.push("Timeout: BOS".to_string(), Some("BOS"), PlayType::Timeout, true)
    }

    /// A play without a score, filtered out of the canonical stream.
    pub fn unscored(self, description: &str) -> Self {
        self.push(description.to_string(), None, PlayType::Other, false)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn build_stream(&self) -> PlayStream {
        self.build_stream_with(&nba())
    }

    pub fn build_stream_with(&self, sport: &SportConfig) -> PlayStream {
        PlayStream::new(&self.events, sport, &context()).unwrap()
    }

    fn push(
        mut self,
        description: String,
        team: Option<&str>,
        play_type: PlayType,
        scored: bool,
    ) -> Self {
        let index = self.events.len() as u32;
        let mut event = Event::new(index, self.period)
            .with_clock_seconds(self.clock)
            .with_description(description)
            .with_play_type(play_type);
        if scored {
            event = event.with_score(self.home, self.away);
        }
        if let Some(team) = team {
            event = event.with_team(team);
        }
        self.events.push(event);

        self.clock = self.clock.saturating_sub(SECONDS_PER_PLAY);
        if self.clock == 0 {
            self.period += 1;
            self.clock = if self.period > 4 { 300 } else { 720 };
        }
        self
    }
}

/// A full regulation game: two scoring plays per minute with a back-and-forth
/// first half and a home pull-away after halftime.
pub fn full_game() -> ScriptedGame {
    let mut game = ScriptedGame::new();
    for i in 0..72 {
        game = match i % 6 {
            0 | 3 => game.home(2),
            1 | 4 => game.away(2),
            2 => game.away(3),
            _ => game.home(3),
        };
    }
    for i in 0..72 {
        game = match i % 4 {
            0 | 1 => game.home(2),
            2 => game.away(2),
            _ => game.idle(1),
        };
    }
    game
}
