//! The canonical play stream every pass reads from.

use std::ops::Range;

use sport_rules::{
    classify_closing_situation, ClosingClassification, Event, GameContext, LeadState, PlayIndex,
    Score, SportConfig, TeamSide,
};

use crate::error::PipelineError;

/// Canonical plays of one game with their derived lead states.
///
/// Built once per invocation and only read afterwards.
#[derive(Debug, Clone)]
pub struct PlayStream {
    sport: SportConfig,
    context: GameContext,
    plays: Vec<Event>,
    states: Vec<LeadState>,
    progress: Vec<f64>,
    sides: Vec<Option<TeamSide>>,
}

impl PlayStream {
    /// Filter canonical plays and derive their lead states.
    pub fn new(
        events: &[Event],
        sport: &SportConfig,
        context: &GameContext,
    ) -> Result<Self, PipelineError> {
        let plays: Vec<Event> = events.iter().filter(|e| e.is_canonical()).cloned().collect();
        if plays.is_empty() {
            return Err(PipelineError::NoCanonicalPlays);
        }
        if let Some(pair) = plays.windows(2).find(|w| w[1].index <= w[0].index) {
            return Err(PipelineError::UnorderedPlays {
                previous: pair[0].index,
                index: pair[1].index,
            });
        }

        let states = plays
            .iter()
            .map(|play| sport.thresholds.state(play.score().unwrap_or_default()))
            .collect();
        let progress = plays.iter().map(|play| sport.progress(play)).collect();
        let sides = plays
            .iter()
            .map(|play| play.team.as_deref().and_then(|t| context.resolve_side(t)))
            .collect();

        Ok(Self {
            sport: sport.clone(),
            context: context.clone(),
            plays,
            states,
            progress,
            sides,
        })
    }

    pub fn sport(&self) -> &SportConfig {
        &self.sport
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    pub fn plays(&self) -> &[Event] {
        &self.plays
    }

    pub fn play(&self, pos: usize) -> &Event {
        &self.plays[pos]
    }

    pub fn index(&self, pos: usize) -> PlayIndex {
        self.plays[pos].index
    }

    pub fn state(&self, pos: usize) -> LeadState {
        self.states[pos]
    }

    pub fn progress(&self, pos: usize) -> f64 {
        self.progress[pos]
    }

    /// Resolved acting side of a play.
    pub fn side(&self, pos: usize) -> Option<TeamSide> {
        self.sides[pos]
    }

    /// The 0-0 state before the first play.
    pub fn initial_state(&self) -> LeadState {
        self.sport.thresholds.state(Score::default())
    }

    /// State immediately before the play at `pos`.
    pub fn state_before_position(&self, pos: usize) -> LeadState {
        if pos == 0 {
            self.initial_state()
        } else {
            self.states[pos - 1]
        }
    }

    pub fn first_index(&self) -> PlayIndex {
        self.plays[0].index
    }

    pub fn last_index(&self) -> PlayIndex {
        self.plays[self.plays.len() - 1].index
    }

    pub fn final_state(&self) -> LeadState {
        self.states[self.states.len() - 1]
    }

    /// Position of the canonical play with exactly this index.
    pub fn position_of(&self, index: PlayIndex) -> Option<usize> {
        self.plays.binary_search_by_key(&index, |p| p.index).ok()
    }

    /// Positions of canonical plays whose index lies in `[start, end]`.
    pub fn positions(&self, start: PlayIndex, end: PlayIndex) -> Range<usize> {
        let lo = self.plays.partition_point(|p| p.index < start);
        let hi = self.plays.partition_point(|p| p.index <= end);
        lo..hi.max(lo)
    }

    /// State after the last canonical play before `start`.
    pub fn state_before(&self, start: PlayIndex) -> LeadState {
        let lo = self.plays.partition_point(|p| p.index < start);
        self.state_before_position(lo)
    }

    /// State after the last canonical play at or before `end`.
    pub fn state_at_end(&self, end: PlayIndex) -> LeadState {
        let hi = self.plays.partition_point(|p| p.index <= end);
        self.state_before_position(hi)
    }

    pub fn closing(&self, pos: usize) -> ClosingClassification {
        classify_closing_situation(&self.plays[pos], &self.states[pos], &self.sport)
    }

    /// Whether the score changed on this play.
    pub fn is_scoring(&self, pos: usize) -> bool {
        self.state_before_position(pos).score() != self.states[pos].score()
    }

    /// Lead changes and ties reached within a position range.
    pub fn lead_changes(&self, positions: Range<usize>) -> (u32, u32) {
        if positions.is_empty() {
            return (0, 0);
        }
        let mut last_leader = self.state_before_position(positions.start).leader.side();
        let mut previous_tied = self.state_before_position(positions.start).leader.is_tied();
        let mut changes = 0;
        let mut ties = 0;

        for pos in positions {
            let leader = self.states[pos].leader;
            match leader.side() {
                Some(side) => {
                    if last_leader.is_some_and(|last| last != side) {
                        changes += 1;
                    }
                    last_leader = Some(side);
                }
                None => {
                    if !previous_tied {
                        ties += 1;
                    }
                }
            }
            previous_tied = leader.is_tied();
        }

        (changes, ties)
    }

    pub fn has_high_impact(&self, positions: Range<usize>) -> bool {
        positions.into_iter().any(|pos| self.plays[pos].has_high_impact_marker())
    }
}
