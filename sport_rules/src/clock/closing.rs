//! Closing-situation classification.
//!
//! Every consumer that needs to know whether the end of a game is tight or
//! already decided goes through [`classify_closing_situation`], so boundary
//! detection, run promotion and closing expansion can never disagree.

use serde::{Deserialize, Serialize};

use crate::config::SportConfig;
use crate::events::Event;
use crate::ladder::LeadState;

/// Late-game situation at a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingSituation {
    NotClosing,
    CloseGameClosing,
    DecidedGameClosing,
}

impl ClosingSituation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosingSituation::NotClosing => "NOT_CLOSING",
            ClosingSituation::CloseGameClosing => "CLOSE_GAME_CLOSING",
            ClosingSituation::DecidedGameClosing => "DECIDED_GAME_CLOSING",
        }
    }
}

/// Result of classifying one play, with the inputs that drove it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosingClassification {
    pub situation: ClosingSituation,
    pub in_final_phase: bool,
    pub seconds_remaining: u32,
    pub margin: u32,
    pub tier: u8,
}

impl ClosingClassification {
    pub fn is_close(&self) -> bool {
        self.situation == ClosingSituation::CloseGameClosing
    }

    pub fn is_decided(&self) -> bool {
        self.situation == ClosingSituation::DecidedGameClosing
    }
}

/// Classify the closing situation at `event` given its lead state.
pub fn classify_closing_situation(
    event: &Event,
    state: &LeadState,
    config: &SportConfig,
) -> ClosingClassification {
    let in_final_phase = config.is_final_phase(event);
    let rules = &config.closing;

    let situation = if !in_final_phase {
        ClosingSituation::NotClosing
    } else if state.margin >= rules.decided_margin && state.tier >= rules.decided_tier {
        ClosingSituation::DecidedGameClosing
    } else if state.tier <= rules.close_tier {
        ClosingSituation::CloseGameClosing
    } else {
        ClosingSituation::NotClosing
    };

    ClosingClassification {
        situation,
        in_final_phase,
        seconds_remaining: config.seconds_remaining_in_period(event),
        margin: state.margin,
        tier: state.tier,
    }
}
