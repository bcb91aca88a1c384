//! Game clock - progress through regulation, game phases and clock parsing.

mod closing;

pub use closing::*;

use serde::{Deserialize, Serialize};

use crate::config::SportConfig;
use crate::events::Event;

/// Progress at which the opening phase ends.
pub const OPENING_PHASE_END: f64 = 0.25;

/// Progress at which the closing phase begins.
pub const CLOSING_PHASE_START: f64 = 0.75;

/// Coarse narrative phase of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Opening,
    Middle,
    Closing,
}

impl GamePhase {
    /// Phase for a regulation progress value; overtime is always closing.
    pub fn from_progress(progress: f64, overtime: bool) -> Self {
        if overtime || progress >= CLOSING_PHASE_START {
            GamePhase::Closing
        } else if progress < OPENING_PHASE_END {
            GamePhase::Opening
        } else {
            GamePhase::Middle
        }
    }
}

/// Parse a feed clock into seconds remaining.
///
/// Accepts `MM:SS`, `MM:SS.f`, `SS.f` and ISO-8601 `PT#M#S` forms.
pub fn parse_clock(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(iso) = raw.strip_prefix("PT") {
        let iso = iso.strip_suffix('S')?;
        let (minutes, seconds) = match iso.split_once('M') {
            Some((m, s)) => (m.parse::<u32>().ok()?, s),
            None => (0, iso),
        };
        let seconds = if seconds.is_empty() {
            0.0
        } else {
            seconds.parse::<f64>().ok()?
        };
        return whole_seconds(f64::from(minutes) * 60.0 + seconds);
    }

    match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = minutes.parse::<u32>().ok()?;
            let seconds = seconds.parse::<f64>().ok()?;
            if seconds >= 60.0 {
                return None;
            }
            whole_seconds(f64::from(minutes) * 60.0 + seconds)
        }
        None => whole_seconds(raw.parse::<f64>().ok()?),
    }
}

fn whole_seconds(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 {
        Some(value.floor() as u32)
    } else {
        None
    }
}

impl SportConfig {
    /// Total regulation length in seconds.
    pub fn regulation_seconds(&self) -> u32 {
        u32::from(self.regulation_periods) * self.period_seconds
    }

    pub fn is_overtime(&self, period: u8) -> bool {
        period > self.regulation_periods
    }

    /// Length of a given period in seconds.
    pub fn period_length(&self, period: u8) -> u32 {
        if self.is_overtime(period) {
            self.overtime_seconds
        } else {
            self.period_seconds
        }
    }

    /// Seconds left in the event's period; a missing clock means the period just began.
    pub fn seconds_remaining_in_period(&self, event: &Event) -> u32 {
        let length = self.period_length(event.period);
        event.clock_seconds.unwrap_or(length).min(length)
    }

    /// Seconds of game time elapsed at the event.
    pub fn elapsed_seconds(&self, event: &Event) -> u32 {
        let period = event.period.max(1);
        let into_period = self.period_length(period) - self.seconds_remaining_in_period(event);

        if self.is_overtime(period) {
            let completed_ot = u32::from(period - self.regulation_periods - 1);
            self.regulation_seconds() + completed_ot * self.overtime_seconds + into_period
        } else {
            u32::from(period - 1) * self.period_seconds + into_period
        }
    }

    /// Fraction of regulation elapsed, in `[0, 1]`. Overtime reports 1.0.
    pub fn progress(&self, event: &Event) -> f64 {
        let regulation = self.regulation_seconds();
        if regulation == 0 {
            return 0.0;
        }
        let elapsed = self.elapsed_seconds(event).min(regulation);
        f64::from(elapsed) / f64::from(regulation)
    }

    pub fn phase(&self, event: &Event) -> GamePhase {
        GamePhase::from_progress(self.progress(event), self.is_overtime(event.period))
    }

    /// Final regulation period or overtime, inside the closing window.
    pub fn is_final_phase(&self, event: &Event) -> bool {
        let late_period = event.period >= self.regulation_periods;
        late_period && self.seconds_remaining_in_period(event) <= self.closing.window_seconds
    }
}
