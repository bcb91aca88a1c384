//! Structural validation of the final moment list.
//!
//! Violations are reported, never repaired. Each check is independently
//! either blocking ([`CheckMode::Fail`]) or advisory ([`CheckMode::Log`]).

use serde::{Deserialize, Serialize};
use sport_rules::PlayIndex;
use tracing::{info, warn};

use crate::moment::{Moment, MomentId};
use crate::stream::PlayStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    Fail,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub chronology: CheckMode,
    pub overlap: CheckMode,
    pub coverage: CheckMode,
    pub continuity: CheckMode,
}

impl ValidationConfig {
    /// Every check blocks.
    pub fn strict() -> Self {
        Self::uniform(CheckMode::Fail)
    }

    /// Every check only logs.
    pub fn permissive() -> Self {
        Self::uniform(CheckMode::Log)
    }

    fn uniform(mode: CheckMode) -> Self {
        Self {
            chronology: mode,
            overlap: mode,
            coverage: mode,
            continuity: mode,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Chronology,
    Overlap,
    Coverage,
    Continuity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub mode: CheckMode,
    pub moment_ids: Vec<MomentId>,
    pub play_indices: Vec<PlayIndex>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked_moments: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn blocking_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.mode == CheckMode::Fail)
            .count()
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking_count() > 0
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct MomentValidator {
    config: ValidationConfig,
}

impl MomentValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn strict() -> Self {
        Self::new(ValidationConfig::strict())
    }

    /// Run all four checks.
    pub fn validate(&self, moments: &[Moment], stream: &PlayStream) -> ValidationReport {
        let mut violations = Vec::new();
        self.check_chronology(moments, &mut violations);
        self.check_overlap(moments, &mut violations);
        self.check_coverage(moments, stream, &mut violations);
        self.check_continuity(moments, &mut violations);

        for violation in violations.iter().filter(|v| v.mode == CheckMode::Log) {
            warn!(kind = ?violation.kind, detail = %violation.detail, "validation violation");
        }
        let report = ValidationReport {
            checked_moments: moments.len(),
            violations,
        };
        info!(
            moments = report.checked_moments,
            violations = report.violations.len(),
            blocking = report.blocking_count(),
            "validation complete"
        );
        report
    }

    fn check_chronology(&self, moments: &[Moment], out: &mut Vec<Violation>) {
        for pair in moments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.start_play <= a.start_play {
                out.push(Violation {
                    kind: ViolationKind::Chronology,
                    mode: self.config.chronology,
                    moment_ids: vec![a.id, b.id],
                    play_indices: vec![a.start_play, b.start_play],
                    detail: format!(
                        "start {} does not follow start {}",
                        b.start_play, a.start_play
                    ),
                });
            }
        }
        for moment in moments.iter().filter(|m| m.end_play < m.start_play) {
            out.push(Violation {
                kind: ViolationKind::Chronology,
                mode: self.config.chronology,
                moment_ids: vec![moment.id],
                play_indices: vec![moment.start_play, moment.end_play],
                detail: format!("range {}..={} is inverted", moment.start_play, moment.end_play),
            });
        }
    }

    fn check_overlap(&self, moments: &[Moment], out: &mut Vec<Violation>) {
        for pair in moments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.start_play <= a.end_play && a.start_play <= b.end_play {
                out.push(Violation {
                    kind: ViolationKind::Overlap,
                    mode: self.config.overlap,
                    moment_ids: vec![a.id, b.id],
                    play_indices: vec![b.start_play, a.end_play],
                    detail: format!(
                        "{}..={} overlaps {}..={}",
                        a.start_play, a.end_play, b.start_play, b.end_play
                    ),
                });
            }
        }
    }

    fn check_coverage(&self, moments: &[Moment], stream: &PlayStream, out: &mut Vec<Violation>) {
        let uncovered: Vec<PlayIndex> = stream
            .plays()
            .iter()
            .map(|play| play.index)
            .filter(|&index| !moments.iter().any(|m| m.contains(index)))
            .collect();
        if !uncovered.is_empty() {
            out.push(Violation {
                kind: ViolationKind::Coverage,
                mode: self.config.coverage,
                moment_ids: Vec::new(),
                detail: format!("{} canonical play(s) not covered", uncovered.len()),
                play_indices: uncovered,
            });
        }
    }

    fn check_continuity(&self, moments: &[Moment], out: &mut Vec<Violation>) {
        for pair in moments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.score_after != b.score_before {
                out.push(Violation {
                    kind: ViolationKind::Continuity,
                    mode: self.config.continuity,
                    moment_ids: vec![a.id, b.id],
                    play_indices: vec![a.end_play, b.start_play],
                    detail: format!("score {} then {}", a.score_after, b.score_before),
                });
            }
        }
    }
}
