//! Versioned moment snapshots.
//!
//! Persistence itself lives outside this crate; [`SnapshotStore`] is the seam
//! a host implements, and [`InMemorySnapshotStore`] is the reference
//! implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::moment::Moment;
use crate::pipeline::GenerationOutput;

/// One published version of a game's moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentSnapshot {
    pub game_id: String,
    pub version: u32,
    pub content_hash: String,
    pub moments: Vec<Moment>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishOutcome {
    Created { version: u32 },
    /// The active version already has this content hash.
    Unchanged { version: u32 },
}

pub trait SnapshotStore {
    /// Publish a generation result.
    ///
    /// Fails on blocking validation violations. A result whose hash matches
    /// the active version is a no-op; anything else becomes the next version
    /// and the only active one.
    fn publish(&mut self, output: &GenerationOutput) -> Result<PublishOutcome>;

    fn active(&self, game_id: &str) -> Option<&MomentSnapshot>;

    /// Every version for a game, oldest first.
    fn versions(&self, game_id: &str) -> &[MomentSnapshot];
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    games: HashMap<String, Vec<MomentSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn publish(&mut self, output: &GenerationOutput) -> Result<PublishOutcome> {
        output.ensure_persistable()?;

        let versions = self.games.entry(output.game_id.clone()).or_default();
        if let Some(active) = versions.iter().find(|s| s.active) {
            if active.content_hash == output.content_hash {
                debug!(game_id = %output.game_id, version = active.version, "snapshot unchanged");
                return Ok(PublishOutcome::Unchanged {
                    version: active.version,
                });
            }
        }

        for snapshot in versions.iter_mut() {
            snapshot.active = false;
        }
        let version = versions.last().map_or(1, |s| s.version + 1);
        versions.push(MomentSnapshot {
            game_id: output.game_id.clone(),
            version,
            content_hash: output.content_hash.clone(),
            moments: output.moments.clone(),
            active: true,
        });

        info!(game_id = %output.game_id, version, "snapshot published");
        Ok(PublishOutcome::Created { version })
    }

    fn active(&self, game_id: &str) -> Option<&MomentSnapshot> {
        self.games.get(game_id)?.iter().find(|s| s.active)
    }

    fn versions(&self, game_id: &str) -> &[MomentSnapshot] {
        self.games.get(game_id).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::error::PipelineError;
    use crate::pipeline::MomentPipeline;
    use crate::test_support::{context, ScriptedGame};
    use crate::validation::{CheckMode, Violation, ViolationKind};
    use sport_rules::Sport;

    fn generate(game: ScriptedGame) -> GenerationOutput {
        MomentPipeline::new(PipelineConfig::for_sport(Sport::Nba))
            .generate(&game.events(), &context())
            .unwrap()
    }

    #[test]
    fn test_republishing_same_content_is_a_noop() {
        let mut store = InMemorySnapshotStore::new();
        let output = generate(ScriptedGame::new().home(3).away(5).idle(4));

        assert_eq!(store.publish(&output).unwrap(), PublishOutcome::Created { version: 1 });
        assert_eq!(store.publish(&output).unwrap(), PublishOutcome::Unchanged { version: 1 });
        assert_eq!(store.versions("game-0001").len(), 1);
    }

    #[test]
    fn test_new_content_becomes_the_only_active_version() {
        let mut store = InMemorySnapshotStore::new();
        let first = generate(ScriptedGame::new().home(3).away(5).idle(4));
        let second = generate(ScriptedGame::new().home(3).away(5).idle(4).home(6));

        store.publish(&first).unwrap();
        let outcome = store.publish(&second).unwrap();

        assert_eq!(outcome, PublishOutcome::Created { version: 2 });
        let versions = store.versions("game-0001");
        assert_eq!(versions.len(), 2);
        assert!(!versions[0].active);
        assert_eq!(store.active("game-0001").map(|s| s.version), Some(2));
    }

    #[test]
    fn test_blocking_violations_are_refused() {
        let mut store = InMemorySnapshotStore::new();
        let mut output = generate(ScriptedGame::new().home(3).away(5).idle(4));
        output.validation.violations.push(Violation {
            kind: ViolationKind::Coverage,
            mode: CheckMode::Fail,
            moment_ids: Vec::new(),
            play_indices: vec![99],
            detail: "test".to_string(),
        });

        let result = store.publish(&output);

        assert!(matches!(result, Err(PipelineError::ValidationFailed { count: 1 })));
        assert!(store.active("game-0001").is_none());
        assert!(store.versions("unknown").is_empty());
    }
}
