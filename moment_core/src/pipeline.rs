//! The moment pipeline - every pass in order, with one trace of the whole run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sport_rules::{normalize_events, Event, GameContext};
use tracing::{info, warn};

use crate::boundary::{detect_runs, evaluate_run_boundaries, BoundaryDetector};
use crate::coherence::{CoherenceEnforcer, CoherenceResult};
use crate::config::PipelineConfig;
use crate::construction::{run_construction, ConstructionResult};
use crate::error::{PipelineError, Result};
use crate::importance::ImportanceScorer;
use crate::merge::enforce_budget;
use crate::moment::{build_moments, Moment};
use crate::recap::build_recaps;
use crate::selection::{NarrativeSelector, SelectionResult};
use crate::stream::PlayStream;
use crate::trace::GenerationTrace;
use crate::validation::{MomentValidator, ValidationReport};

/// Everything one invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub game_id: String,
    /// The validated narrative list.
    pub moments: Vec<Moment>,
    /// One recap per period, outside the narrative list.
    pub recaps: Vec<Moment>,
    pub trace: GenerationTrace,
    pub construction: ConstructionResult,
    pub selection: SelectionResult,
    pub coherence: CoherenceResult,
    pub validation: ValidationReport,
    /// SHA-256 hex of the serialized moment list.
    pub content_hash: String,
}

impl GenerationOutput {
    /// Refuse output that failed a blocking validation check.
    pub fn ensure_persistable(&self) -> Result<()> {
        let count = self.validation.blocking_count();
        if count > 0 {
            return Err(PipelineError::ValidationFailed { count });
        }
        Ok(())
    }
}

/// SHA-256 hex digest of the serialized moments.
pub fn content_hash(moments: &[Moment]) -> Result<String> {
    let bytes = serde_json::to_vec(moments)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub struct MomentPipeline {
    config: PipelineConfig,
    scorer: ImportanceScorer,
    selector: NarrativeSelector,
    coherence: CoherenceEnforcer,
    validator: MomentValidator,
}

impl MomentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            scorer: ImportanceScorer::new(config.importance.clone()),
            selector: NarrativeSelector::new(config.budget.clone(), config.pacing.clone()),
            coherence: CoherenceEnforcer::new(config.coherence.clone()),
            validator: MomentValidator::new(config.validation.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize raw events first, recording every correction in the trace.
    pub fn generate_raw(
        &self,
        events: Vec<Event>,
        context: &GameContext,
    ) -> Result<GenerationOutput> {
        let normalized = normalize_events(events);
        if !normalized.violations.is_empty() {
            warn!(
                game_id = %context.game_id,
                corrections = normalized.violations.len(),
                "input events needed normalization"
            );
        }
        let mut output = self.generate(&normalized.events, context)?;
        output.trace.data_quality = normalized.violations;
        Ok(output)
    }

    /// Run every pass over already-normalized events.
    pub fn generate(&self, events: &[Event], context: &GameContext) -> Result<GenerationOutput> {
        self.config.validate()?;
        let stream = PlayStream::new(events, &self.config.sport, context)?;
        let mut trace =
            GenerationTrace::new(&context.game_id, self.config.sport.sport, stream.len());

        // Step 1: Boundaries and runs
        let detection = BoundaryDetector::new(&stream, &self.config.boundary).detect();
        let runs = detect_runs(&stream, &self.config.runs);
        let evaluation =
            evaluate_run_boundaries(&stream, &runs, &detection.boundaries, &self.config.runs);

        // Step 2: Build
        let moments = build_moments(&stream, &evaluation.boundaries, &runs);
        trace.record_pass("build", moments.len());

        // Step 3: Merge and budget
        let budgeted = enforce_budget(moments, &stream, &self.config.merge);
        trace.record_pass("budget", budgeted.moments.len());
        trace.merges.extend(budgeted.merges);

        // Step 4: Construction over provisional scores
        let moments = self.scorer.score_all(budgeted.moments, &stream, &runs);
        let (moments, construction) = run_construction(
            moments,
            &stream,
            &detection.density_decisions,
            &runs,
            &self.config.construction,
        );
        trace.record_pass("construction", moments.len());
        trace.merges.extend(construction.merges.iter().cloned());

        // Step 5: Final importance
        let moments = self.scorer.score_all(moments, &stream, &runs);

        // Step 6: Selection
        let (moments, selection) = self.selector.select(moments, &stream);
        trace.record_pass("selection", moments.len());
        trace.merges.extend(selection.merges.iter().cloned());

        // Step 7: Coherence
        let (moments, coherence) = self.coherence.enforce(moments, &stream);
        trace.record_pass("coherence", moments.len());
        trace.merges.extend(coherence.merges.iter().cloned());

        // Step 8: Validation
        let validation = self.validator.validate(&moments, &stream);

        // Step 9: Recaps and hash
        let recaps = build_recaps(&moments, &stream);
        let content_hash = content_hash(&moments)?;

        trace.runs = runs;
        trace.boundaries = evaluation.boundaries;
        trace.hysteresis = detection.hysteresis_decisions;
        trace.density = detection.density_decisions;
        trace.false_drama = detection.false_drama_decisions;
        trace.false_drama.extend(evaluation.false_drama_decisions);
        trace.run_promotions = evaluation.decisions;
        trace.record_moments(&moments);

        info!(
            game_id = %context.game_id,
            plays = stream.len(),
            moments = moments.len(),
            recaps = recaps.len(),
            violations = validation.violations.len(),
            hash = %content_hash,
            "moments generated"
        );

        Ok(GenerationOutput {
            game_id: context.game_id.clone(),
            moments,
            recaps,
            trace,
            construction,
            selection,
            coherence,
            validation,
            content_hash,
        })
    }
}
