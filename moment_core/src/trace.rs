//! Generation trace - every decision a run made, in one serializable record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sport_rules::{DataQualityViolation, PlayIndex, Sport};

use crate::boundary::{
    BoundaryEvent, DensityDecision, DetectedRun, FalseDramaDecision, HysteresisDecision,
    RunPromotionDecision,
};
use crate::kind::MomentType;
use crate::merge::MergeRecord;
use crate::moment::{Moment, MomentId};

/// Moment count after one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassCount {
    pub pass: String,
    pub moments: usize,
}

/// Final explanation for one emitted moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentTrace {
    pub id: MomentId,
    pub moment_type: MomentType,
    pub start_play: PlayIndex,
    pub end_play: PlayIndex,
    pub trigger: String,
    pub narrative_delta: String,
    pub importance: f64,
    pub factors: BTreeMap<String, f64>,
    /// Ids of every moment merged into this one.
    pub absorbed: Vec<MomentId>,
}

impl MomentTrace {
    pub fn from_moment(moment: &Moment) -> Self {
        Self {
            id: moment.id,
            moment_type: moment.moment_type,
            start_play: moment.start_play,
            end_play: moment.end_play,
            trigger: moment.reason.trigger.clone(),
            narrative_delta: moment.reason.narrative_delta.clone(),
            importance: moment.importance,
            factors: moment.importance_factors.clone(),
            absorbed: moment.absorbed.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTrace {
    pub game_id: String,
    pub sport: Sport,
    pub canonical_plays: usize,
    pub data_quality: Vec<DataQualityViolation>,
    pub runs: Vec<DetectedRun>,
    pub boundaries: Vec<BoundaryEvent>,
    pub hysteresis: Vec<HysteresisDecision>,
    pub density: Vec<DensityDecision>,
    pub false_drama: Vec<FalseDramaDecision>,
    pub run_promotions: Vec<RunPromotionDecision>,
    pub passes: Vec<PassCount>,
    /// Every merge in pipeline order.
    pub merges: Vec<MergeRecord>,
    pub moments: Vec<MomentTrace>,
}

impl GenerationTrace {
    pub fn new(game_id: impl Into<String>, sport: Sport, canonical_plays: usize) -> Self {
        Self {
            game_id: game_id.into(),
            sport,
            canonical_plays,
            data_quality: Vec::new(),
            runs: Vec::new(),
            boundaries: Vec::new(),
            hysteresis: Vec::new(),
            density: Vec::new(),
            false_drama: Vec::new(),
            run_promotions: Vec::new(),
            passes: Vec::new(),
            merges: Vec::new(),
            moments: Vec::new(),
        }
    }

    pub fn record_pass(&mut self, pass: &str, moments: usize) {
        self.passes.push(PassCount {
            pass: pass.to_string(),
            moments,
        });
    }

    pub fn record_moments(&mut self, moments: &[Moment]) {
        self.moments = moments.iter().map(MomentTrace::from_moment).collect();
    }

    /// Merge records where `id` absorbed or was absorbed.
    pub fn lineage(&self, id: MomentId) -> Vec<&MergeRecord> {
        self.merges.iter().filter(|m| m.into == id || m.absorbed == id).collect()
    }
}
