//! Construction - reshaping the budgeted moment list before selection.
//!
//! The passes run in a fixed order:
//! 1. **Chapters**: early back-and-forth stretches collapse into one moment
//! 2. **Quotas**: every period is compressed to its dynamic quota
//! 3. **Closing**: a close finish is expanded, a decided one compressed
//! 4. **Splitting**: mega-moments are cut at their strongest cues

mod chapters;
mod closing;
mod quotas;
mod splitting;

pub use chapters::*;
pub use closing::*;
pub use quotas::*;
pub use splitting::*;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundary::{DensityDecision, DetectedRun};
use crate::merge::MergeRecord;
use crate::moment::Moment;
use crate::stream::PlayStream;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    pub chapters: ChapterConfig,
    pub quotas: QuotaConfig,
    pub closing: ClosingConfig,
    pub splits: SplitConfig,
}

/// Everything the construction passes decided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructionResult {
    pub chapters: Vec<ChapterRecord>,
    pub quotas: Vec<QuotaRecord>,
    pub closing: Option<ClosingRecord>,
    pub splits: Vec<SplitRecord>,
    pub merges: Vec<MergeRecord>,
}

/// Run all construction passes in order.
pub fn run_construction(
    moments: Vec<Moment>,
    stream: &PlayStream,
    density: &[DensityDecision],
    runs: &[DetectedRun],
    config: &ConstructionConfig,
) -> (Vec<Moment>, ConstructionResult) {
    let before = moments.len();
    let mut result = ConstructionResult::default();

    // Step 1: Chapters
    let (moments, chapters) = form_chapters(moments, stream, &config.chapters);
    result.chapters = chapters;

    // Step 2: Quotas
    let (moments, quotas, merges) = apply_quotas(moments, stream, &config.quotas);
    result.quotas = quotas;
    result.merges.extend(merges);

    // Step 3: Closing window
    let (moments, closing, merges) = apply_closing(moments, stream, density, &config.closing);
    result.closing = closing;
    result.merges.extend(merges);

    // Step 4: Mega-moment splits
    let (moments, splits, merges) = split_mega_moments(moments, stream, runs, &config.splits);
    result.splits = splits;
    result.merges.extend(merges);

    info!(
        before,
        after = moments.len(),
        chapters = result.chapters.len(),
        splits = result.splits.len(),
        merges = result.merges.len(),
        "construction complete"
    );
    (moments, result)
}
