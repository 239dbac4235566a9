//! Pipeline orchestration: signal → similarity → preprocessing →
//! clustering → labels.
//!
//! Data flows strictly forward; no stage re-enters an earlier one. The run
//! either completes with a [`PipelineOutput`] or aborts on the first error
//! with no partial labels. The in-flight similarity matrix is owned by
//! whichever stage currently holds it; the original is cloned before
//! clustering so reporting can show it next to the binarized view.

use tracing::info;

use crate::clustering::{self, ClusterResult};
use crate::config::ClustimeConfig;
use crate::error::{CoreError, CoreResult};
use crate::matrix::SimilarityMatrix;
use crate::processing;
use crate::signal::{SignalMatrix, TaskTimings};
use crate::similarity;

/// Terminal artifacts of one run, handed to the boundary reporting step.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// One cluster/community id per entry of `indexes`, in the same order.
    pub labels: Vec<i64>,
    /// Original time points still represented after preprocessing.
    pub indexes: Vec<usize>,
    /// The similarity matrix the clustering consumed (post-preprocessing).
    pub similarity: SimilarityMatrix,
    /// Binarized adjacency, present only for the community-detection family;
    /// reporting plots it against `similarity`.
    pub binarized: Option<SimilarityMatrix>,
    /// Total time points in the input signal, before any reduction.
    pub nscans: usize,
    /// Timing annotations for reporting; numeric results never depend on it.
    pub timings: TaskTimings,
    /// Echo of the configuration flag requesting spatial-map export.
    pub save_maps: bool,
}

/// Run the whole pipeline.
///
/// Validates the configuration first, so parameter errors abort before any
/// computation.
///
/// # Errors
///
/// Configuration errors, too-few-time-points, or (invariant violations)
/// shape mismatches between stages.
pub fn run(
    signal: SignalMatrix,
    config: &ClustimeConfig,
    timings: TaskTimings,
) -> CoreResult<PipelineOutput> {
    config.validate()?;

    let nscans = signal.nscans();
    info!(
        nscans,
        nvoxels = signal.nvoxels(),
        algorithm = %config.algorithm,
        "starting pipeline run"
    );

    let signal = signal.filtered(config.component);
    let corr_map = similarity::build(&signal, config.correlation, config.window_size)?;

    let (corr_map, indexes) = processing::preprocess(corr_map, config)?;
    if corr_map.dim() != indexes.len() {
        return Err(CoreError::ShapeMismatch {
            what: "similarity matrix vs indexes",
            expected: indexes.len(),
            actual: corr_map.dim(),
        });
    }

    let result = clustering::cluster(&corr_map, &indexes, config)?;
    let (labels, binarized) = match result {
        ClusterResult::Labels(labels) => (labels, None),
        ClusterResult::LabelsWithAdjacency { labels, binarized } => (labels, Some(binarized)),
    };

    info!(
        labels = labels.len(),
        clusters = distinct(&labels),
        "pipeline run complete"
    );

    Ok(PipelineOutput {
        labels,
        indexes,
        similarity: corr_map,
        binarized,
        nscans,
        timings,
        save_maps: config.save_maps,
    })
}

fn distinct(labels: &[i64]) -> usize {
    let mut seen: Vec<i64> = labels.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}
