//! Matrix Preprocessor: the optional transform stage between correlation and
//! clustering.
//!
//! Exactly one [`ProcessingMode`] is active per run. `Double` and `Thr`
//! reshape values only; `Rss` is a genuine dimensionality reduction that
//! narrows the index set to peak neighbourhoods; `Window` re-applies the
//! builder's window smoothing on top of the processed matrix so modes can be
//! chained across the two stages.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::{ClustimeConfig, ProcessingMode};
use crate::error::{ConfigError, CoreResult};
use crate::matrix::SimilarityMatrix;
use crate::similarity;

/// Apply the configured processing mode.
///
/// Returns the transformed matrix and the index set of original time points
/// still represented by its rows/columns. All modes except `Rss` return the
/// full range `[0, n)`; `Rss` returns a strictly ascending subset.
///
/// # Errors
///
/// Configuration errors for an out-of-range `thr`; shape errors cannot occur
/// for a well-formed input matrix.
pub fn preprocess(
    matrix: SimilarityMatrix,
    config: &ClustimeConfig,
) -> CoreResult<(SimilarityMatrix, Vec<usize>)> {
    let n = matrix.dim();
    let full_range: Vec<usize> = (0..n).collect();

    match config.processing {
        ProcessingMode::None => Ok((matrix, full_range)),
        ProcessingMode::Double => {
            let mut matrix = matrix;
            matrix.scale(config.contrast);
            debug!(contrast = config.contrast, "rescaled similarity matrix");
            Ok((matrix, full_range))
        }
        ProcessingMode::Thr => {
            if !(0.0..=100.0).contains(&config.thr) {
                return Err(ConfigError::ThresholdOutOfRange {
                    name: "thr",
                    value: config.thr,
                }
                .into());
            }
            let cut = matrix.off_diagonal_percentile(config.thr)?;
            let binary = matrix.binarized(cut);
            debug!(thr = config.thr, cut, "binarized similarity matrix");
            Ok((binary, full_range))
        }
        ProcessingMode::Rss => {
            let (reduced, indexes) = rss_reduce(&matrix, config.near);
            info!(
                retained = indexes.len(),
                out_of = n,
                near = config.near,
                "RSS peak selection reduced the index set"
            );
            Ok((reduced, indexes))
        }
        ProcessingMode::Window => {
            let smoothed = similarity::rewindow(&matrix, config.window_size)?;
            debug!(window_size = config.window_size, "re-windowed matrix");
            Ok((smoothed, full_range))
        }
    }
}

/// Root-sum-of-squares peak selection.
///
/// The per-time-point energy is the RSS of each matrix row. A time point is
/// a peak when its energy is strictly greater than every earlier point and
/// at least as great as every later point within `near` positions (ties
/// resolve to the leftmost of a plateau). The retained set is the union of
/// `peak ± near` ranges, ascending.
fn rss_reduce(matrix: &SimilarityMatrix, near: usize) -> (SimilarityMatrix, Vec<usize>) {
    let rss = matrix.row_rss();
    let n = rss.len();

    let mut retained = BTreeSet::new();
    for i in 0..n {
        if is_peak(&rss, i, near) {
            let lo = i.saturating_sub(near);
            let hi = (i + near).min(n - 1);
            retained.extend(lo..=hi);
        }
    }

    let indexes: Vec<usize> = retained.into_iter().collect();
    (matrix.select(&indexes), indexes)
}

fn is_peak(rss: &[f32], i: usize, near: usize) -> bool {
    let lo = i.saturating_sub(near);
    let hi = (i + near).min(rss.len() - 1);
    for j in lo..=hi {
        if j < i && rss[j] >= rss[i] {
            return false;
        }
        if j > i && rss[j] > rss[i] {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClustimeConfig;

    /// Symmetric matrix whose row energies rise to a single peak.
    fn peaked_matrix(n: usize, peak: usize) -> SimilarityMatrix {
        let mut m = SimilarityMatrix::zeros(n);
        for i in 0..n {
            // diagonal value grows towards the peak and falls after it
            let height = 1.0 + n as f32 - (i as f32 - peak as f32).abs();
            m.set_symmetric(i, i, height);
        }
        m
    }

    #[test]
    fn none_mode_passes_through() {
        let m = peaked_matrix(6, 3);
        let config = ClustimeConfig::default();
        let (out, indexes) = preprocess(m.clone(), &config).unwrap();
        assert_eq!(out, m);
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn double_mode_scales_by_contrast() {
        let m = peaked_matrix(4, 2);
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Double)
            .with_contrast(2.0);
        let (out, indexes) = preprocess(m.clone(), &config).unwrap();
        assert_eq!(indexes.len(), 4);
        for i in 0..4 {
            assert!((out.get(i, i) - 2.0 * m.get(i, i)).abs() < 1e-6);
        }
    }

    #[test]
    fn thr_mode_binarizes_symmetrically() {
        let m = SimilarityMatrix::from_raw(
            vec![1.0, 0.9, 0.1, 0.9, 1.0, 0.5, 0.1, 0.5, 1.0],
            3,
        )
        .unwrap();
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Thr)
            .with_thr(50.0);
        let (out, indexes) = preprocess(m, &config).unwrap();
        assert_eq!(indexes.len(), 3);
        assert!(out.is_symmetric(0.0));
        for i in 0..3 {
            for j in 0..3 {
                let v = out.get(i, j);
                assert!(v == 0.0 || v == 1.0);
            }
        }
    }

    #[test]
    fn thr_out_of_range_fails_before_compute() {
        let m = peaked_matrix(4, 1);
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Thr)
            .with_thr(150.0);
        assert!(preprocess(m, &config).is_err());
    }

    #[test]
    fn rss_single_peak_keeps_peak_and_neighbours() {
        let m = peaked_matrix(10, 5);
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Rss)
            .with_near(1);
        let (out, indexes) = preprocess(m, &config).unwrap();
        assert_eq!(indexes, vec![4, 5, 6]);
        assert_eq!(out.dim(), 3);
    }

    #[test]
    fn rss_indexes_are_strictly_ascending_subset() {
        let mut m = SimilarityMatrix::zeros(12);
        for i in 0..12 {
            let height = ((i * 7) % 5) as f32 + 1.0;
            m.set_symmetric(i, i, height);
        }
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Rss)
            .with_near(2);
        let (out, indexes) = preprocess(m, &config).unwrap();
        assert!(indexes.windows(2).all(|w| w[0] < w[1]));
        assert!(indexes.iter().all(|&i| i < 12));
        assert_eq!(out.dim(), indexes.len());
    }

    #[test]
    fn rss_plateau_resolves_to_leftmost_peak() {
        let mut m = SimilarityMatrix::zeros(5);
        for (i, h) in [1.0, 3.0, 3.0, 1.0, 0.5].iter().enumerate() {
            m.set_symmetric(i, i, *h);
        }
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Rss)
            .with_near(1);
        let (_, indexes) = preprocess(m, &config).unwrap();
        // index 1 is the peak of the plateau; index 2 only survives as its neighbour
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn window_mode_keeps_dimension_and_symmetry() {
        let m = peaked_matrix(6, 2);
        let config = ClustimeConfig::default()
            .with_processing(ProcessingMode::Window)
            .with_window_size(2);
        let (out, indexes) = preprocess(m, &config).unwrap();
        assert_eq!(out.dim(), 6);
        assert_eq!(indexes.len(), 6);
        assert!(out.is_symmetric(1e-6));
        assert!(out.is_finite());
    }
}
