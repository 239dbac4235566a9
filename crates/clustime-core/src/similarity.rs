//! Similarity Builder: time-by-time Pearson correlation maps.
//!
//! Two modes. `standard` correlates full signal rows; `window` correlates
//! extended rows, where the extended row for time point `i` is the
//! concatenation of rows `i, i+1, ..., i+window_size-1` (indices clamped to
//! the last row). That anchoring convention is the single deterministic one
//! used everywhere a window is requested.
//!
//! NaN entries (zero-variance rows) are coerced to zero immediately after
//! correlation, by policy, so no later stage sees an undefined value.

use rayon::prelude::*;
use tracing::debug;

use crate::config::CorrelationMode;
use crate::error::{CoreError, CoreResult};
use crate::matrix::SimilarityMatrix;
use crate::signal::SignalMatrix;

/// Pearson correlation between two equally-long feature vectors.
///
/// Returns NaN when either vector has zero variance; callers coerce.
pub fn pearson(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f32;
    let mean_a = a.iter().sum::<f32>() / n;
    let mean_b = b.iter().sum::<f32>() / n;

    let mut covariance = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    covariance / (var_a.sqrt() * var_b.sqrt())
}

/// Build the similarity matrix for the configured correlation mode.
///
/// The output is symmetric, NaN-free, and has the self-correlation on the
/// diagonal (1 for nonzero-variance rows, 0 after coercion otherwise).
///
/// # Errors
///
/// [`CoreError::TooFewTimePoints`] when the signal has fewer than 2 rows.
pub fn build(
    signal: &SignalMatrix,
    mode: CorrelationMode,
    window_size: usize,
) -> CoreResult<SimilarityMatrix> {
    let n = signal.nscans();
    if n < 2 {
        return Err(CoreError::TooFewTimePoints { got: n });
    }

    let matrix = match mode {
        CorrelationMode::Standard => {
            correlate_rows(n, |i| signal.row(i).to_vec())
        }
        CorrelationMode::Window => {
            correlate_rows(n, |i| extended_row(signal, i, window_size))
        }
    };

    debug!(
        nscans = n,
        mode = ?mode,
        window_size,
        "built similarity matrix"
    );
    Ok(matrix)
}

/// Re-apply window smoothing treating an existing similarity matrix as the
/// signal (rows are time points, columns the features). Used by the
/// `window` processing stage so a window-smoothed matrix can be chained
/// after any correlation mode.
pub fn rewindow(matrix: &SimilarityMatrix, window_size: usize) -> CoreResult<SimilarityMatrix> {
    let rows: Vec<Vec<f32>> = matrix.rows().map(<[f32]>::to_vec).collect();
    let signal = SignalMatrix::from_rows(rows)?;
    build(&signal, CorrelationMode::Window, window_size)
}

/// Extended row for windowed correlation: rows `i..i+window_size`, indices
/// clamped to the last time point.
fn extended_row(signal: &SignalMatrix, i: usize, window_size: usize) -> Vec<f32> {
    let n = signal.nscans();
    let mut extended = Vec::with_capacity(signal.nvoxels() * window_size);
    for k in 0..window_size {
        let idx = (i + k).min(n - 1);
        extended.extend_from_slice(signal.row(idx));
    }
    extended
}

/// Correlate every pair of per-time-point vectors. The per-row loop runs on
/// the rayon pool; results are identical to the sequential order because
/// each entry is computed independently and `pearson` is symmetric in its
/// arguments.
fn correlate_rows(n: usize, row_of: impl Fn(usize) -> Vec<f32> + Sync) -> SimilarityMatrix {
    let vectors: Vec<Vec<f32>> = (0..n).map(&row_of).collect();
    let data: Vec<f32> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let vectors = &vectors;
            (0..n).map(move |j| pearson(&vectors[i], &vectors[j]))
        })
        .collect();

    // from_raw cannot fail here: data is exactly n * n by construction
    let mut matrix =
        SimilarityMatrix::from_raw(data, n).unwrap_or_else(|_| SimilarityMatrix::zeros(n));
    matrix.coerce_nan();
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalMatrix;

    fn signal(rows: Vec<Vec<f32>>) -> SignalMatrix {
        SignalMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn pearson_of_identical_rows_is_one() {
        let r = pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_anticorrelated_rows_is_minus_one() {
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_constant_row_is_nan() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn standard_build_is_symmetric_and_finite() {
        let s = signal(vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0], // zero variance
            vec![1.0, 3.0, 2.0],
        ]);
        let m = build(&s, CorrelationMode::Standard, 1).unwrap();
        assert_eq!(m.dim(), 4);
        assert!(m.is_symmetric(1e-6));
        assert!(m.is_finite());
        // zero-variance row correlates to 0 everywhere after coercion
        for j in 0..4 {
            assert_eq!(m.get(2, j), 0.0);
        }
    }

    #[test]
    fn zero_signal_yields_all_zero_matrix() {
        let s = signal(vec![vec![0.0; 5]; 10]);
        let m = build(&s, CorrelationMode::Standard, 1).unwrap();
        assert_eq!(m.dim(), 10);
        for i in 0..10 {
            for j in 0..10 {
                assert_eq!(m.get(i, j), 0.0);
            }
        }
    }

    #[test]
    fn single_time_point_is_rejected() {
        let s = signal(vec![vec![1.0, 2.0]]);
        let err = build(&s, CorrelationMode::Standard, 1).unwrap_err();
        assert!(matches!(err, CoreError::TooFewTimePoints { got: 1 }));
    }

    #[test]
    fn window_of_one_matches_standard() {
        let s = signal(vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 1.0, 0.5],
            vec![0.5, 3.0, 1.0],
        ]);
        let standard = build(&s, CorrelationMode::Standard, 1).unwrap();
        let windowed = build(&s, CorrelationMode::Window, 1).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!((standard.get(i, j) - windowed.get(i, j)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn window_build_is_symmetric_and_finite() {
        let s = signal(vec![
            vec![1.0, 0.0, 2.0],
            vec![0.0, 1.0, 1.0],
            vec![2.0, 2.0, 0.0],
            vec![1.0, 1.0, 1.0],
            vec![0.5, 2.0, 1.5],
        ]);
        let m = build(&s, CorrelationMode::Window, 3).unwrap();
        assert_eq!(m.dim(), 5);
        assert!(m.is_symmetric(1e-6));
        assert!(m.is_finite());
    }

    #[test]
    fn rewindow_keeps_dimension() {
        let s = signal(vec![
            vec![1.0, 2.0],
            vec![2.0, 1.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
        ]);
        let m = build(&s, CorrelationMode::Standard, 1).unwrap();
        let re = rewindow(&m, 2).unwrap();
        assert_eq!(re.dim(), m.dim());
        assert!(re.is_symmetric(1e-6));
        assert!(re.is_finite());
    }
}
