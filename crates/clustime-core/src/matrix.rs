//! Square symmetric similarity matrix over time points.
//!
//! Row-major `Vec<f32>` storage. The matrix is mutated in place only within
//! one pipeline stage's scope, then handed forward immutably; a stage that
//! needs the pre-transform values takes an explicit clone first.

use crate::error::{ConfigError, CoreError, CoreResult};

/// Pairwise affinity between time points: square, symmetric by construction,
/// NaN entries coerced to zero at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    data: Vec<f32>,
    n: usize,
}

impl SimilarityMatrix {
    /// All-zero matrix of dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![0.0; n * n],
            n,
        }
    }

    /// Build from row-major data. Length must be `n * n`.
    ///
    /// # Errors
    ///
    /// [`CoreError::ShapeMismatch`] when the buffer length disagrees with `n`.
    pub fn from_raw(data: Vec<f32>, n: usize) -> CoreResult<Self> {
        if data.len() != n * n {
            return Err(CoreError::ShapeMismatch {
                what: "matrix buffer vs dimension",
                expected: n * n,
                actual: data.len(),
            });
        }
        Ok(Self { data, n })
    }

    /// Matrix dimension (number of retained time points).
    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Entry at `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Set `(i, j)` and `(j, i)` to `value`, preserving symmetry.
    #[inline]
    pub fn set_symmetric(&mut self, i: usize, j: usize, value: f32) {
        self.data[i * self.n + j] = value;
        self.data[j * self.n + i] = value;
    }

    /// Row `i` as a slice; the partition-family algorithms treat rows as
    /// feature vectors.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Iterate all rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.n)
    }

    /// Replace every NaN entry with zero. The builder applies this
    /// immediately after correlation, so zero-variance rows never propagate
    /// NaN into later stages.
    pub fn coerce_nan(&mut self) {
        for value in &mut self.data {
            if value.is_nan() {
                *value = 0.0;
            }
        }
    }

    /// True when no entry is NaN.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| !v.is_nan())
    }

    /// True when `|m[i,j] - m[j,i]| <= tol` for all pairs.
    pub fn is_symmetric(&self, tol: f32) -> bool {
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for value in &mut self.data {
            *value *= factor;
        }
    }

    /// Percentile of the off-diagonal values, linear interpolation between
    /// ranks. Recomputed per call since the cut depends on the data
    /// distribution.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ThresholdOutOfRange`] when `p` leaves `[0, 100]`, or
    /// an invalid-parameter error when the matrix has no off-diagonal
    /// entries (dimension < 2).
    pub fn off_diagonal_percentile(&self, p: f32) -> CoreResult<f32> {
        if !(0.0..=100.0).contains(&p) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "percentile",
                value: p,
            }
            .into());
        }
        let mut values: Vec<f32> = Vec::with_capacity(self.n * self.n.saturating_sub(1));
        for i in 0..self.n {
            for j in 0..self.n {
                if i != j {
                    values.push(self.get(i, j));
                }
            }
        }
        if values.is_empty() {
            return Err(ConfigError::invalid(
                "percentile",
                format!(
                    "matrix of dimension {} has no off-diagonal entries",
                    self.n
                ),
            )
            .into());
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let rank = p as f64 / 100.0 * (values.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = (rank - lo as f64) as f32;
        Ok(values[lo] + (values[hi] - values[lo]) * frac)
    }

    /// Binary copy: entries at or above `cut` become 1, below become 0.
    /// Symmetry is preserved. Rerunning with the same cut is idempotent.
    #[must_use]
    pub fn binarized(&self, cut: f32) -> Self {
        let data = self
            .data
            .iter()
            .map(|&v| if v >= cut { 1.0 } else { 0.0 })
            .collect();
        Self { data, n: self.n }
    }

    /// Sub-matrix restricted to `indexes` (rows and columns), in the given
    /// order.
    #[must_use]
    pub fn select(&self, indexes: &[usize]) -> Self {
        let m = indexes.len();
        let mut data = Vec::with_capacity(m * m);
        for &i in indexes {
            for &j in indexes {
                data.push(self.get(i, j));
            }
        }
        Self { data, n: m }
    }

    /// Root-sum-of-squares of each row: the per-time-point energy signal
    /// used for peak selection.
    pub fn row_rss(&self) -> Vec<f32> {
        self.rows()
            .map(|row| row.iter().map(|v| v * v).sum::<f32>().sqrt())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_3x3() -> SimilarityMatrix {
        // symmetric, diagonal 1
        SimilarityMatrix::from_raw(
            vec![1.0, 0.5, 0.2, 0.5, 1.0, 0.8, 0.2, 0.8, 1.0],
            3,
        )
        .unwrap()
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = SimilarityMatrix::from_raw(vec![0.0; 5], 3);
        assert!(matches!(result, Err(CoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn coerce_nan_zeroes_undefined_entries() {
        let mut m = SimilarityMatrix::from_raw(vec![f32::NAN; 4], 2).unwrap();
        assert!(!m.is_finite());
        m.coerce_nan();
        assert!(m.is_finite());
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn percentile_interpolates_off_diagonal_values() {
        let m = matrix_3x3();
        // off-diagonal values: [0.2, 0.2, 0.5, 0.5, 0.8, 0.8]
        let p0 = m.off_diagonal_percentile(0.0).unwrap();
        let p100 = m.off_diagonal_percentile(100.0).unwrap();
        let p50 = m.off_diagonal_percentile(50.0).unwrap();
        assert!((p0 - 0.2).abs() < 1e-6);
        assert!((p100 - 0.8).abs() < 1e-6);
        assert!((p50 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn percentile_out_of_range_is_rejected() {
        let m = matrix_3x3();
        assert!(m.off_diagonal_percentile(150.0).is_err());
        assert!(m.off_diagonal_percentile(-0.1).is_err());
    }

    #[test]
    fn binarize_is_idempotent_and_symmetric() {
        let m = matrix_3x3();
        let b1 = m.binarized(0.5);
        let b2 = b1.binarized(0.5);
        assert_eq!(b1, b2);
        assert!(b1.is_symmetric(0.0));
        assert_eq!(b1.get(0, 1), 1.0); // 0.5 >= 0.5
        assert_eq!(b1.get(0, 2), 0.0); // 0.2 < 0.5
    }

    #[test]
    fn binarize_count_is_monotonic_in_percentile() {
        let m = matrix_3x3();
        let count_ones = |p: f32| {
            let cut = m.off_diagonal_percentile(p).unwrap();
            let b = m.binarized(cut);
            (0..3)
                .flat_map(|i| (0..3).map(move |j| (i, j)))
                .filter(|&(i, j)| i != j && b.get(i, j) == 1.0)
                .count()
        };
        let mut previous = usize::MAX;
        for p in [0.0, 25.0, 50.0, 75.0, 100.0] {
            let count = count_ones(p);
            assert!(count <= previous, "higher percentile must not add ones");
            previous = count;
        }
    }

    #[test]
    fn select_preserves_order_and_values() {
        let m = matrix_3x3();
        let sub = m.select(&[0, 2]);
        assert_eq!(sub.dim(), 2);
        assert_eq!(sub.get(0, 0), 1.0);
        assert_eq!(sub.get(0, 1), 0.2);
        assert_eq!(sub.get(1, 0), 0.2);
    }

    #[test]
    fn row_rss_matches_manual_energy() {
        let m = SimilarityMatrix::from_raw(vec![3.0, 4.0, 4.0, 0.0], 2).unwrap();
        let rss = m.row_rss();
        assert!((rss[0] - 5.0).abs() < 1e-6);
        assert!((rss[1] - 4.0).abs() < 1e-6);
    }
}
