//! Mean-shift mode seeking over similarity-matrix rows.
//!
//! Flat kernel: each point iteratively moves to the mean of the rows within
//! `bandwidth` of it until the shift stalls, then nearby modes merge. The
//! bandwidth is estimated from the pairwise distance distribution, as the
//! usual estimator does when none is supplied.

use tracing::debug;

use crate::error::CoreResult;
use crate::matrix::SimilarityMatrix;

use super::metrics::euclidean;

const MAX_ITERATIONS: usize = 300;
const BANDWIDTH_QUANTILE: f64 = 0.3;

/// Cluster matrix rows by mode seeking. Every point receives the label of
/// the mode it converged to; modes closer than half a bandwidth merge.
pub fn cluster(matrix: &SimilarityMatrix) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();
    let rows: Vec<&[f32]> = (0..n).map(|i| matrix.row(i)).collect();

    let bandwidth = estimate_bandwidth(&rows);
    if bandwidth == 0.0 {
        // all points coincide
        return Ok(vec![0; n]);
    }
    debug!(bandwidth, "estimated mean-shift bandwidth");

    let tolerance = bandwidth * 1e-3;
    let mut modes: Vec<Vec<f32>> = Vec::new();
    let mut labels = vec![0i64; n];

    for i in 0..n {
        let mut current = rows[i].to_vec();
        for _ in 0..MAX_ITERATIONS {
            let shifted = flat_kernel_mean(&rows, &current, bandwidth);
            let moved = euclidean(&shifted, &current);
            current = shifted;
            if moved < tolerance {
                break;
            }
        }
        labels[i] = assign_mode(&mut modes, current, bandwidth) as i64;
    }

    Ok(labels)
}

/// Quantile of the pairwise distance distribution.
fn estimate_bandwidth(rows: &[&[f32]]) -> f32 {
    let n = rows.len();
    let mut distances = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            distances.push(euclidean(rows[i], rows[j]));
        }
    }
    if distances.is_empty() {
        return 0.0;
    }
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (BANDWIDTH_QUANTILE * (distances.len() - 1) as f64).round() as usize;
    if distances[rank] > 0.0 {
        return distances[rank];
    }
    // quantile landed on coincident points; take the smallest positive gap
    distances.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0)
}

fn flat_kernel_mean(rows: &[&[f32]], center: &[f32], bandwidth: f32) -> Vec<f32> {
    let dim = center.len();
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for row in rows {
        if euclidean(row, center) <= bandwidth {
            for (s, &v) in sum.iter_mut().zip(*row) {
                *s += v;
            }
            count += 1;
        }
    }
    if count == 0 {
        return center.to_vec();
    }
    for s in &mut sum {
        *s /= count as f32;
    }
    sum
}

/// Find an existing mode within half a bandwidth or register a new one.
fn assign_mode(modes: &mut Vec<Vec<f32>>, candidate: Vec<f32>, bandwidth: f32) -> usize {
    for (id, mode) in modes.iter().enumerate() {
        if euclidean(mode, &candidate) < bandwidth / 2.0 {
            return id;
        }
    }
    modes.push(candidate);
    modes.len() - 1
}
