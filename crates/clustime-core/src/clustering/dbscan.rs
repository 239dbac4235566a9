//! Density-based clustering (DBSCAN) over similarity-matrix rows.
//!
//! Core points have at least `min_samples` neighbours (self included)
//! within `eps`; clusters grow by breadth-first expansion from core points.
//! Points reachable from no core point are noise and labelled `-1`.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::Metric;
use crate::error::CoreResult;
use crate::matrix::SimilarityMatrix;

use super::metrics::distance;

/// Noise label shared by the density-based algorithms.
pub const NOISE: i64 = -1;

/// Cluster matrix rows by density.
pub fn cluster(
    matrix: &SimilarityMatrix,
    eps: f32,
    min_samples: usize,
    metric: Metric,
) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();
    let neighbourhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| neighbours(matrix, i, eps, metric))
        .collect();

    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_cluster = 0i64;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        if neighbourhoods[i].len() < min_samples {
            continue; // noise unless later absorbed by a cluster
        }

        labels[i] = next_cluster;
        let mut queue: VecDeque<usize> = neighbourhoods[i].iter().copied().collect();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                labels[j] = next_cluster; // border point
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;
            labels[j] = next_cluster;
            if neighbourhoods[j].len() >= min_samples {
                queue.extend(neighbourhoods[j].iter().copied());
            }
        }
        next_cluster += 1;
    }

    debug!(clusters = next_cluster, "DBSCAN finished");
    Ok(labels)
}

/// Indices within `eps` of point `i`, self included.
pub(super) fn neighbours(
    matrix: &SimilarityMatrix,
    i: usize,
    eps: f32,
    metric: Metric,
) -> Vec<usize> {
    let n = matrix.dim();
    (0..n)
        .filter(|&j| distance(metric, matrix.row(i), matrix.row(j)) <= eps)
        .collect()
}
