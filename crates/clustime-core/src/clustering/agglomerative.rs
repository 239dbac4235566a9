//! Hierarchical agglomerative clustering over similarity-matrix rows.
//!
//! Naive pairwise merging: start from singletons, repeatedly merge the
//! closest cluster pair under the configured linkage, stop when `n_clusters`
//! remain. Quadratic memory, cubic time; fine at time-series scale.

use tracing::debug;

use crate::config::{Linkage, Metric};
use crate::error::{ConfigError, CoreResult};
use crate::matrix::SimilarityMatrix;

use super::metrics::{distance, euclidean_squared};

/// Cluster matrix rows hierarchically and cut at `n_clusters`.
///
/// Ward linkage ignores `metric` (it is variance-based and intrinsically
/// Euclidean, matching the usual restriction); the other linkages use it for
/// the underlying pairwise distances.
///
/// # Errors
///
/// Configuration error when `n_clusters` exceeds the number of rows.
pub fn cluster(
    matrix: &SimilarityMatrix,
    n_clusters: usize,
    linkage: Linkage,
    metric: Metric,
) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();
    if n_clusters > n {
        return Err(ConfigError::invalid(
            "n_clusters",
            format!("must be <= number of time points ({n}), got {n_clusters}"),
        )
        .into());
    }

    // pairwise point distances, reused by complete/average/single linkage
    let mut point_distance = vec![0.0f32; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(metric, matrix.row(i), matrix.row(j));
            point_distance[i * n + j] = d;
            point_distance[j * n + i] = d;
        }
    }

    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while clusters.len() > n_clusters {
        let mut best = (0usize, 1usize);
        let mut best_distance = f32::MAX;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let d = cluster_distance(
                    matrix,
                    &point_distance,
                    &clusters[a],
                    &clusters[b],
                    linkage,
                );
                if d < best_distance {
                    best_distance = d;
                    best = (a, b);
                }
            }
        }
        let merged = clusters.remove(best.1);
        clusters[best.0].extend(merged);
    }
    debug!(n_clusters = clusters.len(), linkage = ?linkage, "agglomeration finished");

    let mut labels = vec![0i64; n];
    for (id, members) in clusters.iter().enumerate() {
        for &i in members {
            labels[i] = id as i64;
        }
    }
    Ok(labels)
}

fn cluster_distance(
    matrix: &SimilarityMatrix,
    point_distance: &[f32],
    a: &[usize],
    b: &[usize],
    linkage: Linkage,
) -> f32 {
    let n = matrix.dim();
    match linkage {
        Linkage::Ward => {
            // variance-increase criterion via centroid separation
            let ca = centroid(matrix, a);
            let cb = centroid(matrix, b);
            let na = a.len() as f32;
            let nb = b.len() as f32;
            na * nb / (na + nb) * euclidean_squared(&ca, &cb)
        }
        Linkage::Complete => pair_distances(point_distance, n, a, b)
            .fold(0.0f32, f32::max),
        Linkage::Average => {
            let total: f32 = pair_distances(point_distance, n, a, b).sum();
            total / (a.len() * b.len()) as f32
        }
        Linkage::Single => pair_distances(point_distance, n, a, b)
            .fold(f32::MAX, f32::min),
    }
}

fn pair_distances<'a>(
    point_distance: &'a [f32],
    n: usize,
    a: &'a [usize],
    b: &'a [usize],
) -> impl Iterator<Item = f32> + 'a {
    a.iter()
        .flat_map(move |&i| b.iter().map(move |&j| point_distance[i * n + j]))
}

fn centroid(matrix: &SimilarityMatrix, members: &[usize]) -> Vec<f32> {
    let dim = matrix.dim();
    let mut c = vec![0.0f32; dim];
    for &i in members {
        for (dst, &v) in c.iter_mut().zip(matrix.row(i)) {
            *dst += v;
        }
    }
    for v in &mut c {
        *v /= members.len() as f32;
    }
    c
}
