//! Seeded k-means over similarity-matrix rows.
//!
//! k-means++ initialization draws from a `ChaCha8Rng` seeded from the
//! configuration, so repeated runs with the same seed produce identical
//! label sequences. Lloyd iterations run until assignments stabilize.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{ConfigError, CoreResult};
use crate::matrix::SimilarityMatrix;

use super::metrics::euclidean_squared;

const MAX_ITERATIONS: usize = 300;

/// Cluster matrix rows into `n_clusters` groups.
///
/// # Errors
///
/// Configuration error when `n_clusters` exceeds the number of rows.
pub fn cluster(matrix: &SimilarityMatrix, n_clusters: usize, seed: u64) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();
    if n_clusters > n {
        return Err(ConfigError::invalid(
            "n_clusters",
            format!("must be <= number of time points ({n}), got {n_clusters}"),
        )
        .into());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = plus_plus_init(matrix, n_clusters, &mut rng);
    let mut assignments = vec![0usize; n];

    for iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for i in 0..n {
            let nearest = nearest_centroid(matrix.row(i), &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed && iteration > 0 {
            debug!(iteration, "k-means assignments stabilized");
            break;
        }
        recompute_centroids(matrix, &assignments, &mut centroids);
    }

    Ok(assignments.into_iter().map(|a| a as i64).collect())
}

/// k-means++ seeding: first centroid uniform, the rest drawn with
/// probability proportional to squared distance from the nearest chosen
/// centroid.
fn plus_plus_init(matrix: &SimilarityMatrix, k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = matrix.dim();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(matrix.row(rng.gen_range(0..n)).to_vec());

    let mut min_distances = vec![f32::MAX; n];
    while centroids.len() < k {
        let last = centroids.last().map(Vec::as_slice).unwrap_or(&[]);
        for i in 0..n {
            let d = euclidean_squared(matrix.row(i), last);
            if d < min_distances[i] {
                min_distances[i] = d;
            }
        }
        let total: f32 = min_distances.iter().sum();
        let next = if total > 0.0 {
            let mut draw = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, &d) in min_distances.iter().enumerate() {
                if draw < d {
                    chosen = i;
                    break;
                }
                draw -= d;
            }
            chosen
        } else {
            // all points coincide with a centroid already
            rng.gen_range(0..n)
        };
        centroids.push(matrix.row(next).to_vec());
    }
    centroids
}

fn nearest_centroid(row: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (j, centroid) in centroids.iter().enumerate() {
        let d = euclidean_squared(row, centroid);
        if d < best_distance {
            best_distance = d;
            best = j;
        }
    }
    best
}

/// Mean of assigned rows; a cluster left empty keeps its previous centroid.
fn recompute_centroids(
    matrix: &SimilarityMatrix,
    assignments: &[usize],
    centroids: &mut [Vec<f32>],
) {
    let n = matrix.dim();
    let dim = matrix.dim();
    let k = centroids.len();
    let mut sums = vec![vec![0.0f32; dim]; k];
    let mut counts = vec![0usize; k];

    for i in 0..n {
        let c = assignments[i];
        counts[c] += 1;
        for (s, &v) in sums[c].iter_mut().zip(matrix.row(i)) {
            *s += v;
        }
    }
    for (c, centroid) in centroids.iter_mut().enumerate() {
        if counts[c] > 0 {
            for (dst, s) in centroid.iter_mut().zip(&sums[c]) {
                *dst = s / counts[c] as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Block-diagonal similarity: two well-separated groups.
    fn two_block_matrix() -> SimilarityMatrix {
        let n = 6;
        let mut m = SimilarityMatrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                let same_block = (i < 3) == (j < 3);
                m.set_symmetric(i, j, if same_block { 0.9 } else { 0.1 });
            }
        }
        m
    }

    #[test]
    fn separates_two_blocks() {
        let labels = cluster(&two_block_matrix(), 2, 0).unwrap();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn same_seed_reproduces_labels() {
        let m = two_block_matrix();
        let first = cluster(&m, 3, 42).unwrap();
        let second = cluster(&m, 3, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn too_many_clusters_is_rejected() {
        let m = two_block_matrix();
        assert!(cluster(&m, 7, 0).is_err());
    }

    #[test]
    fn k_equals_n_gives_each_point_a_label() {
        let m = two_block_matrix();
        let labels = cluster(&m, 6, 1).unwrap();
        assert_eq!(labels.len(), 6);
    }
}
