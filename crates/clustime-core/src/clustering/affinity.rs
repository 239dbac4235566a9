//! Affinity propagation over the similarity matrix.
//!
//! Works on the similarity values directly (no feature-space detour): the
//! matrix is already an affinity. Preference (self-similarity) is set to the
//! median of the off-diagonal values, and a seeded sub-epsilon jitter breaks
//! degenerate ties so exemplar choice is reproducible per seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::CoreResult;
use crate::matrix::SimilarityMatrix;

const MAX_ITERATIONS: usize = 200;
const STABLE_ITERATIONS: usize = 15;
const JITTER: f32 = 1e-6;

/// Cluster by message passing with the configured damping factor.
///
/// Every point is assigned to its best exemplar; exemplars label
/// themselves. Falls back to a single cluster when no exemplar emerges
/// (fully degenerate input such as an all-zero matrix).
pub fn cluster(matrix: &SimilarityMatrix, damping: f32, seed: u64) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // similarities with median preference on the diagonal plus tie-breaking jitter
    let mut s = vec![0.0f32; n * n];
    let preference = median_off_diagonal(matrix);
    for i in 0..n {
        for j in 0..n {
            let base = if i == j { preference } else { matrix.get(i, j) };
            s[i * n + j] = base + rng.gen_range(0.0..JITTER);
        }
    }

    let mut responsibility = vec![0.0f32; n * n];
    let mut availability = vec![0.0f32; n * n];
    let mut exemplars: Vec<usize> = Vec::new();
    let mut stable = 0usize;

    for iteration in 0..MAX_ITERATIONS {
        // responsibility update
        for i in 0..n {
            for k in 0..n {
                let mut best = f32::MIN;
                for kk in 0..n {
                    if kk == k {
                        continue;
                    }
                    let v = availability[i * n + kk] + s[i * n + kk];
                    if v > best {
                        best = v;
                    }
                }
                let update = s[i * n + k] - best;
                responsibility[i * n + k] =
                    damping * responsibility[i * n + k] + (1.0 - damping) * update;
            }
        }

        // availability update
        for k in 0..n {
            let mut positive_sum = 0.0f32;
            for i in 0..n {
                if i != k {
                    positive_sum += responsibility[i * n + k].max(0.0);
                }
            }
            for i in 0..n {
                let update = if i == k {
                    positive_sum
                } else {
                    let without_i = positive_sum - responsibility[i * n + k].max(0.0);
                    (responsibility[k * n + k] + without_i).min(0.0)
                };
                availability[i * n + k] =
                    damping * availability[i * n + k] + (1.0 - damping) * update;
            }
        }

        let current: Vec<usize> = (0..n)
            .filter(|&k| responsibility[k * n + k] + availability[k * n + k] > 0.0)
            .collect();
        if current == exemplars && !current.is_empty() {
            stable += 1;
            if stable >= STABLE_ITERATIONS {
                debug!(iteration, exemplars = current.len(), "affinity propagation converged");
                break;
            }
        } else {
            stable = 0;
            exemplars = current;
        }
    }

    if exemplars.is_empty() {
        return Ok(vec![0; n]);
    }

    // assign each point to its best exemplar
    let mut labels = vec![0i64; n];
    for i in 0..n {
        let mut best = 0usize;
        let mut best_similarity = f32::MIN;
        for (cluster_id, &k) in exemplars.iter().enumerate() {
            let v = if i == k { f32::MAX } else { s[i * n + k] };
            if v > best_similarity {
                best_similarity = v;
                best = cluster_id;
            }
        }
        labels[i] = best as i64;
    }
    Ok(labels)
}

fn median_off_diagonal(matrix: &SimilarityMatrix) -> f32 {
    let n = matrix.dim();
    let mut values = Vec::with_capacity(n * n.saturating_sub(1));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                values.push(matrix.get(i, j));
            }
        }
    }
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}
