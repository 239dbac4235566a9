//! OPTICS reachability ordering over similarity-matrix rows.
//!
//! Builds the full reachability ordering (no neighbourhood cap, quadratic
//! scan), then extracts a DBSCAN-equivalent labelling at the configured
//! `eps`. Unreachable points are noise and labelled `-1`.

use tracing::debug;

use crate::config::Metric;
use crate::error::CoreResult;
use crate::matrix::SimilarityMatrix;

use super::dbscan::NOISE;
use super::metrics::distance;

/// Cluster matrix rows via reachability ordering.
pub fn cluster(
    matrix: &SimilarityMatrix,
    eps: f32,
    min_samples: usize,
    metric: Metric,
) -> CoreResult<Vec<i64>> {
    let n = matrix.dim();

    // pairwise distances
    let mut dist = vec![0.0f32; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(metric, matrix.row(i), matrix.row(j));
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    // core distance: distance to the min_samples-th nearest point, self included
    let core_distance: Vec<f32> = (0..n)
        .map(|i| {
            let mut row: Vec<f32> = (0..n).map(|j| dist[i * n + j]).collect();
            row.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            if min_samples <= row.len() {
                row[min_samples - 1]
            } else {
                f32::INFINITY
            }
        })
        .collect();

    // reachability ordering: repeatedly take the unprocessed point with the
    // smallest reachability, then relax its neighbours
    let mut processed = vec![false; n];
    let mut reachability = vec![f32::INFINITY; n];
    let mut ordering = Vec::with_capacity(n);

    for _ in 0..n {
        let mut next = None;
        let mut best = f32::INFINITY;
        for i in 0..n {
            if !processed[i] && (next.is_none() || reachability[i] < best) {
                best = reachability[i];
                next = Some(i);
            }
        }
        let Some(p) = next else { break };
        processed[p] = true;
        ordering.push(p);

        if core_distance[p].is_finite() {
            for j in 0..n {
                if !processed[j] {
                    let reach = core_distance[p].max(dist[p * n + j]);
                    if reach < reachability[j] {
                        reachability[j] = reach;
                    }
                }
            }
        }
    }

    // DBSCAN-equivalent extraction at eps
    let mut labels = vec![NOISE; n];
    let mut current = -1i64;
    for &p in &ordering {
        if reachability[p] > eps {
            if core_distance[p] <= eps {
                current += 1;
                labels[p] = current;
            }
            // else: noise, label stays -1
        } else if current >= 0 {
            labels[p] = current;
        }
    }

    debug!(
        clusters = current + 1,
        ordered = ordering.len(),
        "OPTICS finished"
    );
    Ok(labels)
}
