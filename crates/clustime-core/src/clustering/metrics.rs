//! Distance primitives shared by the partition-family algorithms.

use crate::config::Metric;

/// Squared L2 distance.
#[inline]
pub fn euclidean_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// L2 distance.
#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    euclidean_squared(a, b).sqrt()
}

/// L1 distance.
#[inline]
pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(&x, &y)| (x - y).abs()).sum()
}

/// 1 - cosine similarity. Zero-magnitude vectors get distance 1 (maximally
/// dissimilar) rather than NaN, consistent with the pipeline's
/// NaN-suppression policy.
#[inline]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(&x, &y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Distance under the configured metric.
#[inline]
pub fn distance(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Euclidean => euclidean(a, b),
        Metric::Cosine => cosine(a, b),
        Metric::Manhattan => manhattan(a, b),
    }
}
