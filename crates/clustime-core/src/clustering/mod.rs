//! Clustering Dispatcher: one exhaustive dispatch point over the closed
//! algorithm enumeration.
//!
//! Every strategy consumes the same `(similarity, indexes)` shape and yields
//! one label per retained time point. The community-detection family also
//! returns the binarized adjacency it actually clustered, which downstream
//! reporting needs for the original-vs-binary view; that coupling is made
//! explicit in the [`ClusterResult`] variant type instead of being inferred
//! from which algorithm ran.

pub mod affinity;
pub mod agglomerative;
pub mod community;
pub mod dbscan;
pub mod kmeans;
pub mod mean_shift;
pub mod metrics;
pub mod optics;

use tracing::info;

use crate::config::{Algorithm, ClustimeConfig};
use crate::error::{CoreError, CoreResult};
use crate::matrix::SimilarityMatrix;

use community::CommunityVariant;

/// Label sequence plus, for the community family, the adjacency that was
/// actually clustered.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterResult {
    /// Partition-family output: labels only.
    Labels(Vec<i64>),
    /// Community-family output: labels plus the binarized matrix.
    LabelsWithAdjacency {
        /// One community id per retained time point.
        labels: Vec<i64>,
        /// The binarized similarity matrix the graph was built from.
        binarized: SimilarityMatrix,
    },
}

impl ClusterResult {
    /// The label sequence, whichever variant was produced.
    pub fn labels(&self) -> &[i64] {
        match self {
            Self::Labels(labels) => labels,
            Self::LabelsWithAdjacency { labels, .. } => labels,
        }
    }

    /// The binarized adjacency, when the community family produced one.
    pub fn binarized(&self) -> Option<&SimilarityMatrix> {
        match self {
            Self::Labels(_) => None,
            Self::LabelsWithAdjacency { binarized, .. } => Some(binarized),
        }
    }

    fn into_checked(self, expected: usize) -> CoreResult<Self> {
        let actual = self.labels().len();
        if actual != expected {
            return Err(CoreError::ShapeMismatch {
                what: "labels vs indexes",
                expected,
                actual,
            });
        }
        Ok(self)
    }
}

/// Run the configured algorithm over the (possibly preprocessed) similarity
/// matrix.
///
/// # Errors
///
/// - [`CoreError::ShapeMismatch`] when the matrix dimension disagrees with
///   the index set, or an algorithm returns the wrong label count (invariant
///   violation, never truncated).
/// - Configuration errors surfaced by individual strategies
///   (e.g. `n_clusters` larger than the matrix).
pub fn cluster(
    matrix: &SimilarityMatrix,
    indexes: &[usize],
    config: &ClustimeConfig,
) -> CoreResult<ClusterResult> {
    if matrix.dim() != indexes.len() {
        return Err(CoreError::ShapeMismatch {
            what: "similarity matrix vs indexes",
            expected: indexes.len(),
            actual: matrix.dim(),
        });
    }

    info!(
        algorithm = %config.algorithm,
        time_points = indexes.len(),
        "dispatching clustering"
    );

    let result = match config.algorithm {
        Algorithm::Infomap => {
            let (labels, binarized) = community::cluster(
                matrix,
                config.thr_infomap,
                CommunityVariant::LabelPropagation,
                config.seed,
            )?;
            ClusterResult::LabelsWithAdjacency { labels, binarized }
        }
        Algorithm::Louvain | Algorithm::Greedy => {
            let (labels, binarized) = community::cluster(
                matrix,
                config.thr_infomap,
                CommunityVariant::GreedyModularity,
                config.seed,
            )?;
            ClusterResult::LabelsWithAdjacency { labels, binarized }
        }
        Algorithm::KMeans => {
            ClusterResult::Labels(kmeans::cluster(matrix, config.n_clusters, config.seed)?)
        }
        Algorithm::Agglomerative => ClusterResult::Labels(agglomerative::cluster(
            matrix,
            config.n_clusters,
            config.linkage,
            config.metric,
        )?),
        Algorithm::Affinity => {
            ClusterResult::Labels(affinity::cluster(matrix, config.damping, config.seed)?)
        }
        Algorithm::MeanShift => ClusterResult::Labels(mean_shift::cluster(matrix)?),
        Algorithm::Dbscan => ClusterResult::Labels(dbscan::cluster(
            matrix,
            config.eps,
            config.min_samples,
            config.metric,
        )?),
        Algorithm::Optics => ClusterResult::Labels(optics::cluster(
            matrix,
            config.eps,
            config.min_samples,
            config.metric,
        )?),
    };

    result.into_checked(indexes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Algorithm;

    fn two_block_matrix() -> SimilarityMatrix {
        let n = 8;
        let mut m = SimilarityMatrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                let value = if i == j {
                    1.0
                } else if (i < 4) == (j < 4) {
                    0.9
                } else {
                    0.1
                };
                m.set_symmetric(i, j, value);
            }
        }
        m
    }

    fn all_algorithms() -> [Algorithm; 9] {
        [
            Algorithm::Infomap,
            Algorithm::KMeans,
            Algorithm::Agglomerative,
            Algorithm::Affinity,
            Algorithm::MeanShift,
            Algorithm::Louvain,
            Algorithm::Greedy,
            Algorithm::Dbscan,
            Algorithm::Optics,
        ]
    }

    #[test]
    fn every_algorithm_labels_every_index() {
        let m = two_block_matrix();
        let indexes: Vec<usize> = (0..8).collect();
        for algorithm in all_algorithms() {
            let config = ClustimeConfig::default()
                .with_algorithm(algorithm)
                .with_n_clusters(2)
                .with_thr_infomap(60.0)
                .with_eps(0.5)
                .with_min_samples(3);
            let result = cluster(&m, &indexes, &config)
                .unwrap_or_else(|e| panic!("{algorithm} failed: {e}"));
            assert_eq!(
                result.labels().len(),
                indexes.len(),
                "label count for {algorithm}"
            );
        }
    }

    #[test]
    fn community_family_returns_binarized_matrix() {
        let m = two_block_matrix();
        let indexes: Vec<usize> = (0..8).collect();
        for algorithm in [Algorithm::Infomap, Algorithm::Louvain, Algorithm::Greedy] {
            let config = ClustimeConfig::default()
                .with_algorithm(algorithm)
                .with_thr_infomap(60.0);
            let result = cluster(&m, &indexes, &config).unwrap();
            let binary = result.binarized().expect("community family returns matrix");
            assert_eq!(binary.dim(), 8);
        }
    }

    #[test]
    fn partition_family_returns_labels_only() {
        let m = two_block_matrix();
        let indexes: Vec<usize> = (0..8).collect();
        for algorithm in [
            Algorithm::KMeans,
            Algorithm::Agglomerative,
            Algorithm::Affinity,
            Algorithm::MeanShift,
            Algorithm::Dbscan,
            Algorithm::Optics,
        ] {
            let config = ClustimeConfig::default()
                .with_algorithm(algorithm)
                .with_n_clusters(2)
                .with_eps(0.5)
                .with_min_samples(3);
            let result = cluster(&m, &indexes, &config).unwrap();
            assert!(result.binarized().is_none(), "{algorithm}");
        }
    }

    #[test]
    fn greedy_and_louvain_agree_for_the_same_seed() {
        let m = two_block_matrix();
        let indexes: Vec<usize> = (0..8).collect();
        let louvain = cluster(
            &m,
            &indexes,
            &ClustimeConfig::default()
                .with_algorithm(Algorithm::Louvain)
                .with_thr_infomap(60.0)
                .with_seed(9),
        )
        .unwrap();
        let greedy = cluster(
            &m,
            &indexes,
            &ClustimeConfig::default()
                .with_algorithm(Algorithm::Greedy)
                .with_thr_infomap(60.0)
                .with_seed(9),
        )
        .unwrap();
        assert_eq!(louvain, greedy);
    }

    #[test]
    fn mismatched_indexes_are_fatal() {
        let m = two_block_matrix();
        let short_indexes: Vec<usize> = (0..5).collect();
        let config = ClustimeConfig::default();
        let err = cluster(&m, &short_indexes, &config).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }
}
