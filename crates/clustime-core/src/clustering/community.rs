//! Community detection over the binarized similarity graph.
//!
//! The whole family shares one front door: binarize the similarity matrix at
//! the configured percentile, build an undirected graph from the surviving
//! off-diagonal edges, run the chosen detector, and hand back both the label
//! sequence and the binarized matrix (downstream reporting plots the
//! original and binary views side by side).
//!
//! Two detectors:
//! - greedy modularity maximization with community aggregation, serving the
//!   `Louvain` and `Greedy` algorithm names (documented alias);
//! - seeded label propagation, serving the `infomap` name as the flow-style
//!   variant.
//!
//! Node visit order is shuffled from the configured seed, so runs are
//! reproducible per seed.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::CoreResult;
use crate::matrix::SimilarityMatrix;

const MAX_PROPAGATION_ITERATIONS: usize = 100;

/// Which community detector to run behind the shared binarization front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityVariant {
    /// Seeded label propagation (`infomap`).
    LabelPropagation,
    /// Greedy modularity maximization (`Louvain` / `Greedy`).
    GreedyModularity,
}

/// Binarize, build the graph, detect communities.
///
/// Returns `(labels, binarized)`; labels are consecutive ids in order of
/// first appearance, one per matrix row.
///
/// # Errors
///
/// Percentile errors from the binarization cut.
pub fn cluster(
    matrix: &SimilarityMatrix,
    percentile: f32,
    variant: CommunityVariant,
    seed: u64,
) -> CoreResult<(Vec<i64>, SimilarityMatrix)> {
    let cut = matrix.off_diagonal_percentile(percentile)?;
    let binary = matrix.binarized(cut);
    let graph = Graph::from_binary(&binary);
    info!(
        percentile,
        cut,
        edges = graph.edge_count(),
        nodes = graph.len(),
        "binarized similarity graph"
    );

    let labels = match variant {
        CommunityVariant::LabelPropagation => label_propagation(&graph, seed),
        CommunityVariant::GreedyModularity => greedy_modularity(&graph, seed),
    };
    Ok((relabel_consecutive(&labels), binary))
}

/// Undirected weighted graph as adjacency lists. Self-loops are dropped
/// when building from a binary matrix.
struct Graph {
    adjacency: Vec<Vec<(usize, f32)>>,
    /// Weighted degree per node.
    degree: Vec<f32>,
    /// Total edge weight (each undirected edge counted once).
    total_weight: f32,
}

impl Graph {
    fn from_binary(binary: &SimilarityMatrix) -> Self {
        let n = binary.dim();
        let mut adjacency = vec![Vec::new(); n];
        let mut degree = vec![0.0f32; n];
        let mut total_weight = 0.0f32;
        for i in 0..n {
            for j in 0..n {
                if i != j && binary.get(i, j) >= 1.0 {
                    adjacency[i].push((j, 1.0));
                    degree[i] += 1.0;
                    if i < j {
                        total_weight += 1.0;
                    }
                }
            }
        }
        Self {
            adjacency,
            degree,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }
}

/// Seeded asynchronous label propagation: each node adopts the label
/// carrying the most edge weight among its neighbours, ties to the smallest
/// label. Isolated nodes keep their own label.
fn label_propagation(graph: &Graph, seed: u64) -> Vec<i64> {
    let n = graph.len();
    let mut labels: Vec<i64> = (0..n as i64).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();

    for iteration in 0..MAX_PROPAGATION_ITERATIONS {
        order.shuffle(&mut rng);
        let mut changed = false;
        for &i in &order {
            if graph.adjacency[i].is_empty() {
                continue;
            }
            let mut weight_by_label: Vec<(i64, f32)> = Vec::new();
            for &(j, w) in &graph.adjacency[i] {
                match weight_by_label.iter_mut().find(|(l, _)| *l == labels[j]) {
                    Some((_, total)) => *total += w,
                    None => weight_by_label.push((labels[j], w)),
                }
            }
            let best = weight_by_label
                .iter()
                .copied()
                .max_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        // ties to the smallest label for determinism
                        .then(b.0.cmp(&a.0))
                })
                .map(|(l, _)| l);
            if let Some(best) = best {
                if best != labels[i] {
                    labels[i] = best;
                    changed = true;
                }
            }
        }
        if !changed {
            debug!(iteration, "label propagation stabilized");
            break;
        }
    }
    labels
}

/// Greedy modularity maximization with aggregation: local moves until no
/// gain, collapse communities into super-nodes, repeat until a level yields
/// no merge.
fn greedy_modularity(graph: &Graph, seed: u64) -> Vec<i64> {
    let n = graph.len();
    if graph.total_weight == 0.0 {
        // modularity undefined on an edgeless graph; every node is its own
        // community
        return (0..n as i64).collect();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // node -> community in the original graph, composed across levels
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level_graph = LevelGraph::from_graph(graph);

    loop {
        let (community, merged) = local_moving(&level_graph, &mut rng);
        let count = community.iter().max().map_or(0, |&c| c + 1);
        // a level must strictly shrink the graph, otherwise we are done
        if !merged || count >= level_graph.size {
            break;
        }
        // compose: original node -> current-level node -> community
        for entry in &mut membership {
            *entry = community[*entry];
        }
        level_graph = level_graph.aggregate(&community);
        if level_graph.size <= 1 {
            break;
        }
    }

    membership.into_iter().map(|c| c as i64).collect()
}

/// Weighted graph at one aggregation level, dense adjacency.
struct LevelGraph {
    size: usize,
    weight: Vec<f32>,
    degree: Vec<f32>,
    total_weight: f32,
}

impl LevelGraph {
    fn from_graph(graph: &Graph) -> Self {
        let n = graph.len();
        let mut weight = vec![0.0f32; n * n];
        for (i, neighbours) in graph.adjacency.iter().enumerate() {
            for &(j, w) in neighbours {
                weight[i * n + j] = w;
            }
        }
        Self {
            size: n,
            weight,
            degree: graph.degree.clone(),
            total_weight: graph.total_weight,
        }
    }

    fn aggregate(&self, community: &[usize]) -> Self {
        let count = community.iter().max().map_or(0, |&c| c + 1);
        let mut weight = vec![0.0f32; count * count];
        for i in 0..self.size {
            for j in 0..self.size {
                let w = self.weight[i * self.size + j];
                if w > 0.0 {
                    weight[community[i] * count + community[j]] += w;
                }
            }
        }
        let degree: Vec<f32> = (0..count)
            .map(|c| (0..count).map(|d| weight[c * count + d]).sum())
            .collect();
        Self {
            size: count,
            weight,
            degree,
            total_weight: self.total_weight,
        }
    }
}

/// One level of local moving. Returns the (renumbered) community of each
/// node and whether any node left its singleton community.
fn local_moving(graph: &LevelGraph, rng: &mut ChaCha8Rng) -> (Vec<usize>, bool) {
    let n = graph.size;
    let two_m = 2.0 * graph.total_weight;
    let mut community: Vec<usize> = (0..n).collect();
    let mut sigma_tot: Vec<f32> = graph.degree.clone();
    let mut order: Vec<usize> = (0..n).collect();
    let mut moved_any = false;

    loop {
        order.shuffle(rng);
        let mut moved = false;
        for &i in &order {
            let current = community[i];
            // edge weight from i to each candidate community
            let mut weight_to: Vec<(usize, f32)> = Vec::new();
            for j in 0..n {
                let w = graph.weight[i * n + j];
                if w > 0.0 && j != i {
                    let c = community[j];
                    match weight_to.iter_mut().find(|(cc, _)| *cc == c) {
                        Some((_, total)) => *total += w,
                        None => weight_to.push((c, w)),
                    }
                }
            }

            sigma_tot[current] -= graph.degree[i];
            let w_current = weight_to
                .iter()
                .find(|(c, _)| *c == current)
                .map_or(0.0, |&(_, w)| w);
            let mut best = current;
            let mut best_gain = w_current - graph.degree[i] * sigma_tot[current] / two_m;
            for &(c, w) in &weight_to {
                if c == current {
                    continue;
                }
                let gain = w - graph.degree[i] * sigma_tot[c] / two_m;
                if gain > best_gain {
                    best_gain = gain;
                    best = c;
                }
            }
            sigma_tot[best] += graph.degree[i];
            if best != current {
                community[i] = best;
                moved = true;
                moved_any = true;
            }
        }
        if !moved {
            break;
        }
    }

    // renumber communities consecutively
    let mut mapping = vec![usize::MAX; n];
    let mut next = 0usize;
    for c in &mut community {
        if mapping[*c] == usize::MAX {
            mapping[*c] = next;
            next += 1;
        }
        *c = mapping[*c];
    }
    (community, moved_any)
}

/// Renumber labels to consecutive ids in order of first appearance.
fn relabel_consecutive(labels: &[i64]) -> Vec<i64> {
    let mut mapping: Vec<(i64, i64)> = Vec::new();
    let mut next = 0i64;
    labels
        .iter()
        .map(|&l| match mapping.iter().find(|(from, _)| *from == l) {
            Some(&(_, to)) => to,
            None => {
                let to = next;
                mapping.push((l, to));
                next += 1;
                to
            }
        })
        .collect()
}
