//! End-to-end pipeline scenarios against the public API.

use clustime_core::config::{Algorithm, ClustimeConfig, CorrelationMode, ProcessingMode};
use clustime_core::pipeline;
use clustime_core::signal::{SignalMatrix, TaskTimings};
use clustime_core::similarity;

fn deterministic_signal(nscans: usize, nvoxels: usize) -> SignalMatrix {
    let rows: Vec<Vec<f32>> = (0..nscans)
        .map(|i| {
            (0..nvoxels)
                .map(|v| ((i * nvoxels + v) as f32 * 0.7).sin() + (i as f32 * 0.3).cos())
                .collect()
        })
        .collect();
    SignalMatrix::from_rows(rows).unwrap()
}

#[test]
fn scenario_a_zero_signal_yields_zero_matrix_not_nan() {
    let signal = SignalMatrix::from_rows(vec![vec![0.0; 5]; 10]).unwrap();
    let matrix = similarity::build(&signal, CorrelationMode::Standard, 1).unwrap();
    assert_eq!(matrix.dim(), 10);
    assert!(matrix.is_finite());
    for i in 0..10 {
        for j in 0..10 {
            assert_eq!(matrix.get(i, j), 0.0, "entry ({i}, {j})");
        }
    }
}

#[test]
fn scenario_b_rss_retains_peak_neighbourhood() {
    // Each time point gets its own orthogonal carrier plus a shared
    // component whose weight rises to a single maximum at time point 5.
    // Row energy in the similarity matrix then follows the weights, so
    // the RSS sequence has exactly one peak, at index 5.
    let nvoxels = 24usize;
    let weights = [0.0f32, 0.2, 0.4, 0.6, 0.8, 1.2, 0.8, 0.6, 0.4, 0.2];
    let tau = 2.0 * std::f32::consts::PI;
    let rows: Vec<Vec<f32>> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            (0..nvoxels)
                .map(|v| {
                    let phase = v as f32 / nvoxels as f32;
                    (tau * (i + 1) as f32 * phase).cos() + w * (tau * phase).sin()
                })
                .collect()
        })
        .collect();
    let signal = SignalMatrix::from_rows(rows).unwrap();

    let config = ClustimeConfig::default()
        .with_algorithm(Algorithm::KMeans)
        .with_n_clusters(2)
        .with_processing(ProcessingMode::Rss)
        .with_near(1);
    let output = pipeline::run(signal, &config, TaskTimings::empty()).unwrap();

    // peak ± near, ascending
    assert_eq!(output.indexes, vec![4, 5, 6]);
    assert!(output.indexes.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(output.labels.len(), output.indexes.len());
    assert_eq!(output.similarity.dim(), output.indexes.len());
}

#[test]
fn scenario_c_seeded_kmeans_is_reproducible() {
    let config = ClustimeConfig::default()
        .with_algorithm(Algorithm::KMeans)
        .with_n_clusters(3)
        .with_seed(1234);

    let first = pipeline::run(deterministic_signal(9, 5), &config, TaskTimings::empty()).unwrap();
    let second = pipeline::run(deterministic_signal(9, 5), &config, TaskTimings::empty()).unwrap();
    assert_eq!(first.labels, second.labels);
    assert_eq!(first.labels.len(), 9);
}

#[test]
fn unknown_algorithm_name_fails_at_parse_time() {
    let err = "Spectral".parse::<Algorithm>().unwrap_err();
    assert!(err.to_string().contains("Spectral"));
}

#[test]
fn out_of_range_thr_fails_before_clustering() {
    let config = ClustimeConfig::default()
        .with_processing(ProcessingMode::Thr)
        .with_thr(150.0);
    let err = pipeline::run(deterministic_signal(8, 4), &config, TaskTimings::empty()).unwrap_err();
    assert!(err.to_string().contains("thr"));
}

#[test]
fn every_similarity_matrix_is_symmetric_and_finite() {
    for (mode, window) in [
        (CorrelationMode::Standard, 1),
        (CorrelationMode::Window, 3),
    ] {
        let matrix =
            similarity::build(&deterministic_signal(12, 7), mode, window).unwrap();
        assert!(matrix.is_symmetric(1e-5), "mode {mode:?}");
        assert!(matrix.is_finite(), "mode {mode:?}");
    }
}

#[test]
fn all_nine_algorithms_run_end_to_end() {
    for algorithm in [
        Algorithm::Infomap,
        Algorithm::KMeans,
        Algorithm::Agglomerative,
        Algorithm::Affinity,
        Algorithm::MeanShift,
        Algorithm::Louvain,
        Algorithm::Greedy,
        Algorithm::Dbscan,
        Algorithm::Optics,
    ] {
        let config = ClustimeConfig::default()
            .with_algorithm(algorithm)
            .with_n_clusters(2)
            .with_eps(1.0)
            .with_min_samples(2)
            .with_seed(7);
        let output = pipeline::run(deterministic_signal(10, 6), &config, TaskTimings::empty())
            .unwrap_or_else(|e| panic!("{algorithm} failed: {e}"));
        assert_eq!(
            output.labels.len(),
            output.indexes.len(),
            "algorithm {algorithm}"
        );
        assert_eq!(
            output.binarized.is_some(),
            algorithm.is_community(),
            "algorithm {algorithm}"
        );
    }
}

#[test]
fn processing_modes_preserve_label_index_contract() {
    for processing in [
        ProcessingMode::None,
        ProcessingMode::Double,
        ProcessingMode::Thr,
        ProcessingMode::Rss,
        ProcessingMode::Window,
    ] {
        let config = ClustimeConfig::default()
            .with_algorithm(Algorithm::KMeans)
            .with_n_clusters(2)
            .with_processing(processing)
            .with_thr(80.0)
            .with_near(2)
            .with_window_size(2);
        let output = pipeline::run(deterministic_signal(12, 6), &config, TaskTimings::empty())
            .unwrap_or_else(|e| panic!("{processing:?} failed: {e}"));
        assert_eq!(
            output.labels.len(),
            output.indexes.len(),
            "processing {processing:?}"
        );
    }
}
