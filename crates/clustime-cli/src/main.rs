//! clustime: cluster time points of a spatio-temporal recording by the
//! similarity of their activity patterns.
//!
//! Reads a whitespace-delimited signal matrix (one time point per row),
//! builds the time-by-time correlation map, applies the requested
//! processing, clusters with the chosen algorithm, and writes labels,
//! matrices, and a JSON summary into the saving directory. Plot rendering
//! and spatial-map reconstruction consume those files externally.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use clustime_core::config::{
    Algorithm, ClustimeConfig, CorrelationMode, Linkage, Metric, ProcessingMode, SignalComponent,
};
use clustime_core::signal::{SignalMatrix, TaskTimings};
use clustime_core::{pipeline, CoreResult};

mod error;
mod output;

use error::CliExitCode;

/// Cluster time points of a spatio-temporal recording.
#[derive(Parser, Debug)]
#[command(name = "clustime")]
#[command(version)]
#[command(about = "Time-point clustering over correlation maps")]
struct Cli {
    /// Whitespace-delimited signal matrix, one time point per row.
    #[arg(short, long)]
    data: PathBuf,

    /// Task timing files, one onset list per file (TR units).
    #[arg(long, num_args = 0..)]
    timings: Vec<PathBuf>,

    /// Signal component to analyze: whole, positive, negative.
    #[arg(long, default_value = "whole")]
    component: SignalComponent,

    /// Correlation mode: standard, window.
    #[arg(long, default_value = "standard")]
    correlation: CorrelationMode,

    /// Processing mode: none, double, thr, RSS, window.
    #[arg(long, default_value = "none")]
    processing: ProcessingMode,

    /// Window size for windowed correlation/processing.
    #[arg(long, default_value_t = 1)]
    window_size: usize,

    /// Neighbourhood radius for RSS peak retention.
    #[arg(long, default_value_t = 1)]
    near: usize,

    /// Percentile cut for thr processing.
    #[arg(long, default_value_t = 95.0)]
    thr: f32,

    /// Contrast factor for double processing.
    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    /// Repetition time in seconds.
    #[arg(long, default_value_t = 0.5)]
    tr: f32,

    /// Clustering algorithm: infomap, KMeans, Agglomerative, Affinity,
    /// Mean, Louvain, Greedy, DBSCAN, OPTICS.
    #[arg(short, long, default_value = "infomap")]
    algorithm: Algorithm,

    /// Binarization percentile for the community-detection family.
    #[arg(long, default_value_t = 90.0)]
    thr_infomap: f32,

    /// Cluster count for KMeans/Agglomerative.
    #[arg(long, default_value_t = 7)]
    n_clusters: usize,

    /// Distance metric: euclidean, cosine, manhattan.
    #[arg(long, default_value = "euclidean")]
    metric: Metric,

    /// Agglomerative linkage: ward, complete, average, single.
    #[arg(long, default_value = "ward")]
    linkage: Linkage,

    /// Neighbourhood radius for DBSCAN/OPTICS.
    #[arg(long, default_value_t = 0.3)]
    eps: f32,

    /// Damping for affinity propagation.
    #[arg(long, default_value_t = 0.5)]
    damping: f32,

    /// Core-point threshold for DBSCAN/OPTICS.
    #[arg(long, default_value_t = 5)]
    min_samples: usize,

    /// Seed for stochastic algorithms.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Request spatial-map export from external reporting.
    #[arg(long)]
    save_maps: bool,

    /// Output directory.
    #[arg(long, default_value = ".")]
    saving_dir: PathBuf,

    /// Prefix for output file names.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_config(&self) -> ClustimeConfig {
        ClustimeConfig::default()
            .with_component(self.component)
            .with_correlation(self.correlation)
            .with_processing(self.processing)
            .with_window_size(self.window_size)
            .with_near(self.near)
            .with_thr(self.thr)
            .with_contrast(self.contrast)
            .with_tr(self.tr)
            .with_algorithm(self.algorithm)
            .with_thr_infomap(self.thr_infomap)
            .with_n_clusters(self.n_clusters)
            .with_metric(self.metric)
            .with_linkage(self.linkage)
            .with_eps(self.eps)
            .with_damping(self.damping)
            .with_min_samples(self.min_samples)
            .with_seed(self.seed)
            .with_save_maps(self.save_maps)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> CoreResult<()> {
    let signal = SignalMatrix::load_text(&cli.data)?;
    let timings = if cli.timings.is_empty() {
        TaskTimings::empty()
    } else {
        TaskTimings::load(&cli.timings)?
    };

    let config = cli.to_config();
    let result = pipeline::run(signal, &config, timings)?;
    output::write_outputs(&result, &cli.saving_dir, &cli.prefix)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => CliExitCode::Success.into(),
        Err(err) => {
            error!("{err}");
            CliExitCode::from(&err).into()
        }
    }
}
