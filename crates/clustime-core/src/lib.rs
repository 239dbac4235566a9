//! clustime-core: turn a spatio-temporal recording into a sequence of
//! discrete state labels over time.
//!
//! The pipeline computes a time-by-time correlation matrix from a masked
//! signal, optionally reshapes or reduces it, and partitions it with one of
//! nine interchangeable clustering strategies. Mask fitting, NIfTI I/O, and
//! plot rendering live outside this crate; what crosses the boundary is a
//! plain `[nscans, nvoxels]` matrix in and a label sequence (plus the
//! matrices needed for visualization) out.
//!
//! # Example
//!
//! ```
//! use clustime_core::config::{Algorithm, ClustimeConfig};
//! use clustime_core::pipeline;
//! use clustime_core::signal::{SignalMatrix, TaskTimings};
//!
//! let rows: Vec<Vec<f32>> = (0..10)
//!     .map(|i| (0..5).map(|v| ((i * 5 + v) as f32).sin()).collect())
//!     .collect();
//! let signal = SignalMatrix::from_rows(rows).unwrap();
//!
//! let config = ClustimeConfig::default()
//!     .with_algorithm(Algorithm::KMeans)
//!     .with_n_clusters(3)
//!     .with_seed(42);
//!
//! let output = pipeline::run(signal, &config, TaskTimings::empty()).unwrap();
//! assert_eq!(output.labels.len(), 10);
//! ```

pub mod clustering;
pub mod config;
pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod processing;
pub mod signal;
pub mod similarity;

pub use clustering::ClusterResult;
pub use config::{
    Algorithm, ClustimeConfig, CorrelationMode, Linkage, Metric, ProcessingMode, SignalComponent,
};
pub use error::{ConfigError, CoreError, CoreResult};
pub use matrix::SimilarityMatrix;
pub use pipeline::{run, PipelineOutput};
pub use signal::{SignalMatrix, TaskTimings};
