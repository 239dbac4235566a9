//! Error types for the clustime pipeline.
//!
//! Two layers, following the crate's fail-fast policy:
//!
//! - [`ConfigError`]: rejected parameter values and unknown mode names,
//!   detected before any heavy computation starts.
//! - [`CoreError`]: the crate-level umbrella covering configuration errors,
//!   data-shape violations, and boundary I/O failures.
//!
//! A failed run produces no labels; there is no retry policy and no
//! partial-result mode.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Configuration errors, detected during [`crate::config::ClustimeConfig::validate`]
/// or while parsing mode names from text.
///
/// Each variant names the offending parameter and carries the rejected value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Algorithm name outside the closed enumeration.
    #[error("unknown algorithm {0:?}; expected one of infomap, KMeans, Agglomerative, Affinity, Mean, Louvain, Greedy, DBSCAN, OPTICS")]
    UnknownAlgorithm(String),

    /// Processing mode outside the closed enumeration.
    #[error("unknown processing mode {0:?}; expected one of none, double, thr, RSS, window")]
    UnknownProcessingMode(String),

    /// Correlation mode outside the closed enumeration.
    #[error("unknown correlation mode {0:?}; expected one of standard, window")]
    UnknownCorrelationMode(String),

    /// Signal component outside the closed enumeration.
    #[error("unknown signal component {0:?}; expected one of whole, positive, negative")]
    UnknownComponent(String),

    /// Linkage criterion outside the closed enumeration.
    #[error("unknown linkage {0:?}; expected one of ward, complete, average, single")]
    UnknownLinkage(String),

    /// Distance metric outside the closed enumeration.
    #[error("unknown metric {0:?}; expected one of euclidean, cosine, manhattan")]
    UnknownMetric(String),

    /// A percentile parameter left the valid `[0, 100]` range.
    #[error("{name} must be within [0, 100], got {value}")]
    ThresholdOutOfRange {
        /// Parameter name (`thr` or `thr_infomap`).
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Any other rejected parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected, including the value itself.
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidParameter`] with a formatted reason.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Crate-level error for all pipeline operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A parameter failed validation before computation started.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The signal carries too few time points to correlate.
    #[error("signal has {got} time point(s); correlation requires at least 2")]
    TooFewTimePoints {
        /// Observed number of time points.
        got: usize,
    },

    /// Invariant violation between pipeline artifacts. Never truncated,
    /// always fatal.
    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which artifact pair disagreed (e.g. `labels vs indexes`).
        what: &'static str,
        /// Expected length/dimension.
        expected: usize,
        /// Observed length/dimension.
        actual: usize,
    },

    /// Boundary file reading failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A boundary text file held a token that does not parse as a number.
    #[error("parse error in {path} at line {line}: {token:?} is not a number")]
    Parse {
        /// Offending file.
        path: String,
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
}
