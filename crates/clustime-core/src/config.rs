//! Pipeline configuration: the immutable knob bundle and the closed mode
//! enumerations.
//!
//! Every mode selection is a closed enum with a single exhaustive dispatch
//! point downstream; adding a variant is a compile-time-checked change.
//! Names are case-sensitive and match the published CLI surface
//! (`infomap`, `KMeans`, `RSS`, ...).
//!
//! [`ClustimeConfig::validate`] performs every parameter check before any
//! computation starts; a pipeline run begins by calling it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Clustering strategy selection. Closed, case-sensitive enumeration.
///
/// The community-detection family (`Infomap`, `Louvain`, `Greedy`) binarizes
/// the similarity matrix and clusters the resulting graph; the partition
/// family treats matrix rows as feature vectors.
///
/// `Greedy` is a documented alias of `Louvain`: both dispatch to the same
/// greedy modularity procedure. They are kept as distinct variants so a
/// future divergence is a localized change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Algorithm {
    /// Flow-style community detection over the binarized graph.
    #[default]
    #[serde(rename = "infomap")]
    Infomap,
    /// Seeded k-means++ over matrix rows.
    #[serde(rename = "KMeans")]
    KMeans,
    /// Hierarchical agglomeration cut at `n_clusters`.
    #[serde(rename = "Agglomerative")]
    Agglomerative,
    /// Affinity propagation with damping.
    #[serde(rename = "Affinity")]
    Affinity,
    /// Mean-shift mode seeking.
    #[serde(rename = "Mean")]
    MeanShift,
    /// Greedy modularity community detection.
    #[serde(rename = "Louvain")]
    Louvain,
    /// Alias of [`Algorithm::Louvain`].
    #[serde(rename = "Greedy")]
    Greedy,
    /// Density-based clustering; noise labelled `-1`.
    #[serde(rename = "DBSCAN")]
    Dbscan,
    /// Reachability-ordering clustering; noise labelled `-1`.
    #[serde(rename = "OPTICS")]
    Optics,
}

impl Algorithm {
    /// True for the community-detection family, which returns the binarized
    /// adjacency matrix alongside the labels.
    pub fn is_community(self) -> bool {
        matches!(self, Self::Infomap | Self::Louvain | Self::Greedy)
    }

    /// The published case-sensitive name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Infomap => "infomap",
            Self::KMeans => "KMeans",
            Self::Agglomerative => "Agglomerative",
            Self::Affinity => "Affinity",
            Self::MeanShift => "Mean",
            Self::Louvain => "Louvain",
            Self::Greedy => "Greedy",
            Self::Dbscan => "DBSCAN",
            Self::Optics => "OPTICS",
        }
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infomap" => Ok(Self::Infomap),
            "KMeans" => Ok(Self::KMeans),
            "Agglomerative" => Ok(Self::Agglomerative),
            "Affinity" => Ok(Self::Affinity),
            "Mean" => Ok(Self::MeanShift),
            "Louvain" => Ok(Self::Louvain),
            "Greedy" => Ok(Self::Greedy),
            "DBSCAN" => Ok(Self::Dbscan),
            "OPTICS" => Ok(Self::Optics),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional similarity-matrix transform applied between correlation and
/// clustering. Exactly one mode is active per run; `None` passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessingMode {
    /// Pass-through: matrix and index set unchanged.
    #[default]
    #[serde(rename = "none")]
    None,
    /// Rescale values by `contrast` to widen dynamic range.
    #[serde(rename = "double")]
    Double,
    /// Binarize at the `thr`-th percentile of off-diagonal values.
    #[serde(rename = "thr")]
    Thr,
    /// Reduce to time points at and around root-sum-of-squares peaks.
    #[serde(rename = "RSS")]
    Rss,
    /// Re-apply sliding-window smoothing on the processed matrix.
    #[serde(rename = "window")]
    Window,
}

impl FromStr for ProcessingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "double" => Ok(Self::Double),
            "thr" => Ok(Self::Thr),
            "RSS" => Ok(Self::Rss),
            "window" => Ok(Self::Window),
            other => Err(ConfigError::UnknownProcessingMode(other.to_string())),
        }
    }
}

/// How the similarity matrix is built from the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CorrelationMode {
    /// Full-sample Pearson correlation between time rows.
    #[default]
    #[serde(rename = "standard")]
    Standard,
    /// Correlation over extended rows: each time point is concatenated with
    /// the following `window_size` rows before correlating.
    #[serde(rename = "window")]
    Window,
}

impl FromStr for CorrelationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "window" => Ok(Self::Window),
            other => Err(ConfigError::UnknownCorrelationMode(other.to_string())),
        }
    }
}

/// Sign filtering applied to the signal before correlation, isolating
/// activation vs. deactivation patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SignalComponent {
    /// Signal passes through unchanged.
    #[default]
    #[serde(rename = "whole")]
    Whole,
    /// Negative values are zeroed.
    #[serde(rename = "positive")]
    Positive,
    /// Positive values are zeroed.
    #[serde(rename = "negative")]
    Negative,
}

impl FromStr for SignalComponent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole" => Ok(Self::Whole),
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(ConfigError::UnknownComponent(other.to_string())),
        }
    }
}

/// Merge criterion for agglomerative clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Minimize within-cluster variance increase.
    #[default]
    Ward,
    /// Maximum pairwise distance between clusters.
    Complete,
    /// Mean pairwise distance between clusters.
    Average,
    /// Minimum pairwise distance between clusters.
    Single,
}

impl FromStr for Linkage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ward" => Ok(Self::Ward),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            "single" => Ok(Self::Single),
            other => Err(ConfigError::UnknownLinkage(other.to_string())),
        }
    }
}

/// Distance metric for the partition-family algorithms that consume matrix
/// rows as feature vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// 1 - cosine similarity.
    Cosine,
    /// L1 distance.
    Manhattan,
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euclidean" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(ConfigError::UnknownMetric(other.to_string())),
        }
    }
}

/// The immutable parameter bundle for one pipeline run.
///
/// Exactly one correlation mode and at most one processing mode are active
/// per run; the algorithm choice is a closed enumeration.
///
/// # Example
///
/// ```
/// use clustime_core::config::{Algorithm, ClustimeConfig, ProcessingMode};
///
/// let config = ClustimeConfig::default()
///     .with_algorithm(Algorithm::KMeans)
///     .with_n_clusters(3)
///     .with_processing(ProcessingMode::Thr)
///     .with_thr(95.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClustimeConfig {
    /// Sign filtering before correlation.
    pub component: SignalComponent,
    /// How the similarity matrix is built.
    pub correlation: CorrelationMode,
    /// Optional matrix transform between correlation and clustering.
    pub processing: ProcessingMode,
    /// Window length for `window` correlation/processing. Minimum 1.
    pub window_size: usize,
    /// Neighbourhood radius for `RSS` peak retention.
    ///
    /// Unsigned by construction, so a negative radius is unrepresentable.
    pub near: usize,
    /// Percentile cut for `thr` processing, in `[0, 100]`.
    pub thr: f32,
    /// Value scale factor for `double` processing. Must be positive and finite.
    pub contrast: f32,
    /// Repetition time: sampling interval in seconds, used only to convert
    /// time-point indices to physical time for annotations.
    pub tr: f32,
    /// Clustering strategy.
    pub algorithm: Algorithm,
    /// Percentile cut used by the community-detection family, in `[0, 100]`.
    pub thr_infomap: f32,
    /// Cluster count for KMeans and Agglomerative. Minimum 1.
    pub n_clusters: usize,
    /// Distance metric for Agglomerative/DBSCAN/OPTICS.
    pub metric: Metric,
    /// Merge criterion for Agglomerative.
    pub linkage: Linkage,
    /// Neighbourhood radius for DBSCAN and OPTICS extraction. Must be positive.
    pub eps: f32,
    /// Update damping for Affinity propagation, in `[0.5, 1)`.
    pub damping: f32,
    /// Core-point threshold for DBSCAN/OPTICS. Minimum 1.
    pub min_samples: usize,
    /// Seed threaded to every stochastic algorithm variant.
    pub seed: u64,
    /// Whether the boundary reporting step should export spatial maps.
    pub save_maps: bool,
}

impl Default for ClustimeConfig {
    fn default() -> Self {
        Self {
            component: SignalComponent::Whole,
            correlation: CorrelationMode::Standard,
            processing: ProcessingMode::None,
            window_size: 1,
            near: 1,
            thr: 95.0,
            contrast: 1.0,
            tr: 0.5,
            algorithm: Algorithm::Infomap,
            thr_infomap: 90.0,
            n_clusters: 7,
            metric: Metric::Euclidean,
            linkage: Linkage::Ward,
            eps: 0.3,
            damping: 0.5,
            min_samples: 5,
            seed: 0,
            save_maps: false,
        }
    }
}

impl ClustimeConfig {
    /// Set the clustering algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the signal component filter.
    #[must_use]
    pub fn with_component(mut self, component: SignalComponent) -> Self {
        self.component = component;
        self
    }

    /// Set the correlation mode.
    #[must_use]
    pub fn with_correlation(mut self, correlation: CorrelationMode) -> Self {
        self.correlation = correlation;
        self
    }

    /// Set the processing mode.
    #[must_use]
    pub fn with_processing(mut self, processing: ProcessingMode) -> Self {
        self.processing = processing;
        self
    }

    /// Set the window length. Not clamped; use [`Self::validate`].
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the RSS neighbourhood radius.
    #[must_use]
    pub fn with_near(mut self, near: usize) -> Self {
        self.near = near;
        self
    }

    /// Set the `thr` processing percentile. Not clamped; use [`Self::validate`].
    #[must_use]
    pub fn with_thr(mut self, thr: f32) -> Self {
        self.thr = thr;
        self
    }

    /// Set the contrast factor for `double` processing.
    #[must_use]
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    /// Set the repetition time in seconds.
    #[must_use]
    pub fn with_tr(mut self, tr: f32) -> Self {
        self.tr = tr;
        self
    }

    /// Set the community-family binarization percentile.
    #[must_use]
    pub fn with_thr_infomap(mut self, thr_infomap: f32) -> Self {
        self.thr_infomap = thr_infomap;
        self
    }

    /// Set the cluster count for KMeans/Agglomerative.
    #[must_use]
    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Set the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the agglomerative linkage criterion.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the DBSCAN/OPTICS neighbourhood radius.
    #[must_use]
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    /// Set the affinity-propagation damping factor.
    #[must_use]
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Set the DBSCAN/OPTICS core-point threshold.
    #[must_use]
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set the RNG seed for stochastic variants.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Request spatial-map export from the boundary reporting step.
    #[must_use]
    pub fn with_save_maps(mut self, save_maps: bool) -> Self {
        self.save_maps = save_maps;
        self
    }

    /// Validate every scalar parameter. Called at the top of
    /// [`crate::pipeline::run`] so configuration errors abort before any
    /// computation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending parameter when:
    /// - `thr` or `thr_infomap` leaves `[0, 100]`
    /// - `window_size == 0` or `n_clusters == 0` or `min_samples == 0`
    /// - `contrast` is non-positive or non-finite
    /// - `eps` is non-positive or non-finite
    /// - `damping` leaves `[0.5, 1)`
    /// - `tr` is non-positive or non-finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.thr) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "thr",
                value: self.thr,
            });
        }
        if !(0.0..=100.0).contains(&self.thr_infomap) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "thr_infomap",
                value: self.thr_infomap,
            });
        }
        if self.window_size == 0 {
            return Err(ConfigError::invalid(
                "window_size",
                "must be at least 1, got 0",
            ));
        }
        if self.n_clusters == 0 {
            return Err(ConfigError::invalid(
                "n_clusters",
                "must be at least 1, got 0",
            ));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::invalid(
                "min_samples",
                "must be at least 1, got 0",
            ));
        }
        if !self.contrast.is_finite() || self.contrast <= 0.0 {
            return Err(ConfigError::invalid(
                "contrast",
                format!("must be a positive finite number, got {}", self.contrast),
            ));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ConfigError::invalid(
                "eps",
                format!("must be a positive finite number, got {}", self.eps),
            ));
        }
        if !(0.5..1.0).contains(&self.damping) {
            return Err(ConfigError::invalid(
                "damping",
                format!("must be within [0.5, 1), got {}", self.damping),
            ));
        }
        if !self.tr.is_finite() || self.tr <= 0.0 {
            return Err(ConfigError::invalid(
                "TR",
                format!("must be a positive finite number, got {}", self.tr),
            ));
        }
        Ok(())
    }
}
