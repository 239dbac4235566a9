//! Boundary inputs: the masked signal matrix and optional task timings.
//!
//! The mask-fitting/extraction step itself lives outside this crate; what
//! arrives here is an already-extracted `[nscans, nvoxels]` matrix, either
//! built in memory or loaded from a whitespace-delimited text file (one time
//! point per row).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::SignalComponent;
use crate::error::{CoreError, CoreResult};

/// Real-valued `[nscans, nvoxels]` signal; rows are time points in temporal
/// order. Read-only to the pipeline after component filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    data: Vec<f32>,
    nscans: usize,
    nvoxels: usize,
}

impl SignalMatrix {
    /// Build from row-major data.
    ///
    /// # Errors
    ///
    /// [`CoreError::ShapeMismatch`] when the buffer length disagrees with
    /// the dimensions.
    pub fn from_raw(data: Vec<f32>, nscans: usize, nvoxels: usize) -> CoreResult<Self> {
        if data.len() != nscans * nvoxels {
            return Err(CoreError::ShapeMismatch {
                what: "signal buffer vs dimensions",
                expected: nscans * nvoxels,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            nscans,
            nvoxels,
        })
    }

    /// Build from a sequence of equally-long rows.
    ///
    /// # Errors
    ///
    /// [`CoreError::ShapeMismatch`] when row lengths disagree.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> CoreResult<Self> {
        let nscans = rows.len();
        let nvoxels = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nscans * nvoxels);
        for row in &rows {
            if row.len() != nvoxels {
                return Err(CoreError::ShapeMismatch {
                    what: "signal row length",
                    expected: nvoxels,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            nscans,
            nvoxels,
        })
    }

    /// Load from a whitespace-delimited text file, one time point per row.
    ///
    /// # Errors
    ///
    /// I/O errors, non-numeric tokens ([`CoreError::Parse`]), or ragged rows.
    pub fn load_text(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut rows: Vec<Vec<f32>> = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row = trimmed
                .split_whitespace()
                .map(|token| {
                    token.parse::<f32>().map_err(|_| CoreError::Parse {
                        path: path.display().to_string(),
                        line: lineno + 1,
                        token: token.to_string(),
                    })
                })
                .collect::<CoreResult<Vec<f32>>>()?;
            rows.push(row);
        }
        let signal = Self::from_rows(rows)?;
        debug!(
            nscans = signal.nscans,
            nvoxels = signal.nvoxels,
            path = %path.display(),
            "loaded signal matrix"
        );
        Ok(signal)
    }

    /// Number of time points.
    #[inline]
    pub fn nscans(&self) -> usize {
        self.nscans
    }

    /// Number of voxels (features) per time point.
    #[inline]
    pub fn nvoxels(&self) -> usize {
        self.nvoxels
    }

    /// Time point `i` as a feature slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.nvoxels..(i + 1) * self.nvoxels]
    }

    /// Apply sign filtering before correlation: `positive` zeroes negative
    /// values, `negative` zeroes positive values, `whole` passes through.
    #[must_use]
    pub fn filtered(mut self, component: SignalComponent) -> Self {
        match component {
            SignalComponent::Whole => {}
            SignalComponent::Positive => {
                for value in &mut self.data {
                    if *value < 0.0 {
                        *value = 0.0;
                    }
                }
            }
            SignalComponent::Negative => {
                for value in &mut self.data {
                    if *value > 0.0 {
                        *value = 0.0;
                    }
                }
            }
        }
        self
    }
}

/// Optional condition-index → onset-times mapping (in TR units), used only
/// to annotate downstream reports. Empty when no timing file was supplied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskTimings {
    onsets: BTreeMap<usize, Vec<f32>>,
}

impl TaskTimings {
    /// Empty mapping: no timing annotation requested.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load one onset list per file; the condition index is the position of
    /// the file in `paths`. Files are whitespace-delimited numbers.
    ///
    /// # Errors
    ///
    /// I/O errors or non-numeric tokens.
    pub fn load(paths: &[impl AsRef<Path>]) -> CoreResult<Self> {
        let mut onsets = BTreeMap::new();
        for (condition, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let content = fs::read_to_string(path)?;
            let mut times = Vec::new();
            for (lineno, line) in content.lines().enumerate() {
                for token in line.split_whitespace() {
                    let value = token.parse::<f32>().map_err(|_| CoreError::Parse {
                        path: path.display().to_string(),
                        line: lineno + 1,
                        token: token.to_string(),
                    })?;
                    times.push(value);
                }
            }
            onsets.insert(condition, times);
        }
        Ok(Self { onsets })
    }

    /// True when no timing file was supplied.
    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    /// Onset times for one condition.
    pub fn condition(&self, index: usize) -> Option<&[f32]> {
        self.onsets.get(&index).map(Vec::as_slice)
    }

    /// Iterate `(condition, onsets)` pairs in condition order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> {
        self.onsets.iter().map(|(&k, v)| (k, v.as_slice()))
    }
}
