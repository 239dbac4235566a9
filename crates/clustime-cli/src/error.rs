//! CLI exit-code mapping.
//!
//! Exit codes:
//! - 0: success
//! - 1: recoverable error (bad parameters, unreadable input)
//! - 2: invariant violation inside the pipeline (shape mismatch); a bug or
//!   corrupted intermediate state, never a user mistake

use std::process::ExitCode;

use clustime_core::CoreError;

/// Exit codes for the clustime binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    /// Run completed, outputs written.
    Success = 0,
    /// Configuration or I/O error; rerun with fixed inputs.
    Error = 1,
    /// Internal invariant violation.
    Invariant = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&CoreError> for CliExitCode {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::ShapeMismatch { .. } => CliExitCode::Invariant,
            CoreError::Config(_)
            | CoreError::TooFewTimePoints { .. }
            | CoreError::Io(_)
            | CoreError::Parse { .. } => CliExitCode::Error,
        }
    }
}
