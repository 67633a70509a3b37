//! Structured error handling and exit codes.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the picsift application.
///
/// - 0: Success (run completed, whatever the number of per-file failures)
/// - 1: Working directory missing, invalid settings, or an environment failure
/// - 2: Invalid Hamming distance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Run completed.
    Success,
    /// The working directory does not exist or is not a directory.
    MissingDirectory,
    /// The duplicate threshold is outside 0..=64.
    InvalidThreshold,
    /// Any other fatal error (bad settings, cache or log file unavailable).
    GeneralError,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::MissingDirectory | Self::GeneralError => 1,
            Self::InvalidThreshold => 2,
        }
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PS000",
            Self::MissingDirectory => "PS001",
            Self::InvalidThreshold => "PS002",
            Self::GeneralError => "PS100",
        }
    }
}

/// Configuration errors, detected before any work begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The working directory is missing.
    #[error("Working directory not found: {0}")]
    MissingDirectory(PathBuf),

    /// Hamming threshold out of range for 64-bit fingerprints.
    #[error("Invalid threshold {0}. Must be between 0 and 64.")]
    InvalidThreshold(i64),

    /// Crop fraction must keep a non-empty region.
    #[error("Invalid crop fraction {0}. Must be greater than 0 and at most 1.")]
    InvalidCropFraction(f64),

    /// Worker count must be positive.
    #[error("Invalid worker count {0}. Must be at least 1.")]
    InvalidJobs(usize),

    /// Layered settings could not be merged or parsed.
    #[error("Failed to load settings: {0}")]
    Settings(#[from] Box<figment::Error>),
}

impl ConfigError {
    /// Exit code reported for this configuration error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::MissingDirectory(_) => ExitCode::MissingDirectory,
            Self::InvalidThreshold(_) => ExitCode::InvalidThreshold,
            _ => ExitCode::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PS002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
        }
    }
}

/// Map an application error to the exit code it should produce.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<ConfigError>()
        .map_or(ExitCode::GeneralError, ConfigError::exit_code)
}
