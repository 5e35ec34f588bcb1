//! Error types for the command-line front end.

use pakpatch_core::PatchError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input file does not exist or is not a file
    #[error("{what} not found: {}", path.display())]
    MissingInput {
        /// Which input ("pak", "payload")
        what: &'static str,
        /// Path that was given
        path: PathBuf,
    },

    /// Device name failed validation
    #[error("invalid device name '{value}': {reason}")]
    InvalidDevice {
        /// Name as given
        value: String,
        /// Reason for rejection
        reason: &'static str,
    },

    /// Worker count of zero
    #[error("jobs must be at least 1")]
    InvalidJobs,

    /// Batch without any device names
    #[error("no device names given")]
    NoDevices,
}

/// Errors returned by command handlers.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading or writing a file failed
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        /// "read" or "write"
        action: &'static str,
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Core codec error
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Report serialization failed
    #[error("failed to render report: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// One or more runs of a batch failed
    #[error("{failed} of {total} runs failed")]
    RunsFailed {
        /// Failed runs
        failed: usize,
        /// All runs
        total: usize,
    },
}

impl CliError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action: "read",
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action: "write",
            path: path.into(),
            source,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
