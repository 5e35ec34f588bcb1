//! Structured results of CLI commands

use pakpatch_core::{
    CompressionConfig, ErrorKind, FieldCandidate, PatchResult, PatchWarning, ReplacementKind,
    SegmentStart, SizeAdjustment,
};
use serde::Serialize;
use std::path::PathBuf;

/// Why a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Core codec error
    Patch(ErrorKind),
    /// Reading or writing files
    Io,
    /// Worker task panicked or was cancelled
    Internal,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Archive written without warnings
    Completed,
    /// Archive written, with warnings
    Degraded,
    /// No archive written
    Failed {
        /// Failure class
        kind: FailureKind,
        /// Error message
        message: String,
    },
}

impl RunStatus {
    /// Short label for tables
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Complete",
            Self::Degraded => "Warning",
            Self::Failed { .. } => "Failed",
        }
    }

    /// Whether the run produced no archive
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Report for one device of a `patch` or `batch` invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Position in the batch, starting at 0
    pub run_id: usize,
    /// Device name written
    pub device: String,
    /// Outcome
    #[serde(flatten)]
    pub status: RunStatus,
    /// Token that was replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// How the device name was fitted to the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_kind: Option<ReplacementKind>,
    /// Offset of the compressed payload in the archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Compression configuration of the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<CompressionConfig>,
    /// How the recompressed payload was fitted to its slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<SizeAdjustment>,
    /// Non-fatal problems
    pub warnings: Vec<PatchWarning>,
    /// Written archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Wall time of the run
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Report for a run whose archive was written to `output`
    pub fn success(
        run_id: usize,
        device: String,
        result: &PatchResult,
        output: PathBuf,
        elapsed_ms: u64,
    ) -> Self {
        let status = if result.is_degraded() {
            RunStatus::Degraded
        } else {
            RunStatus::Completed
        };
        Self {
            run_id,
            device,
            status,
            old_value: Some(result.replacement.old_value.clone()),
            replacement_kind: Some(result.replacement.kind),
            offset: Some(result.offset),
            config: Some(result.config),
            adjustment: Some(result.adjustment),
            warnings: result.warnings.clone(),
            output: Some(output),
            elapsed_ms,
        }
    }

    /// Report for a failed run
    pub fn failure(
        run_id: usize,
        device: String,
        kind: FailureKind,
        message: String,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            run_id,
            device,
            status: RunStatus::Failed { kind, message },
            old_value: None,
            replacement_kind: None,
            offset: None,
            config: None,
            adjustment: None,
            warnings: Vec::new(),
            output: None,
            elapsed_ms,
        }
    }
}

/// Result of `scan`
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Payload size in bytes
    pub payload_len: usize,
    /// Replaceable tokens in scan order
    pub candidates: Vec<FieldCandidate>,
    /// Devices listed in the frame-rate catalogue
    pub device_ids: Vec<String>,
}

/// Where a payload sits in an archive, if anywhere
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PayloadLocation {
    /// Payload found
    Found {
        /// Offset of the compressed payload
        offset: usize,
        /// Compressed length
        len: usize,
        /// Configuration that reproduces it
        config: CompressionConfig,
    },
    /// No configuration reproduced the payload
    NotFound {
        /// Configurations tried
        configs_tried: usize,
    },
}

/// Result of `inspect`
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    /// Archive size in bytes
    pub container_len: usize,
    /// Cipher segments
    pub segments: Vec<SegmentStart>,
    /// Payload location when a payload was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PayloadLocation>,
}
