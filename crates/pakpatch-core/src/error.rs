//! Error types for the patch codec

use thiserror::Error;

/// Errors produced by the codec and the patch pipeline.
///
/// Every variant is fatal to the operation that returned it. Non-fatal
/// conditions (truncation, layout drift) are reported as
/// [`PatchWarning`](crate::pipeline::PatchWarning) instead.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Reference ciphertext and plaintext passed to the encoder differ in length
    #[error("length mismatch: reference is {expected} bytes, plaintext is {actual} bytes")]
    LengthMismatch {
        /// Length of the reference (original encoded) stream
        expected: usize,
        /// Length of the plaintext being encoded
        actual: usize,
    },

    /// No compression configuration reproduces the payload inside the container
    #[error("compressed payload ({payload_len} bytes plaintext) not found after {configs_tried} configurations")]
    SegmentNotFound {
        /// Plaintext length of the payload that was searched for
        payload_len: usize,
        /// Number of compression configurations tried
        configs_tried: usize,
    },

    /// Payload contains no token that can carry the new field value
    #[error("no replaceable device field found in payload")]
    NoCandidateField,

    /// Replacement field value is empty
    #[error("replacement field value is empty")]
    EmptyFieldValue,

    /// Compression level outside 0..=9
    #[error("invalid compression level: {0} (must be 0-9)")]
    InvalidLevel(u32),

    /// Compression or decompression failed
    #[error("compression error: {0}")]
    Compression(String),
}

/// Coarse classification of [`PatchError`] used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// Cipher length invariant violated
    LengthMismatch,
    /// Payload could not be located in the container
    SegmentNotFound,
    /// No device field to replace
    NoCandidateField,
    /// Caller supplied an unusable argument
    InvalidInput,
    /// Compression backend failure
    Compression,
}

impl PatchError {
    /// Stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            Self::SegmentNotFound { .. } => ErrorKind::SegmentNotFound,
            Self::NoCandidateField => ErrorKind::NoCandidateField,
            Self::EmptyFieldValue | Self::InvalidLevel(_) => ErrorKind::InvalidInput,
            Self::Compression(_) => ErrorKind::Compression,
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, PatchError>;
