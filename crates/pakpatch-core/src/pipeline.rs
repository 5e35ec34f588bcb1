//! End-to-end container patching
//!
//! ```text
//! encoded ──decode──▶ decoded ──locate(payload)──▶ offset, config
//!                                                      │
//! payload ──replace field──▶ patched ──compress(config)──▶ reconcile(len)
//!                                                      │
//! encoded ◀──encode(reference = original)── decoded with span replaced
//! ```
//!
//! The container length never changes. Any error aborts the run before a
//! container is produced; degraded but complete results carry
//! [`PatchWarning`]s.

use crate::cipher::FeedbackCipher;
use crate::compression::{CompressionConfig, compress, decompress};
use crate::error::Result;
use crate::field::{FieldPatcher, FieldReplacement};
use crate::keys::SignatureKeyTable;
use crate::locator::SegmentLocator;
use crate::reconcile::{SizeAdjustment, reconcile};
use std::fmt;
use tracing::{debug, info, warn};

/// Non-fatal problem with a completed patch
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum PatchWarning {
    /// Recompressed payload was longer than its slot and got cut
    Truncated {
        /// Length of the slot (original compressed payload)
        original_len: usize,
        /// Length of the recompressed patched payload
        recompressed_len: usize,
    },
    /// Spliced bytes no longer inflate to the patched payload
    PayloadUnreadable {
        /// Why verification failed
        reason: String,
    },
    /// A decoder would split the new container into different segments
    LayoutShifted {
        /// Segment count in the original container
        expected_segments: usize,
        /// Segment count in the new container
        actual_segments: usize,
        /// First offset where the segment lists disagree
        first_offset: usize,
    },
}

impl fmt::Display for PatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                original_len,
                recompressed_len,
            } => write!(
                f,
                "recompressed payload truncated from {recompressed_len} to {original_len} bytes"
            ),
            Self::PayloadUnreadable { reason } => {
                write!(f, "patched payload does not inflate cleanly: {reason}")
            }
            Self::LayoutShifted {
                expected_segments,
                actual_segments,
                first_offset,
            } => write!(
                f,
                "segment layout changed at offset {first_offset} ({expected_segments} -> {actual_segments} segments)"
            ),
        }
    }
}

/// Output of a successful patch
#[derive(Debug, Clone)]
pub struct PatchResult {
    /// New encoded container, same length as the input
    pub container: Vec<u8>,
    /// Field replacement applied to the payload
    pub replacement: FieldReplacement,
    /// Offset of the compressed payload in the container
    pub offset: usize,
    /// Compression configuration the payload was found under
    pub config: CompressionConfig,
    /// Length of the original compressed payload (the slot)
    pub original_len: usize,
    /// Length of the recompressed patched payload before fitting
    pub recompressed_len: usize,
    /// How the recompressed payload was fitted to the slot
    pub adjustment: SizeAdjustment,
    /// Non-fatal problems
    pub warnings: Vec<PatchWarning>,
}

impl PatchResult {
    /// Whether any warning was raised
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether the recompressed payload had to be cut
    pub fn is_truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PatchWarning::Truncated { .. }))
    }
}

/// Patches one device field of a container's embedded payload
#[derive(Debug, Clone)]
pub struct PatchPipeline<'a> {
    cipher: FeedbackCipher<'a>,
    locator: SegmentLocator,
    verify: bool,
}

impl Default for PatchPipeline<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchPipeline<'static> {
    /// Pipeline using the builtin signature table
    pub fn new() -> Self {
        Self::with_table(SignatureKeyTable::builtin())
    }
}

impl<'a> PatchPipeline<'a> {
    /// Pipeline using `table` for the outer cipher
    pub fn with_table(table: &'a SignatureKeyTable) -> Self {
        Self {
            cipher: FeedbackCipher::new(table),
            locator: SegmentLocator::new(),
            verify: true,
        }
    }

    /// Replace the payload search plan
    pub fn with_locator(mut self, locator: SegmentLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Enable or disable post-patch verification (on by default).
    ///
    /// Verification inflates the spliced payload and compares the segment
    /// layout of the new container with the original.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Replace one device field of `payload` inside `encoded`.
    ///
    /// `payload` is the plaintext of the embedded file as shipped; it is
    /// located in the decoded container by recompression, patched with
    /// `new_value`, recompressed under the same configuration, fitted to the
    /// original slot and re-encoded.
    ///
    /// # Errors
    ///
    /// [`PatchError::NoCandidateField`](crate::PatchError::NoCandidateField),
    /// [`PatchError::SegmentNotFound`](crate::PatchError::SegmentNotFound),
    /// [`PatchError::EmptyFieldValue`](crate::PatchError::EmptyFieldValue),
    /// or a compression failure. No container is produced on error.
    pub fn patch(&self, encoded: &[u8], payload: &[u8], new_value: &str) -> Result<PatchResult> {
        let decoded = self.cipher.decode(encoded);
        debug!(len = decoded.len(), "decoded container");

        let replacement = FieldPatcher::replace(payload, new_value)?;
        info!(
            old = %replacement.old_value,
            new = new_value,
            offset = replacement.offset,
            "selected device field"
        );

        let located = self.locator.locate(&decoded, payload)?;
        let span = located.span();
        let original_len = located.compressed.len();

        let recompressed = compress(&replacement.patched, located.config)?;
        let recompressed_len = recompressed.len();
        let adjustment = SizeAdjustment::between(recompressed_len, original_len);
        debug!(original_len, recompressed_len, %adjustment, "recompressed patched payload");

        let mut warnings = Vec::new();
        if adjustment.is_lossy() {
            warnings.push(PatchWarning::Truncated {
                original_len,
                recompressed_len,
            });
        }

        let fitted = reconcile(recompressed, original_len);
        let mut spliced = decoded;
        spliced[span.clone()].copy_from_slice(&fitted);

        if self.verify {
            if let Some(warning) =
                Self::check_payload(&spliced[span], located.config, &replacement.patched)
            {
                warnings.push(warning);
            }
        }

        let container = self.cipher.encode(encoded, &spliced)?;

        if self.verify {
            if let Some(warning) = self.check_layout(encoded, &container) {
                warnings.push(warning);
            }
        }

        for warning in &warnings {
            warn!(%warning, "patch degraded");
        }

        Ok(PatchResult {
            container,
            replacement,
            offset: located.offset,
            config: located.config,
            original_len,
            recompressed_len,
            adjustment,
            warnings,
        })
    }

    fn check_payload(
        slot: &[u8],
        config: CompressionConfig,
        expected: &[u8],
    ) -> Option<PatchWarning> {
        match decompress(slot, config.framing) {
            Ok(inflated) if inflated == expected => None,
            Ok(inflated) => Some(PatchWarning::PayloadUnreadable {
                reason: format!(
                    "inflated {} bytes, expected {}",
                    inflated.len(),
                    expected.len()
                ),
            }),
            Err(e) => Some(PatchWarning::PayloadUnreadable {
                reason: e.to_string(),
            }),
        }
    }

    fn check_layout(&self, original: &[u8], patched: &[u8]) -> Option<PatchWarning> {
        let before = self.cipher.segments(original);
        let after = self.cipher.segments(patched);
        if before == after {
            return None;
        }

        let first_offset = before
            .iter()
            .zip(&after)
            .find(|(a, b)| a != b)
            .map_or_else(
                || {
                    // One list is a prefix of the other
                    let shorter = before.len().min(after.len());
                    before
                        .get(shorter)
                        .or_else(|| after.get(shorter))
                        .map_or(0, |s| s.offset)
                },
                |(a, b)| a.offset.min(b.offset),
            );

        Some(PatchWarning::LayoutShifted {
            expected_segments: before.len(),
            actual_segments: after.len(),
            first_offset,
        })
    }
}

/// Patch with the builtin table and default search plan
pub fn patch(encoded: &[u8], payload: &[u8], new_value: &str) -> Result<PatchResult> {
    PatchPipeline::new().patch(encoded, payload, new_value)
}
