//! Device field discovery and replacement inside a payload
//!
//! Device identifiers are stored as upper-case tokens (`CPH2649`, `SM-X910`)
//! terminated by a delimiter: a U+FFFD replacement character (`EF BF BD`), a
//! NUL byte, or `|`. The payload has to keep its length, so a replacement value
//! is fitted to an existing token: an equal-length token is preferred, then the
//! token closest in length, with zero padding or truncation as needed.

use crate::error::{PatchError, Result};
use regex::bytes::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Shortest token considered a device field
pub const MIN_TOKEN_LEN: usize = 5;

/// Longest token considered a device field
pub const MAX_TOKEN_LEN: usize = 16;

#[allow(clippy::expect_used)]
static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)([A-Z0-9][A-Z0-9\-]{4,15})(?:\xEF\xBF\xBD|\x00|\|)")
        .expect("candidate pattern is valid")
});

#[allow(clippy::expect_used)]
static CATALOGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)([A-Z0-9|\-]+)(?:\xEF\xBF\xBD){3,4}120").expect("catalogue pattern is valid")
});

/// A token that can carry a device identifier
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldCandidate {
    /// Offset of the token's first byte in the payload
    pub offset: usize,
    /// Token text (ASCII)
    pub value: String,
}

impl FieldCandidate {
    /// Token length in bytes
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Always false; tokens are at least [`MIN_TOKEN_LEN`] bytes
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// How the new value was fitted to the replaced token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ReplacementKind {
    /// Token and value have the same length
    Exact,
    /// Value was zero-padded to the token length
    Padded {
        /// Zero bytes appended
        bytes: usize,
    },
    /// Value was cut to the token length
    Truncated {
        /// Bytes of the value dropped
        bytes: usize,
    },
}

/// Result of [`FieldPatcher::replace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReplacement {
    /// Payload with the token overwritten; same length as the input
    pub patched: Vec<u8>,
    /// Token that was overwritten
    pub old_value: String,
    /// Bytes written in its place
    pub written: Vec<u8>,
    /// Offset of the overwritten token
    pub offset: usize,
    /// How the value was fitted
    pub kind: ReplacementKind,
}

impl FieldReplacement {
    /// Written value without zero padding, lossily decoded
    pub fn written_str(&self) -> String {
        let end = self
            .written
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.written[..end]).into_owned()
    }
}

/// Finds and replaces device fields
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPatcher;

impl FieldPatcher {
    /// Every delimited token in `payload`, in scan order.
    ///
    /// Matches do not overlap. A run longer than [`MAX_TOKEN_LEN`] yields its
    /// trailing [`MAX_TOKEN_LEN`] bytes, the longest suffix that still ends at
    /// the delimiter.
    pub fn candidates(payload: &[u8]) -> Vec<FieldCandidate> {
        CANDIDATE
            .captures_iter(payload)
            .filter_map(|caps| caps.get(1))
            .map(|m| FieldCandidate {
                offset: m.start(),
                value: String::from_utf8_lossy(m.as_bytes()).into_owned(),
            })
            .collect()
    }

    /// Replace one device field in `payload` with `new_value`.
    ///
    /// The first token whose length equals `new_value` wins. Otherwise the
    /// token closest in length is used (earliest on ties): a longer token gets
    /// the value padded with zero bytes, a shorter one gets it truncated. Only
    /// the chosen token's bytes change.
    ///
    /// # Errors
    ///
    /// [`PatchError::EmptyFieldValue`] for an empty value,
    /// [`PatchError::NoCandidateField`] when the payload has no tokens.
    pub fn replace(payload: &[u8], new_value: &str) -> Result<FieldReplacement> {
        let value = new_value.as_bytes();
        if value.is_empty() {
            return Err(PatchError::EmptyFieldValue);
        }

        let candidates = Self::candidates(payload);
        debug!(count = candidates.len(), len = value.len(), "scanned device fields");

        let chosen = candidates
            .iter()
            .find(|c| c.len() == value.len())
            .or_else(|| {
                candidates
                    .iter()
                    .min_by_key(|c| c.len().abs_diff(value.len()))
            })
            .ok_or(PatchError::NoCandidateField)?;

        let token_len = chosen.len();
        let (written, kind) = if token_len == value.len() {
            (value.to_vec(), ReplacementKind::Exact)
        } else if token_len > value.len() {
            let mut padded = value.to_vec();
            padded.resize(token_len, 0);
            (
                padded,
                ReplacementKind::Padded {
                    bytes: token_len - value.len(),
                },
            )
        } else {
            warn!(
                value = new_value,
                token = %chosen.value,
                "no device field long enough, value truncated"
            );
            (
                value[..token_len].to_vec(),
                ReplacementKind::Truncated {
                    bytes: value.len() - token_len,
                },
            )
        };

        let mut patched = payload.to_vec();
        patched[chosen.offset..chosen.offset + token_len].copy_from_slice(&written);

        Ok(FieldReplacement {
            patched,
            old_value: chosen.value.clone(),
            written,
            offset: chosen.offset,
            kind,
        })
    }

    /// Device identifiers listed in the payload's frame-rate catalogue.
    ///
    /// Catalogue entries are `|`-separated identifiers followed by three or
    /// four replacement characters and the literal `120`.
    pub fn device_ids(payload: &[u8]) -> Vec<String> {
        CATALOGUE
            .captures_iter(payload)
            .filter_map(|caps| caps.get(1))
            .flat_map(|m| {
                String::from_utf8_lossy(m.as_bytes())
                    .split('|')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Replace one device field; see [`FieldPatcher::replace`]
pub fn replace_field(payload: &[u8], new_value: &str) -> Result<FieldReplacement> {
    FieldPatcher::replace(payload, new_value)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const FFFD: &[u8] = b"\xef\xbf\xbd";

    fn payload(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn test_candidates_all_delimiters() {
        let data = payload(&[
            b"hdr ",
            b"CPH2649",
            FFFD,
            b"xx SM-X910\0 ",
            b"RMX5011|",
            b"tail",
        ]);

        let found = FieldPatcher::candidates(&data);
        let values: Vec<&str> = found.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, ["CPH2649", "SM-X910", "RMX5011"]);
        assert_eq!(found[0].offset, 4);
        assert_eq!(&data[found[1].offset..found[1].offset + 7], b"SM-X910");
    }

    #[test]
    fn test_candidates_rejects_bad_tokens() {
        // Too short, lower case, no delimiter, leading hyphen skipped
        let data = payload(&[b"ABCD\0", b"abcdef\0", b"QWERTY ", b"-ZXCVB\0"]);

        let found = FieldPatcher::candidates(&data);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "ZXCVB");
    }

    #[test]
    fn test_candidates_long_run_keeps_suffix() {
        let data = b"__ABCDEFGHIJKLMNOPQ\0";

        let found = FieldPatcher::candidates(data);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "BCDEFGHIJKLMNOPQ");
        assert_eq!(found[0].offset, 3);
    }

    #[test]
    fn test_replace_exact_first_only() {
        let data = payload(&[b"CPH2649", FFFD, b"SM-X910", FFFD, b"120"]);

        let result = FieldPatcher::replace(&data, "RMX5011").unwrap();

        assert_eq!(result.old_value, "CPH2649");
        assert_eq!(result.kind, ReplacementKind::Exact);
        assert_eq!(result.offset, 0);
        assert_eq!(
            result.patched,
            payload(&[b"RMX5011", FFFD, b"SM-X910", FFFD, b"120"])
        );
        assert_eq!(result.patched.len(), data.len());
    }

    #[test]
    fn test_replace_prefers_exact_length_over_position() {
        let data = payload(&[b"ABCDEFGH\0", b"SM-X910\0"]);

        let result = FieldPatcher::replace(&data, "RMX5011").unwrap();
        assert_eq!(result.old_value, "SM-X910");
        assert_eq!(&result.patched[..9], b"ABCDEFGH\0");
    }

    #[test]
    fn test_replace_pads_longer_token() {
        let data = payload(&[b"x|SM-S9280ZC|y"]);

        let result = FieldPatcher::replace(&data, "RMX5011").unwrap();

        assert_eq!(result.old_value, "SM-S9280ZC");
        assert_eq!(result.kind, ReplacementKind::Padded { bytes: 3 });
        assert_eq!(result.written, b"RMX5011\0\0\0");
        assert_eq!(result.written_str(), "RMX5011");
        assert_eq!(result.patched, b"x|RMX5011\0\0\0|y");
    }

    #[test]
    fn test_replace_truncates_shorter_token() {
        let data = payload(&[b"V2250\0"]);

        let result = FieldPatcher::replace(&data, "SM-X910B").unwrap();

        assert_eq!(result.old_value, "V2250");
        assert_eq!(result.kind, ReplacementKind::Truncated { bytes: 3 });
        assert_eq!(result.patched, b"SM-X9\0");
    }

    #[test]
    fn test_replace_closest_length_earliest_tie() {
        // Value is 7 bytes; 6 and 8 byte tokens tie at distance 1
        let data = payload(&[b"ABCDEFGHIJ\0", b"ABCDEF\0", b"ABCDEFGH\0"]);

        let result = FieldPatcher::replace(&data, "RMX5011").unwrap();
        assert_eq!(result.old_value, "ABCDEF");
        assert_eq!(result.offset, 11);
    }

    #[test]
    fn test_replace_no_candidates() {
        let err = FieldPatcher::replace(b"nothing to see here", "RMX5011").unwrap_err();
        assert!(matches!(err, PatchError::NoCandidateField));
    }

    #[test]
    fn test_replace_empty_value() {
        let err = replace_field(b"CPH2649\0", "").unwrap_err();
        assert!(matches!(err, PatchError::EmptyFieldValue));
    }

    #[test]
    fn test_device_ids_catalogue() {
        let data = payload(&[
            b"\x00\x00CPH2649|SM-X910|RMX5011",
            FFFD,
            FFFD,
            FFFD,
            b"120",
            FFFD,
            b"\x00PGT-AN10",
            FFFD,
            FFFD,
            FFFD,
            FFFD,
            b"120",
            b"\x00V2250",
            FFFD,
            b"60",
        ]);

        assert_eq!(
            FieldPatcher::device_ids(&data),
            ["CPH2649", "SM-X910", "RMX5011", "PGT-AN10"]
        );
    }
}
