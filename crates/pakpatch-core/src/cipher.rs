//! Feedback XOR cipher used by the container's outer obfuscation layer.
//!
//! The container is a sequence of segments. A segment starts wherever the
//! ciphertext holds a [`Signature`] from the [`SignatureKeyTable`]; bytes
//! before the first signature are stored in the clear. Inside a segment the
//! first [`KEY_LEN`] bytes are XORed with the segment key and every later byte
//! is XORed with the plaintext byte [`KEY_LEN`] positions earlier:
//!
//! ```text
//! plain[i] = cipher[i] ^ key[i - start]          if i - start <  KEY_LEN
//! plain[i] = cipher[i] ^ plain[i - KEY_LEN]      otherwise
//! ```
//!
//! Signatures are always detected in the ciphertext. Re-encoding a modified
//! plaintext therefore takes the original ciphertext as a reference so that
//! segment boundaries stay where they were.
//!
//! ## Security Warning
//!
//! This is an obfuscation scheme, not encryption. The keys are public and the
//! keystream is derived from the plaintext itself.
//!
//! ## Usage
//!
//! ```rust
//! use pakpatch_core::cipher::FeedbackCipher;
//!
//! let cipher = FeedbackCipher::default();
//! let encoded = [0x00, 0x9D, 0xC7, 0x4C, 0xD2, 0x7C, 0x99];
//! let decoded = cipher.decode(&encoded);
//! assert_eq!(decoded, [0x00, 0x78, 0x9C, 0x02, 0x03, 0x04, 0x05]);
//!
//! let reencoded = cipher.encode(&encoded, &decoded).expect("lengths match");
//! assert_eq!(reencoded, encoded);
//! ```

use crate::error::{PatchError, Result};
use crate::keys::{KEY_LEN, SegmentKey, Signature, SignatureKeyTable};

/// Position of a segment signature inside an encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SegmentStart {
    /// Absolute offset of the signature's first byte
    pub offset: usize,
    /// Signature found at `offset`
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_signature"))]
    pub signature: Signature,
}

#[cfg(feature = "serde")]
fn serialize_signature<S: serde::Serializer>(
    signature: &Signature,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(signature)
}

/// Segment currently being processed
#[derive(Debug, Clone, Copy)]
struct ActiveSegment {
    start: usize,
    key: SegmentKey,
}

impl ActiveSegment {
    /// Byte XORed with the data byte at `offset`.
    ///
    /// `plain` must hold the plaintext for every offset before `offset`.
    #[inline]
    fn mask(&self, offset: usize, plain: &[u8]) -> u8 {
        let pos = offset - self.start;
        if pos < KEY_LEN {
            self.key.0[pos]
        } else {
            plain[offset - KEY_LEN]
        }
    }
}

/// Feedback cipher bound to a signature table
#[derive(Debug, Clone, Copy)]
pub struct FeedbackCipher<'a> {
    table: &'a SignatureKeyTable,
}

impl Default for FeedbackCipher<'static> {
    fn default() -> Self {
        Self::new(SignatureKeyTable::builtin())
    }
}

impl<'a> FeedbackCipher<'a> {
    /// Create a cipher that recognises the signatures in `table`
    pub const fn new(table: &'a SignatureKeyTable) -> Self {
        Self { table }
    }

    /// Signature table in use
    pub const fn table(&self) -> &'a SignatureKeyTable {
        self.table
    }

    /// Decode an encoded stream.
    ///
    /// The output has the same length as the input. Bytes before the first
    /// signature are copied unchanged; a segment that ends before
    /// [`KEY_LEN`] bytes have been consumed simply stops.
    pub fn decode(&self, encoded: &[u8]) -> Vec<u8> {
        let mut plain = Vec::with_capacity(encoded.len());
        let mut segment: Option<ActiveSegment> = None;

        for (offset, &byte) in encoded.iter().enumerate() {
            if let Some((_, key)) = self.table.lookup_at(encoded, offset) {
                segment = Some(ActiveSegment { start: offset, key });
            }
            let out = match segment {
                Some(seg) => byte ^ seg.mask(offset, &plain),
                None => byte,
            };
            plain.push(out);
        }

        plain
    }

    /// Encode `modified` using `original` as the segment reference.
    ///
    /// Signatures are looked up in `original` (the ciphertext the plaintext
    /// was decoded from), never in `modified`, so the result has the same
    /// segment boundaries as `original`. Feedback bytes come from `modified`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::LengthMismatch`] if the two buffers differ in
    /// length.
    pub fn encode(&self, original: &[u8], modified: &[u8]) -> Result<Vec<u8>> {
        if original.len() != modified.len() {
            return Err(PatchError::LengthMismatch {
                expected: original.len(),
                actual: modified.len(),
            });
        }

        let mut encoded = Vec::with_capacity(modified.len());
        let mut segment: Option<ActiveSegment> = None;

        for (offset, &byte) in modified.iter().enumerate() {
            if let Some((_, key)) = self.table.lookup_at(original, offset) {
                segment = Some(ActiveSegment { start: offset, key });
            }
            let out = match segment {
                Some(seg) => byte ^ seg.mask(offset, modified),
                None => byte,
            };
            encoded.push(out);
        }

        Ok(encoded)
    }

    /// Every segment start in `encoded`, in stream order.
    ///
    /// A signature inside a running segment still opens a new one, so starts
    /// may be closer together than [`KEY_LEN`].
    pub fn segments(&self, encoded: &[u8]) -> Vec<SegmentStart> {
        (0..encoded.len())
            .filter_map(|offset| {
                self.table
                    .lookup_at(encoded, offset)
                    .map(|(signature, _)| SegmentStart { offset, signature })
            })
            .collect()
    }
}

/// Decode with the builtin signature table
pub fn decode(encoded: &[u8]) -> Vec<u8> {
    FeedbackCipher::default().decode(encoded)
}

/// Encode with the builtin signature table; see [`FeedbackCipher::encode`]
pub fn encode(original: &[u8], modified: &[u8]) -> Result<Vec<u8>> {
    FeedbackCipher::default().encode(original, modified)
}
