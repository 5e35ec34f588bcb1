//! Segment signature and key table
//!
//! Every cipher segment in an encoded container starts with a two-byte
//! signature in the ciphertext. The signature selects the four-byte key that
//! seeds the segment; see [`crate::cipher`] for how the key is consumed.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Length of a segment signature in bytes
pub const SIGNATURE_LEN: usize = 2;

/// Length of a segment key in bytes
pub const KEY_LEN: usize = 4;

/// Two-byte ciphertext marker that opens a new segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

/// Four-byte key seeding a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentKey(pub [u8; KEY_LEN]);

impl Signature {
    /// Parse a signature from hex (`"9DC7"`)
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(hex.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Signature bytes
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl SegmentKey {
    /// Parse a key from hex (`"E55B4ED1"`)
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(hex.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Key bytes
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Signatures and keys observed in shipped containers.
const BUILTIN_ENTRIES: [(Signature, SegmentKey); 2] = [
    (
        Signature([0x9D, 0xC7]),
        SegmentKey([0xE5, 0x5B, 0x4E, 0xD1]),
    ),
    (
        Signature([0x9D, 0x81]),
        SegmentKey([0xE5, 0x1D, 0x4E, 0xD1]),
    ),
];

static BUILTIN: LazyLock<SignatureKeyTable> =
    LazyLock::new(|| SignatureKeyTable::new(BUILTIN_ENTRIES));

/// Immutable mapping from [`Signature`] to [`SegmentKey`]
///
/// Lookups happen at every byte offset of a container, so the table keeps a
/// first-byte filter to reject most offsets with a single index.
#[derive(Debug, Clone)]
pub struct SignatureKeyTable {
    entries: Vec<(Signature, SegmentKey)>,
    first_bytes: [bool; 256],
}

impl SignatureKeyTable {
    /// Build a table from `(signature, key)` pairs.
    ///
    /// A signature listed more than once keeps the last key given for it.
    pub fn new(entries: impl IntoIterator<Item = (Signature, SegmentKey)>) -> Self {
        let mut table = Self {
            entries: Vec::new(),
            first_bytes: [false; 256],
        };
        for (signature, key) in entries {
            table.insert(signature, key);
        }
        table
    }

    /// Table shipped with the tool
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Builtin entries followed by `extra`, which override on conflict
    pub fn with_extra(extra: impl IntoIterator<Item = (Signature, SegmentKey)>) -> Self {
        Self::new(BUILTIN_ENTRIES.into_iter().chain(extra))
    }

    fn insert(&mut self, signature: Signature, key: SegmentKey) {
        if let Some(entry) = self.entries.iter_mut().find(|(s, _)| *s == signature) {
            entry.1 = key;
        } else {
            self.entries.push((signature, key));
        }
        self.first_bytes[signature.0[0] as usize] = true;
    }

    /// Key for `signature`, if known
    pub fn get(&self, signature: Signature) -> Option<SegmentKey> {
        self.entries
            .iter()
            .find(|(s, _)| *s == signature)
            .map(|(_, k)| *k)
    }

    /// Signature and key starting at `offset` of `data`.
    ///
    /// Returns `None` when fewer than [`SIGNATURE_LEN`] bytes remain.
    #[inline]
    pub fn lookup_at(&self, data: &[u8], offset: usize) -> Option<(Signature, SegmentKey)> {
        let window = data.get(offset..offset.checked_add(SIGNATURE_LEN)?)?;
        if !self.first_bytes[window[0] as usize] {
            return None;
        }
        self.entries
            .iter()
            .find(|(s, _)| s.0 == window)
            .copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &(Signature, SegmentKey)> {
        self.entries.iter()
    }
}

impl Default for SignatureKeyTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Error parsing a `SIGNATURE=KEY` table entry
#[derive(Debug, thiserror::Error)]
#[error("invalid table entry '{entry}': expected SIGNATURE=KEY in hex ({reason})")]
pub struct TableEntryError {
    entry: String,
    reason: String,
}

/// One `SIGNATURE=KEY` entry, as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    /// Ciphertext signature
    pub signature: Signature,
    /// Key selected by the signature
    pub key: SegmentKey,
}

impl FromStr for TableEntry {
    type Err = TableEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| TableEntryError {
            entry: s.to_string(),
            reason,
        };
        let (sig, key) = s
            .split_once('=')
            .ok_or_else(|| err("missing '='".to_string()))?;
        Ok(Self {
            signature: Signature::from_hex(sig).map_err(|e| err(e.to_string()))?,
            key: SegmentKey::from_hex(key).map_err(|e| err(e.to_string()))?,
        })
    }
}

impl From<TableEntry> for (Signature, SegmentKey) {
    fn from(entry: TableEntry) -> Self {
        (entry.signature, entry.key)
    }
}
