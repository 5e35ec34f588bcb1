//! Codec and patcher for obfuscated game archive containers
//!
//! A container holds compressed configuration payloads behind an outer
//! feedback XOR layer. This crate rewrites a single device identifier inside
//! one of those payloads without changing the container's length or any byte
//! outside the payload's slot.
//!
//! # Components
//!
//! - **Cipher**: [`FeedbackCipher`] decodes and re-encodes the outer layer,
//!   driven by a [`SignatureKeyTable`]
//! - **Compression**: [`compress`] and [`decompress`] for zlib, gzip and raw
//!   deflate at levels 0-9
//! - **Locator**: [`SegmentLocator`] finds a known plaintext in its compressed
//!   form by recompressing it under candidate configurations
//! - **Fields**: [`FieldPatcher`] picks and overwrites a device token
//! - **Reconcile**: [`reconcile`] fits the recompressed payload to its slot
//! - **Pipeline**: [`PatchPipeline`] runs the whole sequence
//!
//! # Example
//!
//! ```no_run
//! use pakpatch_core::PatchPipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = std::fs::read("pakchunk99-Android_ASTCClient.pak")?;
//! let payload = std::fs::read("DeviceProfiles.bin")?;
//!
//! let result = PatchPipeline::new().patch(&container, &payload, "RMX5011")?;
//! assert_eq!(result.container.len(), container.len());
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! std::fs::write("patched.pak", &result.container)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `zlib` (default): use the reference zlib backend so recompressed bytes
//!   match containers produced by zlib
//! - `serde`: `Serialize` for result and report types

#![warn(missing_docs)]

pub mod cipher;
pub mod compression;
pub mod error;
pub mod field;
pub mod keys;
pub mod locator;
pub mod pipeline;
pub mod reconcile;

pub use cipher::{FeedbackCipher, SegmentStart, decode, encode};
pub use compression::{CompressionConfig, Framing, compress, decompress};
pub use error::{ErrorKind, PatchError, Result};
pub use field::{FieldCandidate, FieldPatcher, FieldReplacement, ReplacementKind, replace_field};
pub use keys::{SegmentKey, Signature, SignatureKeyTable, TableEntry, TableEntryError};
pub use locator::{Located, SegmentLocator, locate};
pub use pipeline::{PatchPipeline, PatchResult, PatchWarning, patch};
pub use reconcile::{SizeAdjustment, reconcile};
