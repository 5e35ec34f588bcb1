//! Locating a compressed payload inside a decoded container
//!
//! The container carries no index of its embedded payloads and no record of
//! how they were compressed. The locator recovers both by recompressing the
//! known plaintext under each candidate configuration and searching for the
//! exact bytes. Deflate output is only reproducible under the same level and
//! framing, so the first configuration whose output appears verbatim is the
//! one the container was built with.
//!
//! A raw deflate match may be the body of a zlib or gzip frame written by a
//! tool whose header differs from ours. Such a match is widened to the whole
//! frame so that the checksum trailer is rewritten along with the body.

use crate::compression::{CompressionConfig, Framing, MAX_LEVEL, compress, decompress};
use crate::error::{PatchError, Result};
use memchr::memmem;
use tracing::{debug, info};

/// Where and how a payload is embedded in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Offset of the first compressed byte in the decoded container
    pub offset: usize,
    /// Compressed bytes found at `offset`
    pub compressed: Vec<u8>,
    /// Configuration the payload was compressed under.
    ///
    /// For a frame widened from a raw deflate match the header bytes in
    /// `compressed` may differ from what this configuration emits.
    pub config: CompressionConfig,
}

impl Located {
    /// Byte range of the compressed payload
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.compressed.len()
    }
}

/// Searches a container under an ordered list of compression configurations
#[derive(Debug, Clone)]
pub struct SegmentLocator {
    plan: Vec<CompressionConfig>,
}

impl Default for SegmentLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentLocator {
    /// Locator using [`SegmentLocator::search_plan`]
    pub fn new() -> Self {
        Self {
            plan: Self::search_plan(),
        }
    }

    /// Locator trying exactly `plan`, in order
    pub fn with_plan(plan: Vec<CompressionConfig>) -> Self {
        Self { plan }
    }

    /// Configurations tried by default.
    ///
    /// Zlib at the highest level and gzip come first, as these are what
    /// packing tools usually emit. The remaining zlib levels follow in
    /// ascending order, then the remaining gzip levels. Raw deflate comes
    /// last, since every framed stream contains a raw deflate stream.
    pub fn search_plan() -> Vec<CompressionConfig> {
        let mut plan = vec![
            CompressionConfig::zlib(MAX_LEVEL),
            CompressionConfig::gzip(MAX_LEVEL),
        ];
        for config in (0..=MAX_LEVEL)
            .map(CompressionConfig::zlib)
            .chain((0..=MAX_LEVEL).map(CompressionConfig::gzip))
            .chain((0..=MAX_LEVEL).map(CompressionConfig::deflate))
        {
            if !plan.contains(&config) {
                plan.push(config);
            }
        }
        plan
    }

    /// Configurations this locator tries, in order
    pub fn plan(&self) -> &[CompressionConfig] {
        &self.plan
    }

    /// Find the compressed form of `target` inside `container`.
    ///
    /// Returns the first match in plan order; within one configuration the
    /// lowest offset wins. Identical blobs further into the container are not
    /// considered.
    ///
    /// # Errors
    ///
    /// [`PatchError::SegmentNotFound`] when no configuration reproduces a
    /// byte-identical match, or when either input is empty.
    pub fn locate(&self, container: &[u8], target: &[u8]) -> Result<Located> {
        if container.is_empty() || target.is_empty() {
            return Err(PatchError::SegmentNotFound {
                payload_len: target.len(),
                configs_tried: 0,
            });
        }

        for (tried, &config) in self.plan.iter().enumerate() {
            let compressed = compress(target, config)?;
            if compressed.len() > container.len() {
                debug!(%config, len = compressed.len(), "compressed payload larger than container");
                continue;
            }

            let Some(offset) = memmem::find(container, &compressed) else {
                debug!(%config, len = compressed.len(), "no match");
                continue;
            };

            let found = Located {
                offset,
                compressed,
                config,
            };
            let located = if config.framing == Framing::Deflate {
                enclosing_frame(container, &found, target).unwrap_or(found)
            } else {
                found
            };

            info!(
                config = %located.config,
                offset = located.offset,
                len = located.compressed.len(),
                attempts = tried + 1,
                "located compressed payload"
            );
            return Ok(located);
        }

        Err(PatchError::SegmentNotFound {
            payload_len: target.len(),
            configs_tried: self.plan.len(),
        })
    }
}

/// Longest gzip header searched for before a raw deflate match
const MAX_GZIP_HEADER: usize = 1024;

/// Widen a raw deflate match to the zlib or gzip frame around it.
///
/// A frame is only accepted when the bytes from its header to the end of its
/// trailer inflate to `target`, which also checks the trailer.
fn enclosing_frame(container: &[u8], body: &Located, target: &[u8]) -> Option<Located> {
    let offset = body.offset;
    let body_end = body.span().end;
    let frame = |start: usize, end: usize, framing: Framing| {
        let bytes = container.get(start..end)?;
        let inflated = decompress(bytes, framing).ok()?;
        (inflated == target).then(|| Located {
            offset: start,
            compressed: bytes.to_vec(),
            config: CompressionConfig::new(framing, body.config.level),
        })
    };

    // 2-byte header (CM 8, no preset dictionary), Adler-32 trailer
    let zlib = offset
        .checked_sub(2)
        .filter(|&start| {
            let (cmf, flg) = (container[start], container[start + 1]);
            cmf & 0x0F == 8
                && flg & 0x20 == 0
                && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0
        })
        .and_then(|start| frame(start, body_end + 4, Framing::Zlib));

    // Header of at least 10 bytes, CRC-32 and size trailer
    let located = zlib.or_else(|| {
        let last_start = offset.checked_sub(10)?;
        (offset.saturating_sub(MAX_GZIP_HEADER)..=last_start)
            .rev()
            .filter(|&start| container[start..start + 3] == [0x1F, 0x8B, 0x08])
            .find_map(|start| frame(start, body_end + 8, Framing::Gzip))
    })?;

    debug!(
        framing = %located.config.framing,
        start = located.offset,
        body_offset = offset,
        "raw deflate match is the body of a frame"
    );
    Some(located)
}

/// Locate `target` in `container` with the default search plan
pub fn locate(container: &[u8], target: &[u8]) -> Result<Located> {
    SegmentLocator::new().locate(container, target)
}
