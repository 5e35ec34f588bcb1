//! Payload compression and decompression

use crate::error::{PatchError, Result};
use flate2::Compression;
use flate2::GzBuilder;
use flate2::read::{DeflateDecoder, DeflateEncoder, GzDecoder, ZlibDecoder, ZlibEncoder};
use std::fmt;
use std::io::Read;

/// Maximum allowed decompression size (256 MiB)
///
/// Payloads patched by this crate are configuration tables of a few hundred
/// kilobytes; the cap only guards against inflating garbage.
pub const MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Highest deflate compression level
pub const MAX_LEVEL: u32 = 9;

/// Container framing around a deflate stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Framing {
    /// RFC 1950: 2-byte header, Adler-32 trailer
    Zlib,
    /// RFC 1952 with a fixed header (mtime 0, no name, unknown OS)
    Gzip,
    /// Raw RFC 1951 stream with no framing
    Deflate,
}

impl Framing {
    /// Lowercase name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Framing plus deflate level; fully determines the compressed bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionConfig {
    /// Stream framing
    pub framing: Framing,
    /// Deflate level, 0-9
    pub level: u32,
}

impl CompressionConfig {
    /// Create a config
    pub const fn new(framing: Framing, level: u32) -> Self {
        Self { framing, level }
    }

    /// Zlib at `level`
    pub const fn zlib(level: u32) -> Self {
        Self::new(Framing::Zlib, level)
    }

    /// Gzip at `level`
    pub const fn gzip(level: u32) -> Self {
        Self::new(Framing::Gzip, level)
    }

    /// Raw deflate at `level`
    pub const fn deflate(level: u32) -> Self {
        Self::new(Framing::Deflate, level)
    }

    fn compression(self) -> Result<Compression> {
        if self.level > MAX_LEVEL {
            return Err(PatchError::InvalidLevel(self.level));
        }
        Ok(Compression::new(self.level))
    }
}

impl fmt::Display for CompressionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.framing, self.level)
    }
}

/// Compress `data` under `config`.
///
/// Output is deterministic: identical input and config give identical bytes.
pub fn compress(data: &[u8], config: CompressionConfig) -> Result<Vec<u8>> {
    let level = config.compression()?;
    let mut compressed = Vec::new();

    let read = match config.framing {
        Framing::Zlib => ZlibEncoder::new(data, level).read_to_end(&mut compressed),
        Framing::Gzip => GzBuilder::new()
            .mtime(0)
            .operating_system(255)
            .read(data, level)
            .read_to_end(&mut compressed),
        Framing::Deflate => DeflateEncoder::new(data, level).read_to_end(&mut compressed),
    };
    read.map_err(|e| PatchError::Compression(format!("{} compression failed: {e}", config)))?;

    Ok(compressed)
}

/// Inflate one stream of the given framing from the start of `data`.
///
/// Bytes after the end of the stream (such as zero padding) are ignored.
pub fn decompress(data: &[u8], framing: Framing) -> Result<Vec<u8>> {
    match framing {
        Framing::Zlib => read_capped(ZlibDecoder::new(data), framing),
        Framing::Gzip => read_capped(GzDecoder::new(data), framing),
        Framing::Deflate => read_capped(DeflateDecoder::new(data), framing),
    }
}

fn read_capped(mut decoder: impl Read, framing: Framing) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = decoder.read(&mut buffer).map_err(|e| {
            PatchError::Compression(format!("{framing} decompression failed: {e}"))
        })?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSED_SIZE {
            return Err(PatchError::Compression(format!(
                "decompressed size exceeds limit of {MAX_DECOMPRESSED_SIZE} bytes"
            )));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"DeviceList CPH2649\0SM-X910|RMX5011\xef\xbf\xbd\xef\xbf\xbd\xef\xbf\xbd120 \
        DeviceList CPH2649\0SM-X910|RMX5011\xef\xbf\xbd\xef\xbf\xbd\xef\xbf\xbd120";

    #[test]
    fn test_zlib_round_trip_all_levels() {
        for level in 0..=MAX_LEVEL {
            let config = CompressionConfig::zlib(level);
            let compressed = compress(SAMPLE, config).expect("compress");
            assert_eq!(compressed[0], 0x78, "zlib header at level {level}");
            let decompressed = decompress(&compressed, Framing::Zlib).expect("decompress");
            assert_eq!(decompressed, SAMPLE);
        }
    }

    #[test]
    fn test_gzip_is_deterministic() {
        let config = CompressionConfig::gzip(9);
        let first = compress(SAMPLE, config).unwrap();
        let second = compress(SAMPLE, config).unwrap();

        assert_eq!(first, second);
        assert_eq!(&first[..2], &[0x1F, 0x8B]);
        // mtime field is zero
        assert_eq!(&first[4..8], &[0, 0, 0, 0]);
        assert_eq!(decompress(&first, Framing::Gzip).unwrap(), SAMPLE);
    }

    #[test]
    fn test_deflate_round_trip() {
        let compressed = compress(SAMPLE, CompressionConfig::deflate(6)).unwrap();
        assert_eq!(decompress(&compressed, Framing::Deflate).unwrap(), SAMPLE);
    }

    #[test]
    fn test_default_zlib_header() {
        // Level 6 streams start 78 9C, the bytes the builtin signatures decode to
        let compressed = compress(SAMPLE, CompressionConfig::zlib(6)).unwrap();
        assert_eq!(&compressed[..2], &[0x78, 0x9C]);
    }

    #[test]
    fn test_decompress_ignores_trailing_padding() {
        let mut compressed = compress(SAMPLE, CompressionConfig::zlib(9)).unwrap();
        compressed.extend_from_slice(&[0u8; 7]);

        assert_eq!(decompress(&compressed, Framing::Zlib).unwrap(), SAMPLE);
    }

    #[test]
    fn test_decompress_truncated_stream_fails() {
        let compressed = compress(SAMPLE, CompressionConfig::zlib(9)).unwrap();
        let truncated = &compressed[..compressed.len() / 2];

        let result = decompress(truncated, Framing::Zlib);
        assert!(result.is_err() || result.is_ok_and(|d| d != SAMPLE));
    }

    #[test]
    fn test_invalid_level() {
        let err = compress(SAMPLE, CompressionConfig::zlib(10)).unwrap_err();
        assert!(matches!(err, PatchError::InvalidLevel(10)));
    }

    #[test]
    fn test_config_display() {
        assert_eq!(CompressionConfig::zlib(9).to_string(), "zlib/9");
        assert_eq!(CompressionConfig::gzip(9).to_string(), "gzip/9");
        assert_eq!(CompressionConfig::deflate(1).to_string(), "deflate/1");
    }
}
