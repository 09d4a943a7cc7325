//! Backend-blob compression for snapshots
//!
//! LZ4/ZSTD are available with the `compression` feature; `None` always is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Compression applied to the backend blob inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Stored as-is (default)
    #[default]
    None,
    /// LZ4 - fast, moderate ratio
    Lz4,
    /// ZSTD - better ratio, slower
    Zstd,
}

impl Compression {
    /// Get algorithm name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    /// Compress data using this algorithm
    ///
    /// # Errors
    /// Returns `Error::Persistence` if compression fails or the crate was built
    /// without the `compression` feature.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() || *self == Self::None {
            return Ok(data.to_vec());
        }
        self.codec(data, true)
    }

    /// Decompress data using this algorithm
    ///
    /// # Errors
    /// Returns `Error::Persistence` if decompression fails (e.g., corrupted data)
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() || *self == Self::None {
            return Ok(data.to_vec());
        }
        self.codec(data, false)
    }

    #[cfg(feature = "compression")]
    fn codec(self, data: &[u8], compress: bool) -> Result<Vec<u8>> {
        match (self, compress) {
            (Self::None, _) => Ok(data.to_vec()),
            (Self::Lz4, true) => Ok(lz4_flex::compress_prepend_size(data)),
            (Self::Lz4, false) => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| Error::persistence(format!("LZ4 decompression failed: {e}"))),
            (Self::Zstd, true) => zstd::encode_all(data, 3)
                .map_err(|e| Error::persistence(format!("ZSTD compression failed: {e}"))),
            (Self::Zstd, false) => zstd::decode_all(data)
                .map_err(|e| Error::persistence(format!("ZSTD decompression failed: {e}"))),
        }
    }

    #[cfg(not(feature = "compression"))]
    fn codec(self, _data: &[u8], _compress: bool) -> Result<Vec<u8>> {
        Err(Error::persistence(format!(
            "{} snapshots need the `compression` feature",
            self.as_str()
        )))
    }
}
