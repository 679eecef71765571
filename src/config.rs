//! Configuration for compressed bands

use crate::compression::{CompressionLevel, CompressionMethod};
use crate::error::{BandError, Result};
use crate::layout::ChunkSize;
use serde::{Deserialize, Serialize};

/// Storage settings for a [`CompressedBand`](crate::CompressedBand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Chunk size in rows and columns
    pub chunk_size: ChunkSize,

    /// Compression method used for chunk payloads
    pub compression: CompressionMethod,

    /// Compression level passed to the compressor
    pub level: CompressionLevel,

    /// Byte-shuffle elements before compressing
    pub shuffle: bool,

    /// Capacity of the decompressed-chunk cache, in chunks. `None` disables it.
    pub cache_chunks: Option<usize>,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::default(),
            compression: CompressionMethod::Zstd,
            level: CompressionLevel::default(),
            shuffle: true,
            cache_chunks: None,
        }
    }
}

impl BandConfig {
    /// Set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: impl Into<ChunkSize>) -> Self {
        self.chunk_size = chunk_size.into();
        self
    }

    /// Set compression method
    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    /// Set compression level
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable byte shuffling
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Keep up to `capacity` decompressed chunks between calls
    pub fn with_chunk_cache(mut self, capacity: usize) -> Self {
        self.cache_chunks = Some(capacity);
        self
    }

    /// Check that the settings can build a band
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size.rows == 0 || self.chunk_size.cols == 0 {
            return Err(BandError::Configuration(format!(
                "chunk size must be non-zero, got {:?}",
                self.chunk_size.as_tuple()
            )));
        }
        if self.cache_chunks == Some(0) {
            return Err(BandError::Configuration(
                "chunk cache capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BandConfig::default();
        assert_eq!(config.chunk_size, ChunkSize::new(256, 256));
        assert_eq!(config.compression, CompressionMethod::Zstd);
        assert!(config.shuffle);
        assert_eq!(config.cache_chunks, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = BandConfig::default()
            .with_chunk_size((4, 8))
            .with_compression(CompressionMethod::Deflate)
            .with_level(CompressionLevel::new(9))
            .with_shuffle(false)
            .with_chunk_cache(16);

        assert_eq!(config.chunk_size, ChunkSize::new(4, 8));
        assert_eq!(config.level.value(), 9);
        assert_eq!(config.cache_chunks, Some(16));
    }

    #[test]
    fn test_validate() {
        let config = BandConfig::default().with_chunk_size((0, 4));
        assert!(matches!(config.validate(), Err(BandError::Configuration(_))));

        let config = BandConfig::default().with_chunk_cache(0);
        assert!(matches!(config.validate(), Err(BandError::Configuration(_))));
    }

    #[test]
    fn test_json_level_is_clamped() {
        let config = BandConfig::from_json(r#"{"level": 200}"#).unwrap();
        assert_eq!(config.level.value(), 9);
        assert_eq!(config.level, CompressionLevel::new(200));

        let back = BandConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_json() {
        let config = BandConfig::from_json(r#"{"chunk_size": {"rows": 64, "cols": 32}}"#).unwrap();
        assert_eq!(config.chunk_size, ChunkSize::new(64, 32));
        assert_eq!(config.compression, CompressionMethod::Zstd);

        let json = config.with_compression(CompressionMethod::Rle).to_json().unwrap();
        let parsed = BandConfig::from_json(&json).unwrap();
        assert_eq!(parsed.compression, CompressionMethod::Rle);

        assert!(matches!(
            BandConfig::from_json(r#"{"cache_chunks": 0}"#),
            Err(BandError::Configuration(_))
        ));
        assert!(matches!(
            BandConfig::from_json("not json"),
            Err(BandError::Serialization(_))
        ));
    }
}
