//! rasterband - chunked, compressed 2D raster bands
//!
//! A band is a fixed-size 2D array of one element type. [`CompressedBand`]
//! splits it into a grid of independently compressed chunks and decompresses
//! only the chunks a read or write overlaps, so large rasters stay small in
//! memory. [`DirectBand`] keeps the same array uncompressed.
//!
//! # Features
//!
//! - numpy-style keys: flat and 2D integers, slices with negative steps, boolean masks
//! - Deflate, Zstd and RLE chunk compression with optional byte shuffling
//! - Unwritten chunks cost nothing and read back as zero
//! - Optional LRU cache of decompressed chunks
//! - [`BandIndexer`] to address several same-sized bands as one stack
//!
//! # Example
//!
//! ```rust
//! use rasterband::{Band, BandConfig, CompressedBand, Key, Value};
//!
//! # fn main() -> rasterband::Result<()> {
//! let config = BandConfig::default().with_chunk_size((4, 4));
//! let mut band = CompressedBand::<f32>::new((10, 10), config)?;
//!
//! let key: Key = "2:6, 2:6".parse()?;
//! band.set(&key, Value::Scalar(5.0))?;
//!
//! assert!(band.is_chunk_set(0, 0));
//! assert!(!band.is_chunk_set(2, 2));
//! assert_eq!(band.get(&Key::cell(3, 3))?.as_scalar(), Some(5.0));
//! # Ok(())
//! # }
//! ```

pub mod band;
pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod indexer;
pub mod key;
pub mod layout;
pub mod types;
pub mod utils;

// Re-exports
pub use band::{Band, BandStats, ChunkState, CompressedBand, DirectBand, Selection, Value};
pub use cache::CacheStats;
pub use compression::{CompressionLevel, CompressionMethod};
pub use config::BandConfig;
pub use error::{BandError, Result};
pub use indexer::BandIndexer;
pub use key::{Index, Key, SliceSpec};
pub use layout::{ChunkGrid, ChunkSize};
pub use types::{DataType, Element};

/// Version of the rasterband crate
pub const RASTERBAND_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!RASTERBAND_VERSION.is_empty());
    }
}
