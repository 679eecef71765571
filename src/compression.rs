//! Compression and decompression for chunk payloads

use crate::error::{BandError, Result};
use crate::types::Element;
use crate::utils::{shuffle_bytes, unshuffle_bytes};
use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression as FlateCompression;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::marker::PhantomData;

/// Compression methods available for chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionMethod {
    /// No compression
    None = 0,
    /// Deflate/ZIP compression
    Deflate = 1,
    /// Run-length encoding
    Rle = 2,
    /// Zstandard compression
    #[default]
    Zstd = 3,
}

/// Compression level (0-9, where 0 is no compression and 9 is maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

/// Byte codec applied to one chunk payload.
///
/// Chunks always decode to a known size, so `decompress` takes the exact
/// decoded length and must not produce more than that.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8], level: CompressionLevel) -> Result<Vec<u8>>;

    /// Decode `data` into exactly `decoded_len` bytes
    fn decompress(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>>;

    fn method(&self) -> CompressionMethod;
}

fn check_decoded_len(method: CompressionMethod, found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(BandError::Decompression(format!(
            "{:?} payload decoded to {} bytes, expected {}",
            method, found, expected
        )));
    }
    Ok(())
}

/// Payload stored as-is
#[derive(Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn compress(&self, data: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        check_decoded_len(self.method(), data.len(), decoded_len)?;
        Ok(data.to_vec())
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }
}

/// Raw deflate stream (flate2)
#[derive(Debug, Default)]
pub struct DeflateCompressor;

impl Compressor for DeflateCompressor {
    fn compress(&self, data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        let mut compressed = Vec::new();
        DeflateEncoder::new(data, FlateCompression::new(u32::from(level.value())))
            .read_to_end(&mut compressed)
            .map_err(|e| BandError::Compression(e.to_string()))?;
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        // one byte past the chunk is enough to detect an oversized stream
        let mut decoded = Vec::with_capacity(decoded_len);
        DeflateDecoder::new(data)
            .take(decoded_len as u64 + 1)
            .read_to_end(&mut decoded)
            .map_err(|e| BandError::Decompression(e.to_string()))?;
        check_decoded_len(self.method(), decoded.len(), decoded_len)?;
        Ok(decoded)
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Deflate
    }
}

/// Zstandard frame per chunk
#[derive(Debug, Default)]
pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, i32::from(level.value()))
            .map_err(|e| BandError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        let decoded = zstd::bulk::decompress(data, decoded_len)
            .map_err(|e| BandError::Decompression(e.to_string()))?;
        check_decoded_len(self.method(), decoded.len(), decoded_len)?;
        Ok(decoded)
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Zstd
    }
}

/// Run-length encoding as `(count, byte)` pairs.
///
/// Pays off on shuffled chunks of constant or slowly varying values.
#[derive(Debug, Default)]
pub struct RleCompressor;

impl Compressor for RleCompressor {
    fn compress(&self, data: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
        let mut encoded = Vec::new();
        let mut rest = data;
        while let Some(&byte) = rest.first() {
            let run = rest
                .iter()
                .take(u8::MAX as usize)
                .take_while(|&&b| b == byte)
                .count();
            encoded.extend_from_slice(&[run as u8, byte]);
            rest = &rest[run..];
        }
        Ok(encoded)
    }

    fn decompress(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        if data.len() % 2 != 0 {
            return Err(BandError::Decompression(
                "RLE payload must hold whole (count, byte) pairs".to_string(),
            ));
        }

        let mut decoded = Vec::with_capacity(decoded_len);
        for pair in data.chunks_exact(2) {
            let (run, byte) = (pair[0] as usize, pair[1]);
            if decoded.len() + run > decoded_len {
                return Err(BandError::Decompression(format!(
                    "RLE payload decodes past {} bytes",
                    decoded_len
                )));
            }
            decoded.resize(decoded.len() + run, byte);
        }
        check_decoded_len(self.method(), decoded.len(), decoded_len)?;
        Ok(decoded)
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Rle
    }
}

/// Get a compressor for a given method
pub fn get_compressor(method: CompressionMethod) -> Box<dyn Compressor> {
    match method {
        CompressionMethod::None => Box::new(NoneCompressor),
        CompressionMethod::Deflate => Box::new(DeflateCompressor),
        CompressionMethod::Rle => Box::new(RleCompressor),
        CompressionMethod::Zstd => Box::new(ZstdCompressor),
    }
}

/// Encodes dense chunks of `T` into payload bytes and back.
///
/// With `shuffle` enabled, byte `k` of every element is grouped together
/// before compression, which lets byte-oriented compressors see the runs in
/// slowly varying numeric data.
pub struct ChunkCodec<T: Element> {
    compressor: Box<dyn Compressor>,
    level: CompressionLevel,
    shuffle: bool,
    cells: usize,
    _element: PhantomData<T>,
}

impl<T: Element> ChunkCodec<T> {
    /// Create a codec for chunks of `cells` elements
    pub fn new(
        method: CompressionMethod,
        level: CompressionLevel,
        shuffle: bool,
        cells: usize,
    ) -> Self {
        Self {
            compressor: get_compressor(method),
            level,
            shuffle,
            cells,
            _element: PhantomData,
        }
    }

    pub fn method(&self) -> CompressionMethod {
        self.compressor.method()
    }

    /// Uncompressed size of one chunk in bytes
    pub fn chunk_bytes(&self) -> usize {
        self.cells * T::DATA_TYPE.size_in_bytes()
    }

    /// Compress a dense chunk
    pub fn encode(&self, chunk: &[T]) -> Result<Vec<u8>> {
        if chunk.len() != self.cells {
            return Err(BandError::Compression(format!(
                "chunk has {} cells, expected {}",
                chunk.len(),
                self.cells
            )));
        }

        let raw: &[u8] = bytemuck::cast_slice(chunk);
        if self.shuffle {
            let shuffled = shuffle_bytes(raw, T::DATA_TYPE.size_in_bytes());
            self.compressor.compress(&shuffled, self.level)
        } else {
            self.compressor.compress(raw, self.level)
        }
    }

    /// Decompress a payload into a dense chunk
    pub fn decode(&self, payload: &[u8]) -> Result<Vec<T>> {
        let mut raw = self.compressor.decompress(payload, self.chunk_bytes())?;

        if self.shuffle {
            raw = unshuffle_bytes(&raw, T::DATA_TYPE.size_in_bytes());
        }
        Ok(bytemuck::pod_collect_to_vec(&raw))
    }
}
