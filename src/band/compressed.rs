//! Chunked band - each chunk compressed independently, touched chunks only

use super::{
    cell_value, check_value_shape, gather, mask_values, region_block, scatter, stride_slice,
    subsample, Band, Selection, Value,
};
use crate::cache::{CacheStats, ChunkCache};
use crate::compression::{ChunkCodec, CompressionMethod};
use crate::config::BandConfig;
use crate::error::{BandError, Result};
use crate::key::{Key, Resolved};
use crate::layout::{ChunkExtent, ChunkGrid, ChunkSize};
use crate::types::{DataType, Element};
use crate::utils::format_bytes;
use bytes::Bytes;
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Axis};
use num_traits::Zero;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::{debug, trace};

/// Storage state of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChunkState {
    /// Never written; reads as zero
    #[default]
    Unset,
    /// Compressed payload of a full `chunk_size` block
    Set(Bytes),
}

impl ChunkState {
    pub fn is_set(&self) -> bool {
        matches!(self, ChunkState::Set(_))
    }

    /// Compressed size in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            ChunkState::Unset => 0,
            ChunkState::Set(payload) => payload.len(),
        }
    }
}

/// A band stored as a grid of independently compressed chunks.
///
/// Only the compressed payloads persist between calls. Every `get`
/// decompresses the chunks it overlaps; every `set` decompresses, patches and
/// recompresses them. Chunks that were never written hold no payload and
/// read as zero. Edge chunks are allocated at full chunk size; the cells
/// past the band edge are never exposed.
pub struct CompressedBand<T: Element> {
    grid: ChunkGrid,
    config: BandConfig,
    codec: ChunkCodec<T>,
    chunks: Vec<ChunkState>,
    cache: Option<Mutex<ChunkCache<T>>>,
}

impl<T: Element> CompressedBand<T> {
    /// Create a band of `size` with every chunk unset
    pub fn new(size: (usize, usize), config: BandConfig) -> Result<Self> {
        config.validate()?;
        let grid = ChunkGrid::new(size, config.chunk_size)?;
        let codec = ChunkCodec::new(
            config.compression,
            config.level,
            config.shuffle,
            config.chunk_size.total_cells(),
        );
        let cache = config
            .cache_chunks
            .and_then(NonZeroUsize::new)
            .map(|capacity| Mutex::new(ChunkCache::new(capacity)));

        debug!(
            rows = size.0,
            cols = size.1,
            chunks = grid.total_chunks(),
            dtype = %T::DATA_TYPE,
            compression = ?config.compression,
            "Created compressed band"
        );

        Ok(Self {
            chunks: vec![ChunkState::Unset; grid.total_chunks()],
            grid,
            config,
            codec,
            cache,
        })
    }

    /// Create a band of `size` with every cell set to `fill`.
    ///
    /// Every chunk becomes set. The chunks share one compressed payload.
    pub fn with_fill(size: (usize, usize), config: BandConfig, fill: T) -> Result<Self> {
        let mut band = Self::new(size, config)?;
        let payload = Bytes::from(
            band.codec
                .encode(&vec![fill; band.grid.chunk_size().total_cells()])?,
        );
        for chunk in band.chunks.iter_mut() {
            *chunk = ChunkState::Set(payload.clone());
        }
        Ok(band)
    }

    /// Create a band holding a copy of `array`
    pub fn from_array(array: ArrayView2<'_, T>, config: BandConfig) -> Result<Self> {
        let mut band = Self::new(array.dim(), config)?;
        band.write_block(0, 0, array)?;
        Ok(band)
    }

    /// Materialize the whole band
    pub fn to_array(&self) -> Result<Array2<T>> {
        let (rows, cols) = self.grid.size();
        self.read_block(0, 0, rows, cols)
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    pub fn chunk_grid(&self) -> &ChunkGrid {
        &self.grid
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.grid.chunk_size()
    }

    /// State of the chunk with row-major id `id`
    pub fn chunk_state(&self, id: usize) -> Option<&ChunkState> {
        self.chunks.get(id)
    }

    /// Whether the chunk at chunk coordinates `(chunk_row, chunk_col)` has
    /// been written
    pub fn is_chunk_set(&self, chunk_row: usize, chunk_col: usize) -> bool {
        let (rows, cols) = self.grid.chunk_count();
        chunk_row < rows
            && chunk_col < cols
            && self.chunks[self.grid.chunk_id(chunk_row, chunk_col)].is_set()
    }

    /// Dense rectangle `[y_off, y_off+n_rows) x [x_off, x_off+n_cols)`.
    ///
    /// The rectangle must lie inside the band. Each overlapping chunk is
    /// decompressed once.
    pub fn read_block(
        &self,
        y_off: usize,
        x_off: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Array2<T>> {
        self.check_block(y_off, x_off, n_rows, n_cols)?;
        let mut out = Array2::zeros((n_rows, n_cols));
        let chunk_dims = self.grid.chunk_size().as_tuple();

        debug!(y_off, x_off, n_rows, n_cols, "Reading block");

        for extent in self.grid.chunks_overlapping(y_off, x_off, n_rows, n_cols) {
            let (cy, cx, by, bx) = extent.overlap(y_off, x_off, n_rows, n_cols);
            let mut window = out.slice_mut(s![by, bx]);

            match self.load_chunk(&extent)? {
                None => window.fill(T::zero()),
                Some(data) => {
                    let chunk = ArrayView2::from_shape(chunk_dims, &data)?;
                    window.assign(&chunk.slice(s![cy, cx]));
                }
            }
        }

        Ok(out)
    }

    /// Store `block` with its top-left cell at `(y_off, x_off)`.
    ///
    /// Each overlapping chunk is read, patched and recompressed; cells of a
    /// chunk outside `block` keep their values. New payloads replace the old
    /// ones only after every chunk has been encoded.
    pub fn write_block(&mut self, y_off: usize, x_off: usize, block: ArrayView2<'_, T>) -> Result<()> {
        self.write_chunks(y_off, x_off, block, |_| true)
    }

    /// Compression statistics for this band
    pub fn stats(&self) -> BandStats {
        let set_chunks = self.chunks.iter().filter(|c| c.is_set()).count();
        BandStats {
            size: self.grid.size(),
            chunk_size: self.grid.chunk_size(),
            data_type: T::DATA_TYPE,
            compression: self.codec.method(),
            total_chunks: self.chunks.len(),
            set_chunks,
            compressed_bytes: self.chunks.iter().map(ChunkState::payload_len).sum(),
            uncompressed_bytes: set_chunks * self.codec.chunk_bytes(),
        }
    }

    /// Cache counters, when the chunk cache is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.lock().stats())
    }

    fn check_block(&self, y_off: usize, x_off: usize, n_rows: usize, n_cols: usize) -> Result<()> {
        let (rows, cols) = self.grid.size();
        let past_edge =
            |off: usize, n: usize, len: usize| off.checked_add(n).map_or(true, |end| end > len);
        if past_edge(y_off, n_rows, rows) || past_edge(x_off, n_cols, cols) {
            return Err(BandError::OutOfBounds(format!(
                "block at ({}, {}) of shape ({}, {}) exceeds band of shape ({}, {})",
                y_off, x_off, n_rows, n_cols, rows, cols
            )));
        }
        Ok(())
    }

    /// Decompressed contents of a set chunk; `None` for unset chunks
    fn load_chunk(&self, extent: &ChunkExtent) -> Result<Option<Vec<T>>> {
        let payload = match &self.chunks[extent.id] {
            ChunkState::Unset => return Ok(None),
            ChunkState::Set(payload) => payload,
        };

        if let Some(cache) = &self.cache {
            if let Some(data) = cache.lock().get(extent.id) {
                trace!(chunk = extent.id, "Chunk cache hit");
                return Ok(Some(data));
            }
        }

        trace!(chunk = extent.id, bytes = payload.len(), "Decompressing chunk");
        let data = self.codec.decode(payload)?;

        if let Some(cache) = &self.cache {
            cache.lock().insert(extent.id, data.clone());
        }
        Ok(Some(data))
    }

    fn write_chunks<F>(
        &mut self,
        y_off: usize,
        x_off: usize,
        block: ArrayView2<'_, T>,
        touches: F,
    ) -> Result<()>
    where
        F: Fn(&ChunkExtent) -> bool,
    {
        let (n_rows, n_cols) = block.dim();
        self.check_block(y_off, x_off, n_rows, n_cols)?;
        let chunk_dims = self.grid.chunk_size().as_tuple();
        let keep_working = self.cache.is_some();
        let mut staged = Vec::new();

        debug!(y_off, x_off, n_rows, n_cols, "Writing block");

        for extent in self.grid.chunks_overlapping(y_off, x_off, n_rows, n_cols) {
            if !touches(&extent) {
                continue;
            }

            let mut working = match self.load_chunk(&extent)? {
                Some(data) => data,
                None => vec![T::zero(); chunk_dims.0 * chunk_dims.1],
            };

            let (cy, cx, by, bx) = extent.overlap(y_off, x_off, n_rows, n_cols);
            ArrayViewMut2::from_shape(chunk_dims, &mut working)?
                .slice_mut(s![cy, cx])
                .assign(&block.slice(s![by, bx]));

            trace!(chunk = extent.id, "Recompressing chunk");
            let payload = Bytes::from(self.codec.encode(&working)?);
            staged.push((extent.id, payload, keep_working.then_some(working)));
        }

        debug!(chunks = staged.len(), "Committing chunks");
        for (id, payload, working) in staged {
            self.chunks[id] = ChunkState::Set(payload);
            if let (Some(cache), Some(data)) = (&self.cache, working) {
                cache.lock().insert(id, data);
            }
        }
        Ok(())
    }
}

impl<T: Element> Band<T> for CompressedBand<T> {
    fn size(&self) -> (usize, usize) {
        self.grid.size()
    }

    fn get(&self, key: &Key) -> Result<Selection<T>> {
        match key.resolve(self.size())? {
            Resolved::Cell { row, col } => {
                let block = self.read_block(row, col, 1, 1)?;
                Ok(Selection::Scalar(block[[0, 0]]))
            }
            Resolved::Region(region) => {
                let (dy, dx) = region.dense_shape();
                let dense = self.read_block(region.y.offset, region.x.offset, dy, dx)?;
                Ok(Selection::Array(subsample(dense, &region).into_dyn()))
            }
            Resolved::Mask(mask) => {
                let full = self.to_array()?;
                Ok(Selection::Array(gather(&full, mask).into_dyn()))
            }
        }
    }

    fn set(&mut self, key: &Key, value: Value<T>) -> Result<()> {
        let resolved = key.resolve(self.size())?;
        check_value_shape(&resolved.shape(), &value)?;

        match resolved {
            Resolved::Cell { row, col } => {
                let cell = Array2::from_elem((1, 1), cell_value(value)?);
                self.write_block(row, col, cell.view())
            }
            Resolved::Region(region) => {
                let block = region_block(value, region.shape())?;
                if region.is_empty() {
                    return Ok(());
                }
                let (y_off, x_off) = (region.y.offset, region.x.offset);
                if region.is_dense() {
                    return self.write_block(y_off, x_off, block.view());
                }

                // Strided writes patch the dense rectangle so the cells
                // between the strides survive.
                let (dy, dx) = region.dense_shape();
                let mut dense = self.read_block(y_off, x_off, dy, dx)?;
                {
                    let mut view = dense.view_mut();
                    view.slice_axis_inplace(Axis(0), stride_slice(region.y));
                    view.slice_axis_inplace(Axis(1), stride_slice(region.x));
                    view.assign(&block);
                }
                self.write_block(y_off, x_off, dense.view())
            }
            Resolved::Mask(mask) => {
                let count = mask.iter().filter(|&&m| m).count();
                let values = mask_values(value, count)?;
                let mut full = self.to_array()?;
                scatter(&mut full, mask, &values);

                // Only chunks holding a selected cell are rewritten
                self.write_chunks(0, 0, full.view(), |extent| {
                    mask.slice(s![
                        extent.row_start..extent.row_end,
                        extent.col_start..extent.col_end
                    ])
                    .iter()
                    .any(|&m| m)
                })
            }
        }
    }
}

/// Storage statistics of a compressed band
#[derive(Debug, Clone)]
pub struct BandStats {
    pub size: (usize, usize),
    pub chunk_size: ChunkSize,
    pub data_type: DataType,
    pub compression: CompressionMethod,
    pub total_chunks: usize,
    pub set_chunks: usize,
    pub compressed_bytes: usize,
    pub uncompressed_bytes: usize,
}

impl BandStats {
    pub fn compression_ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            0.0
        } else {
            self.uncompressed_bytes as f64 / self.compressed_bytes as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} x {} band ({}, {:?}): {}/{} chunks set, {} compressed, {} uncompressed",
            self.size.0,
            self.size.1,
            self.data_type,
            self.compression,
            self.set_chunks,
            self.total_chunks,
            format_bytes(self.compressed_bytes),
            format_bytes(self.uncompressed_bytes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SliceSpec;
    use ndarray::{array, Ix2};

    fn small_config() -> BandConfig {
        BandConfig::default().with_chunk_size((4, 4))
    }

    fn gradient_band(cache: bool) -> CompressedBand<i32> {
        let config = if cache {
            small_config().with_chunk_cache(4)
        } else {
            small_config()
        };
        let array = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as i32);
        CompressedBand::from_array(array.view(), config).unwrap()
    }

    #[test]
    fn test_new_band_has_no_set_chunks() {
        let band = CompressedBand::<f64>::new((10, 10), small_config()).unwrap();
        assert_eq!(band.chunk_grid().total_chunks(), 9);
        assert_eq!(band.stats().set_chunks, 0);
        assert!(!band.is_chunk_set(0, 0));
        assert!(!band.is_chunk_set(5, 5));
    }

    #[test]
    fn test_rejects_bad_config() {
        let err = CompressedBand::<u8>::new((4, 4), BandConfig::default().with_chunk_size((0, 2)))
            .err()
            .unwrap();
        assert!(matches!(err, BandError::Configuration(_)));
    }

    #[test]
    fn test_read_block_across_chunks() {
        let band = gradient_band(false);
        let block = band.read_block(2, 3, 5, 3).unwrap();
        assert_eq!(block.dim(), (5, 3));
        assert_eq!(block[[0, 0]], 23);
        assert_eq!(block[[4, 2]], 65);
    }

    #[test]
    fn test_write_block_keeps_rest_of_chunk() {
        let mut band = CompressedBand::<i32>::with_fill((10, 10), small_config(), 7).unwrap();
        band.write_block(5, 5, array![[1, 2], [3, 4]].view()).unwrap();

        let full = band.to_array().unwrap();
        assert_eq!(full.slice(s![5..7, 5..7]), array![[1, 2], [3, 4]]);
        assert_eq!(full.iter().filter(|&&v| v == 7).count(), 96);
    }

    #[test]
    fn test_block_bounds_checked() {
        let mut band = CompressedBand::<i32>::new((10, 10), small_config()).unwrap();
        assert!(matches!(
            band.read_block(8, 0, 3, 1),
            Err(BandError::OutOfBounds(_))
        ));
        assert!(matches!(
            band.write_block(0, 9, Array2::zeros((1, 2)).view()),
            Err(BandError::OutOfBounds(_))
        ));
        assert_eq!(band.read_block(10, 10, 0, 0).unwrap().len(), 0);
    }

    #[test]
    fn test_block_bounds_do_not_overflow() {
        let mut band = CompressedBand::<i32>::new((4, 4), small_config()).unwrap();
        assert!(matches!(
            band.read_block(usize::MAX, 0, 1, 1),
            Err(BandError::OutOfBounds(_))
        ));
        assert!(matches!(
            band.read_block(0, 1, 1, usize::MAX),
            Err(BandError::OutOfBounds(_))
        ));
        assert!(matches!(
            band.write_block(0, usize::MAX, Array2::zeros((1, 1)).view()),
            Err(BandError::OutOfBounds(_))
        ));
        assert_eq!(band.stats().set_chunks, 0);
    }

    #[test]
    fn test_fill_sets_every_chunk() {
        let band = CompressedBand::<u16>::with_fill((9, 5), small_config(), 3).unwrap();
        let stats = band.stats();
        assert_eq!(stats.set_chunks, stats.total_chunks);
        assert!(band.to_array().unwrap().iter().all(|&v| v == 3));
    }

    #[test]
    fn test_strided_set_preserves_gaps() {
        let mut band = gradient_band(false);
        let key = Key::region(SliceSpec::step(3), SliceSpec::new(Some(9), None, Some(-4)));
        let before = band.to_array().unwrap();
        band.set(&key, Value::Scalar(-1)).unwrap();

        let after = band.to_array().unwrap();
        for ((r, c), &v) in after.indexed_iter() {
            if r % 3 == 0 && (c == 9 || c == 5 || c == 1) {
                assert_eq!(v, -1, "({}, {})", r, c);
            } else {
                assert_eq!(v, before[[r, c]], "({}, {})", r, c);
            }
        }
    }

    #[test]
    fn test_mask_set_only_touches_selected_chunks() {
        let mut band = CompressedBand::<f32>::new((10, 10), small_config()).unwrap();
        let mut mask = Array2::from_elem((10, 10), false);
        mask[[1, 1]] = true;
        mask[[9, 9]] = true;

        band.set(&Key::Mask(mask.clone()), Value::from(array![1.5f32, 2.5])).unwrap();

        assert!(band.is_chunk_set(0, 0));
        assert!(band.is_chunk_set(2, 2));
        assert_eq!(band.stats().set_chunks, 2);
        assert_eq!(
            band.get(&Key::Mask(mask)).unwrap().into_array().iter().copied().collect::<Vec<_>>(),
            vec![1.5, 2.5]
        );
    }

    #[test]
    fn test_shape_mismatch_leaves_band_untouched() {
        let mut band = CompressedBand::<i32>::new((10, 10), small_config()).unwrap();
        let key = Key::region(SliceSpec::range(0, 4), SliceSpec::range(0, 4).with_step(2));
        let err = band.set(&key, Value::from(Array2::<i32>::ones((4, 4)))).unwrap_err();

        assert!(matches!(err, BandError::ShapeMismatch { .. }));
        assert_eq!(band.stats().set_chunks, 0);
    }

    #[test]
    fn test_cache_serves_repeat_reads() {
        let band = gradient_band(true);
        let key = Key::region(SliceSpec::range(0, 4), SliceSpec::range(0, 4));
        let first = band.get(&key).unwrap();
        let second = band.get(&key).unwrap();
        assert_eq!(first, second);

        let stats = band.cache_stats().unwrap();
        assert!(stats.hits >= 1);
    }

    #[test]
    fn test_cache_refreshed_by_writes() {
        let mut band = gradient_band(true);
        let key = Key::cell(1, 1);
        assert_eq!(band.get(&key).unwrap(), Selection::Scalar(11));
        band.set(&key, Value::Scalar(-11)).unwrap();
        assert_eq!(band.get(&key).unwrap(), Selection::Scalar(-11));
    }

    #[test]
    fn test_same_results_as_uncached() {
        let cached = gradient_band(true);
        let plain = gradient_band(false);
        let key = Key::region(SliceSpec::step(-3), SliceSpec::range(2, 9));
        assert_eq!(
            cached.get(&key).unwrap().into_dimensionality::<Ix2>().unwrap(),
            plain.get(&key).unwrap().into_dimensionality::<Ix2>().unwrap()
        );
    }

    #[test]
    fn test_stats_summary() {
        let band = gradient_band(false);
        let stats = band.stats();
        assert_eq!(stats.set_chunks, 9);
        assert_eq!(stats.uncompressed_bytes, 9 * 16 * 4);
        assert!(stats.compression_ratio() > 0.0);
        assert!(stats.summary().contains("9/9 chunks set"));
    }
}
