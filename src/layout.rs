//! Chunk grid layout - maps band coordinates onto chunks

use crate::error::{BandError, Result};
use serde::{Deserialize, Serialize};

/// Size of a chunk in rows and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSize {
    pub rows: usize,
    pub cols: usize,
}

impl ChunkSize {
    /// Create a new chunk size
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Square chunks
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Total number of cells in a chunk
    pub fn total_cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::square(256)
    }
}

impl From<(usize, usize)> for ChunkSize {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::new(rows, cols)
    }
}

/// Logical extent of one chunk, clipped to the band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkExtent {
    /// Row-major chunk id
    pub id: usize,
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl ChunkExtent {
    /// Copy window shared by this chunk and the rectangle at
    /// `(y_off, x_off)` with `(n_rows, n_cols)` cells.
    ///
    /// Returns `(chunk_rows, chunk_cols, block_rows, block_cols)`: the ranges
    /// inside the chunk buffer and inside the rectangle that line up.
    pub fn overlap(
        &self,
        y_off: usize,
        x_off: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> (
        std::ops::Range<usize>,
        std::ops::Range<usize>,
        std::ops::Range<usize>,
        std::ops::Range<usize>,
    ) {
        let y0 = y_off.max(self.row_start);
        let y1 = (y_off + n_rows).min(self.row_end);
        let x0 = x_off.max(self.col_start);
        let x1 = (x_off + n_cols).min(self.col_end);

        (
            (y0 - self.row_start)..(y1 - self.row_start),
            (x0 - self.col_start)..(x1 - self.col_start),
            (y0 - y_off)..(y1 - y_off),
            (x0 - x_off)..(x1 - x_off),
        )
    }
}

/// Partition of a band into fixed-size chunks, numbered row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkGrid {
    size: (usize, usize),
    chunk_size: ChunkSize,
}

impl ChunkGrid {
    /// Create a grid over a band of `size`
    pub fn new(size: (usize, usize), chunk_size: ChunkSize) -> Result<Self> {
        if chunk_size.rows == 0 || chunk_size.cols == 0 {
            return Err(BandError::Configuration(format!(
                "chunk size must be non-zero, got {:?}",
                chunk_size.as_tuple()
            )));
        }
        Ok(Self { size, chunk_size })
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Number of chunks along each axis
    pub fn chunk_count(&self) -> (usize, usize) {
        (
            self.size.0.div_ceil(self.chunk_size.rows),
            self.size.1.div_ceil(self.chunk_size.cols),
        )
    }

    /// Total number of chunks
    pub fn total_chunks(&self) -> usize {
        let (rows, cols) = self.chunk_count();
        rows * cols
    }

    /// Convert chunk coordinates to a chunk id
    pub fn chunk_id(&self, chunk_row: usize, chunk_col: usize) -> usize {
        chunk_row * self.chunk_count().1 + chunk_col
    }

    /// Convert a chunk id to chunk coordinates
    pub fn chunk_coords(&self, id: usize) -> (usize, usize) {
        let cols = self.chunk_count().1;
        (id / cols, id % cols)
    }

    /// Chunk containing the cell `(row, col)`
    pub fn chunk_of(&self, row: usize, col: usize) -> (usize, usize) {
        (row / self.chunk_size.rows, col / self.chunk_size.cols)
    }

    /// Logical extent of a chunk, clipped to the band
    pub fn extent(&self, chunk_row: usize, chunk_col: usize) -> ChunkExtent {
        let row_start = chunk_row * self.chunk_size.rows;
        let col_start = chunk_col * self.chunk_size.cols;
        ChunkExtent {
            id: self.chunk_id(chunk_row, chunk_col),
            row_start,
            row_end: (row_start + self.chunk_size.rows).min(self.size.0),
            col_start,
            col_end: (col_start + self.chunk_size.cols).min(self.size.1),
        }
    }

    /// Every chunk intersecting `[y_off, y_off+n_rows) x [x_off, x_off+n_cols)`,
    /// in row-major order.
    ///
    /// The rectangle is clipped to the band; an empty rectangle yields nothing.
    pub fn chunks_overlapping(
        &self,
        y_off: usize,
        x_off: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> impl Iterator<Item = ChunkExtent> + '_ {
        let y_end = (y_off + n_rows).min(self.size.0);
        let x_end = (x_off + n_cols).min(self.size.1);

        let (rows, cols) = if y_off >= y_end || x_off >= x_end {
            (0..0, 0..0)
        } else {
            (
                (y_off / self.chunk_size.rows)..y_end.div_ceil(self.chunk_size.rows),
                (x_off / self.chunk_size.cols)..x_end.div_ceil(self.chunk_size.cols),
            )
        };

        rows.flat_map(move |i| cols.clone().map(move |j| self.extent(i, j)))
    }

    /// Check if a cell is within the band
    pub fn is_in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size.0 && col < self.size.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_grid() -> ChunkGrid {
        ChunkGrid::new((10, 10), ChunkSize::square(4)).unwrap()
    }

    #[test]
    fn test_chunk_count() {
        let grid = create_test_grid();
        assert_eq!(grid.chunk_count(), (3, 3));
        assert_eq!(grid.total_chunks(), 9);

        let grid = ChunkGrid::new((1000, 800), ChunkSize::square(64)).unwrap();
        assert_eq!(grid.chunk_count(), (16, 13));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = ChunkGrid::new((10, 10), ChunkSize::new(0, 4)).unwrap_err();
        assert!(matches!(err, BandError::Configuration(_)));
    }

    #[test]
    fn test_chunk_id_conversion() {
        let grid = create_test_grid();
        assert_eq!(grid.chunk_id(2, 1), 7);
        assert_eq!(grid.chunk_coords(7), (2, 1));
        assert_eq!(grid.chunk_of(9, 5), (2, 1));
    }

    #[test]
    fn test_edge_extent_clipped() {
        let grid = create_test_grid();
        let extent = grid.extent(2, 2);
        assert_eq!(
            extent,
            ChunkExtent {
                id: 8,
                row_start: 8,
                row_end: 10,
                col_start: 8,
                col_end: 10,
            }
        );
    }

    #[test]
    fn test_chunks_overlapping() {
        let grid = create_test_grid();
        let ids: Vec<usize> = grid.chunks_overlapping(3, 3, 4, 4).map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 3, 4]);

        let ids: Vec<usize> = grid.chunks_overlapping(0, 0, 10, 10).map(|c| c.id).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());

        let ids: Vec<usize> = grid.chunks_overlapping(9, 0, 1, 5).map(|c| c.id).collect();
        assert_eq!(ids, vec![6, 7]);
    }

    #[test]
    fn test_chunks_overlapping_clips_and_skips_empty() {
        let grid = create_test_grid();
        assert_eq!(grid.chunks_overlapping(0, 0, 0, 10).count(), 0);
        assert_eq!(grid.chunks_overlapping(4, 4, 10, 0).count(), 0);
        assert_eq!(grid.chunks_overlapping(12, 0, 3, 3).count(), 0);

        let ids: Vec<usize> = grid.chunks_overlapping(8, 8, 50, 50).map(|c| c.id).collect();
        assert_eq!(ids, vec![8]);
    }

    #[test]
    fn test_overlap_windows() {
        let grid = create_test_grid();
        let extent = grid.extent(1, 0);
        let (cy, cx, by, bx) = extent.overlap(3, 3, 4, 4);
        assert_eq!((cy, cx), (0..3, 3..4));
        assert_eq!((by, bx), (1..4, 0..1));
    }

    #[test]
    fn test_is_in_bounds() {
        let grid = create_test_grid();
        assert!(grid.is_in_bounds(0, 0));
        assert!(grid.is_in_bounds(9, 9));
        assert!(!grid.is_in_bounds(10, 0));
        assert!(!grid.is_in_bounds(0, 10));
    }
}
