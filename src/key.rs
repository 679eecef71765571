//! Index grammar for 2D bands and its normalization
//!
//! Keys follow numpy conventions: a bare integer addresses the band as a
//! flattened row-major array, a pair addresses `(row, col)` with each
//! component either an integer or a strided slice, a bare slice selects whole
//! rows, and a boolean mask the size of the band selects individual cells.
//!
//! Every key is resolved once into a [`Resolved`] selection before storage is
//! touched, so band implementations never see the key grammar itself.

use crate::error::{BandError, Result};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

/// A Python-style `start:stop:step` slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl SliceSpec {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// `:`
    pub fn full() -> Self {
        Self::default()
    }

    /// `start:stop`
    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    /// `::step`
    pub fn step(step: isize) -> Self {
        Self::new(None, None, Some(step))
    }

    /// Set the step of this slice
    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Clip this slice against an axis of length `len`, returning the
    /// concrete `(start, stop, step)` triple.
    ///
    /// Out-of-range bounds are clamped rather than rejected; only a zero step
    /// is an error.
    pub fn indices(&self, len: usize) -> Result<(isize, isize, isize)> {
        let len = len as isize;
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(BandError::UnsupportedKey(
                "slice step cannot be zero".to_string(),
            ));
        }

        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: isize| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(lower, upper)
        };

        let start = match self.start {
            Some(s) => clamp(s),
            None if step < 0 => upper,
            None => lower,
        };
        let stop = match self.stop {
            Some(s) => clamp(s),
            None if step < 0 => lower,
            None => upper,
        };

        Ok((start, stop, step))
    }

    /// Resolve against an axis of length `len` into the dense extent it
    /// walks plus its stride
    pub fn resolve(&self, len: usize) -> Result<AxisRange> {
        let (start, stop, step) = self.indices(len)?;

        // Negative strides still read the dense block forward; the reversal
        // happens when subsampling.
        let range = if step > 0 && start < stop {
            AxisRange::new(start as usize, (stop - start) as usize, step)
        } else if step < 0 && start > stop {
            AxisRange::new((stop + 1) as usize, (start - stop) as usize, step)
        } else {
            AxisRange::new(0, 0, step)
        };
        Ok(range)
    }
}

impl fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: Option<isize>| v.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

/// One component of a tuple key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Int(isize),
    Slice(SliceSpec),
}

impl Index {
    fn resolve(&self, len: usize, axis: &str) -> Result<AxisRange> {
        match self {
            Index::Int(i) => Ok(AxisRange::single(wrap_index(*i, len, axis)?)),
            Index::Slice(s) => s.resolve(len),
        }
    }
}

impl From<isize> for Index {
    fn from(i: isize) -> Self {
        Index::Int(i)
    }
}

impl From<SliceSpec> for Index {
    fn from(s: SliceSpec) -> Self {
        Index::Slice(s)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Int(i) => write!(f, "{}", i),
            Index::Slice(s) => write!(f, "{}", s),
        }
    }
}

/// A key addressing a 2D band
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// Flattened row-major position of a single cell
    Flat(isize),
    /// Whole rows
    Rows(SliceSpec),
    /// `(row, col)` components
    Pair(Index, Index),
    /// Components of arbitrary arity, checked when resolved
    Tuple(Vec<Index>),
    /// Boolean mask with the same shape as the band
    Mask(Array2<bool>),
}

impl Key {
    /// `(row, col)` cell
    pub fn cell(row: isize, col: isize) -> Self {
        Key::Pair(Index::Int(row), Index::Int(col))
    }

    /// Rectangle addressed by two slices
    pub fn region(rows: SliceSpec, cols: SliceSpec) -> Self {
        Key::Pair(Index::Slice(rows), Index::Slice(cols))
    }

    /// Every cell of the band
    pub fn all() -> Self {
        Key::region(SliceSpec::full(), SliceSpec::full())
    }

    /// Normalize this key against a band of `size`
    pub fn resolve(&self, size: (usize, usize)) -> Result<Resolved<'_>> {
        let (rows, cols) = size;
        match self {
            Key::Flat(i) => {
                let total = rows * cols;
                let flat = wrap_index(*i, total, "flattened")?;
                Ok(Resolved::Cell {
                    row: flat / cols,
                    col: flat % cols,
                })
            }
            Key::Rows(s) => Ok(Resolved::Region(Region {
                y: s.resolve(rows)?,
                x: AxisRange::new(0, cols, 1),
            })),
            Key::Pair(k0, k1) => resolve_pair(k0, k1, size),
            Key::Tuple(components) => match components.as_slice() {
                [k0] => Ok(Resolved::Region(Region {
                    y: k0.resolve(rows, "row")?,
                    x: AxisRange::new(0, cols, 1),
                })),
                [k0, k1] => resolve_pair(k0, k1, size),
                other => Err(BandError::Dimensionality(format!(
                    "band can only be indexed along two dimensions, got {} components",
                    other.len()
                ))),
            },
            Key::Mask(mask) => {
                if mask.dim() != size {
                    return Err(BandError::Dimensionality(format!(
                        "boolean mask of shape {:?} does not match band of shape {:?}",
                        mask.dim(),
                        size
                    )));
                }
                Ok(Resolved::Mask(mask))
            }
        }
    }
}

impl From<isize> for Key {
    fn from(i: isize) -> Self {
        Key::Flat(i)
    }
}

impl From<SliceSpec> for Key {
    fn from(s: SliceSpec) -> Self {
        Key::Rows(s)
    }
}

impl From<(Index, Index)> for Key {
    fn from((k0, k1): (Index, Index)) -> Self {
        Key::Pair(k0, k1)
    }
}

impl From<Array2<bool>> for Key {
    fn from(mask: Array2<bool>) -> Self {
        Key::Mask(mask)
    }
}

impl FromStr for Key {
    type Err = BandError;

    /// Parse numpy-style index text such as `"3"`, `"2:8:2, ::-1"` or `"4, 1:"`
    fn from_str(s: &str) -> Result<Self> {
        let components = s
            .split(',')
            .map(parse_component)
            .collect::<Result<Vec<_>>>()?;

        match components.as_slice() {
            [Index::Int(i)] => Ok(Key::Flat(*i)),
            [Index::Slice(sl)] => Ok(Key::Rows(*sl)),
            [k0, k1] => Ok(Key::Pair(*k0, *k1)),
            other => Err(BandError::Dimensionality(format!(
                "band can only be indexed along two dimensions, got {} components",
                other.len()
            ))),
        }
    }
}

fn parse_component(text: &str) -> Result<Index> {
    let text = text.trim();
    let parse_int = |part: &str| -> Result<isize> {
        part.trim().parse::<isize>().map_err(|_| {
            BandError::UnsupportedKey(format!(
                "indexing with '{}' not supported",
                text
            ))
        })
    };

    if !text.contains(':') {
        return parse_int(text).map(Index::Int);
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 {
        return Err(BandError::UnsupportedKey(format!(
            "slice '{}' has too many parts",
            text
        )));
    }
    let bound = |i: usize| -> Result<Option<isize>> {
        match parts.get(i).map(|p| p.trim()) {
            None | Some("") => Ok(None),
            Some(p) => parse_int(p).map(Some),
        }
    };
    Ok(Index::Slice(SliceSpec::new(bound(0)?, bound(1)?, bound(2)?)))
}

fn resolve_pair(k0: &Index, k1: &Index, (rows, cols): (usize, usize)) -> Result<Resolved<'static>> {
    match (k0, k1) {
        (Index::Int(r), Index::Int(c)) => Ok(Resolved::Cell {
            row: wrap_index(*r, rows, "row")?,
            col: wrap_index(*c, cols, "column")?,
        }),
        _ => Ok(Resolved::Region(Region {
            y: k0.resolve(rows, "row")?,
            x: k1.resolve(cols, "column")?,
        })),
    }
}

fn wrap_index(index: isize, len: usize, axis: &str) -> Result<usize> {
    let wrapped = if index < 0 { index + len as isize } else { index };
    if wrapped < 0 || wrapped as usize >= len {
        return Err(BandError::OutOfBounds(format!(
            "{} index {} is out of bounds for axis of length {}",
            axis, index, len
        )));
    }
    Ok(wrapped as usize)
}

/// Dense extent along one axis plus the stride used to subsample it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    /// First cell of the dense extent
    pub offset: usize,
    /// Number of cells in the dense extent
    pub count: usize,
    /// Stride; negative strides walk the extent backwards
    pub step: isize,
}

impl AxisRange {
    pub fn new(offset: usize, count: usize, step: isize) -> Self {
        Self {
            offset,
            count,
            step,
        }
    }

    pub fn single(offset: usize) -> Self {
        Self::new(offset, 1, 1)
    }

    /// Number of cells selected after applying the stride
    pub fn len(&self) -> usize {
        let step = self.step.unsigned_abs();
        (self.count + step - 1) / step
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_dense(&self) -> bool {
        self.step == 1
    }
}

/// A rectangle plus per-axis strides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub y: AxisRange,
    pub x: AxisRange,
}

impl Region {
    /// Shape of the selection after striding
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Shape of the dense rectangle the selection lives in
    pub fn dense_shape(&self) -> (usize, usize) {
        (self.y.count, self.x.count)
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty() || self.x.is_empty()
    }

    pub fn is_dense(&self) -> bool {
        self.y.is_dense() && self.x.is_dense()
    }
}

/// A key after normalization against a band size
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Cell { row: usize, col: usize },
    Region(Region),
    Mask(&'a Array2<bool>),
}

impl<'a> Resolved<'a> {
    /// Shape of the value a `get` returns and a `set` expects
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Resolved::Cell { .. } => Vec::new(),
            Resolved::Region(region) => {
                let (ny, nx) = region.shape();
                vec![ny, nx]
            }
            Resolved::Mask(mask) => vec![mask.iter().filter(|&&m| m).count()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> SliceSpec {
        SliceSpec::new(start, stop, step)
    }

    #[test]
    fn test_slice_indices_match_python() {
        assert_eq!(SliceSpec::full().indices(10).unwrap(), (0, 10, 1));
        assert_eq!(slice(Some(-3), None, None).indices(10).unwrap(), (7, 10, 1));
        assert_eq!(slice(None, Some(100), None).indices(10).unwrap(), (0, 10, 1));
        assert_eq!(SliceSpec::step(-1).indices(10).unwrap(), (9, -1, -1));
        assert_eq!(slice(Some(9), Some(-1), Some(-1)).indices(10).unwrap(), (9, 9, -1));
        assert_eq!(slice(Some(20), Some(-20), Some(-2)).indices(10).unwrap(), (9, -1, -2));
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = SliceSpec::step(0).indices(10).unwrap_err();
        assert!(matches!(err, BandError::UnsupportedKey(_)));
    }

    #[test]
    fn test_negative_step_offset() {
        // 9, 8, ..., 0 walks the dense block [0, 10)
        let range = SliceSpec::step(-1).resolve(10).unwrap();
        assert_eq!(range, AxisRange::new(0, 10, -1));

        // 7, 5, 3 walks [3, 8)
        let range = slice(Some(7), Some(2), Some(-2)).resolve(10).unwrap();
        assert_eq!(range, AxisRange::new(3, 5, -2));
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_empty_slices() {
        assert!(SliceSpec::range(7, 3).resolve(10).unwrap().is_empty());
        assert!(SliceSpec::range(12, 15).resolve(10).unwrap().is_empty());
        assert!(slice(Some(2), Some(5), Some(-1)).resolve(10).unwrap().is_empty());
    }

    #[test]
    fn test_axis_range_len() {
        assert_eq!(AxisRange::new(0, 10, 3).len(), 4);
        assert_eq!(AxisRange::new(0, 9, 3).len(), 3);
        assert_eq!(AxisRange::new(0, 0, 2).len(), 0);
    }

    #[test]
    fn test_region_dense_and_strided_shape() {
        let key = Key::region(SliceSpec::new(Some(8), Some(1), Some(-3)), SliceSpec::step(2));
        let region = match key.resolve((10, 5)).unwrap() {
            Resolved::Region(region) => region,
            other => panic!("expected a region, got {:?}", other),
        };
        // rows 8, 5, 2 inside [2, 9); columns 0, 2, 4 inside [0, 5)
        assert_eq!(region.dense_shape(), (7, 5));
        assert_eq!(region.shape(), (3, 3));
        assert!(!region.is_dense());
    }

    #[test]
    fn test_flat_key() {
        let resolved = Key::Flat(23).resolve((5, 10)).unwrap();
        assert_eq!(resolved, Resolved::Cell { row: 2, col: 3 });

        let resolved = Key::Flat(-1).resolve((5, 10)).unwrap();
        assert_eq!(resolved, Resolved::Cell { row: 4, col: 9 });

        assert!(matches!(
            Key::Flat(50).resolve((5, 10)),
            Err(BandError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_pair_keys() {
        let key = Key::Pair(Index::Int(2), Index::Slice(SliceSpec::range(1, 4)));
        match key.resolve((5, 10)).unwrap() {
            Resolved::Region(region) => {
                assert_eq!(region.y, AxisRange::single(2));
                assert_eq!(region.x, AxisRange::new(1, 3, 1));
                assert_eq!(region.shape(), (1, 3));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(
            Key::cell(-1, -2).resolve((5, 10)).unwrap(),
            Resolved::Cell { row: 4, col: 8 }
        );
    }

    #[test]
    fn test_tuple_arity() {
        let key = Key::Tuple(vec![Index::Int(0), Index::Int(0), Index::Int(0)]);
        assert!(matches!(
            key.resolve((5, 5)),
            Err(BandError::Dimensionality(_))
        ));

        let key = Key::Tuple(vec![]);
        assert!(matches!(
            key.resolve((5, 5)),
            Err(BandError::Dimensionality(_))
        ));

        let key = Key::Tuple(vec![Index::Int(1), Index::Int(2)]);
        assert_eq!(
            key.resolve((5, 5)).unwrap(),
            Resolved::Cell { row: 1, col: 2 }
        );

        let key = Key::Tuple(vec![Index::Int(3)]);
        assert_eq!(key.resolve((5, 5)).unwrap().shape(), vec![1, 5]);
    }

    #[test]
    fn test_mask_shape_checked() {
        let key = Key::Mask(Array2::from_elem((3, 3), true));
        assert!(matches!(
            key.resolve((4, 3)),
            Err(BandError::Dimensionality(_))
        ));
        assert_eq!(key.resolve((3, 3)).unwrap().shape(), vec![9]);
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("7".parse::<Key>().unwrap(), Key::Flat(7));
        assert_eq!(
            "::-1".parse::<Key>().unwrap(),
            Key::Rows(SliceSpec::step(-1))
        );
        assert_eq!(
            "3:7, ::2".parse::<Key>().unwrap(),
            Key::region(SliceSpec::range(3, 7), SliceSpec::step(2))
        );
        assert_eq!(
            " 4 , 1: ".parse::<Key>().unwrap(),
            Key::Pair(Index::Int(4), Index::Slice(slice(Some(1), None, None)))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "1, 2, 3".parse::<Key>(),
            Err(BandError::Dimensionality(_))
        ));
        assert!(matches!(
            "..., 2".parse::<Key>(),
            Err(BandError::UnsupportedKey(_))
        ));
        assert!(matches!(
            "None, 2".parse::<Key>(),
            Err(BandError::UnsupportedKey(_))
        ));
        assert!(matches!(
            "1:2:3:4, 0".parse::<Key>(),
            Err(BandError::UnsupportedKey(_))
        ));
    }

    #[test]
    fn test_slice_display() {
        assert_eq!(SliceSpec::range(3, 7).to_string(), "3:7");
        assert_eq!(SliceSpec::step(-1).to_string(), "::-1");
    }
}
