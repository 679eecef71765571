//! Band storage - the shared `get`/`set` contract and its two backends
//!
//! A band is a fixed-size, fixed-dtype 2D array. [`DirectBand`] keeps the
//! whole array in one uncompressed buffer; [`CompressedBand`] stores it as
//! independently compressed chunks and only touches the chunks an access
//! overlaps. Both accept the same [`Key`] grammar and return the same
//! [`Selection`] shapes.

mod compressed;
mod direct;

pub use compressed::{BandStats, ChunkState, CompressedBand};
pub use direct::DirectBand;

use crate::error::{BandError, Result};
use crate::key::{AxisRange, Key, Region};
use crate::types::{DataType, Element};
use ndarray::{Array, Array1, Array2, ArrayD, Axis, Dimension, Slice};

/// Result of a `get`
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// Scalar keys reduce to a bare value
    Scalar(T),
    /// Rectangles are 2D, masks 1D, stacked multi-band results one axis more
    Array(ArrayD<T>),
}

impl<T: Element> Selection<T> {
    /// Shape of the selection; empty for scalars
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Selection::Scalar(_) => Vec::new(),
            Selection::Array(a) => a.shape().to_vec(),
        }
    }

    pub fn as_scalar(&self) -> Option<T> {
        match self {
            Selection::Scalar(v) => Some(*v),
            Selection::Array(_) => None,
        }
    }

    /// Convert to an array; scalars become 0-dimensional arrays
    pub fn into_array(self) -> ArrayD<T> {
        match self {
            Selection::Scalar(v) => ArrayD::from_elem(Vec::new(), v),
            Selection::Array(a) => a,
        }
    }

    /// Convert to an array of a fixed dimensionality
    pub fn into_dimensionality<D: Dimension>(self) -> Result<Array<T, D>> {
        Ok(self.into_array().into_dimensionality::<D>()?)
    }
}

/// Input to a `set`
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// Broadcast over every addressed cell
    Scalar(T),
    /// Must match the addressed shape exactly
    Array(ArrayD<T>),
    /// One value per band of a multi-band indexer
    Bands(Vec<Value<T>>),
}

impl<T> From<ArrayD<T>> for Value<T> {
    fn from(a: ArrayD<T>) -> Self {
        Value::Array(a)
    }
}

impl<T> From<Array2<T>> for Value<T> {
    fn from(a: Array2<T>) -> Self {
        Value::Array(a.into_dyn())
    }
}

impl<T> From<Array1<T>> for Value<T> {
    fn from(a: Array1<T>) -> Self {
        Value::Array(a.into_dyn())
    }
}

impl<T> From<Vec<Value<T>>> for Value<T> {
    fn from(values: Vec<Value<T>>) -> Self {
        Value::Bands(values)
    }
}

/// Indexing contract shared by every band backend
pub trait Band<T: Element>: Send {
    /// `(rows, cols)`, fixed at construction
    fn size(&self) -> (usize, usize);

    /// Element type, fixed at construction
    fn dtype(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Read the cells addressed by `key`
    fn get(&self, key: &Key) -> Result<Selection<T>>;

    /// Write `value` into the cells addressed by `key`.
    ///
    /// The key and the value shape are validated before anything is stored.
    fn set(&mut self, key: &Key, value: Value<T>) -> Result<()>;

    /// Shape `get(key)` returns and `set(key, _)` expects, without touching
    /// storage
    fn selection_shape(&self, key: &Key) -> Result<Vec<usize>> {
        Ok(key.resolve(self.size())?.shape())
    }

    /// Check that `value` could be written at `key`
    fn check_value(&self, key: &Key, value: &Value<T>) -> Result<()> {
        check_value_shape(&self.selection_shape(key)?, value)
    }
}

pub(crate) fn check_value_shape<T>(expected: &[usize], value: &Value<T>) -> Result<()> {
    match value {
        Value::Scalar(_) => Ok(()),
        // a single cell also takes the (1, 1) block a region read would give
        Value::Array(a) if expected.is_empty() && a.shape() == [1, 1] => Ok(()),
        Value::Array(a) if a.shape() == expected => Ok(()),
        Value::Array(a) => Err(BandError::shape_mismatch(expected, a.shape())),
        Value::Bands(values) => Err(per_band_error(values.len())),
    }
}

fn per_band_error(count: usize) -> BandError {
    BandError::Configuration(format!("{} per-band values given to a single band", count))
}

pub(crate) fn cell_value<T: Element>(value: Value<T>) -> Result<T> {
    check_value_shape(&[], &value)?;
    match value {
        Value::Scalar(v) => Ok(v),
        Value::Array(a) => a
            .iter()
            .next()
            .copied()
            .ok_or_else(|| BandError::shape_mismatch(&[], a.shape())),
        Value::Bands(values) => Err(per_band_error(values.len())),
    }
}

pub(crate) fn region_block<T: Element>(value: Value<T>, shape: (usize, usize)) -> Result<Array2<T>> {
    check_value_shape(&[shape.0, shape.1], &value)?;
    match value {
        Value::Scalar(v) => Ok(Array2::from_elem(shape, v)),
        Value::Array(a) => Ok(a.into_dimensionality()?),
        Value::Bands(values) => Err(per_band_error(values.len())),
    }
}

pub(crate) fn mask_values<T: Element>(value: Value<T>, count: usize) -> Result<Vec<T>> {
    check_value_shape(&[count], &value)?;
    match value {
        Value::Scalar(v) => Ok(vec![v; count]),
        Value::Array(a) => Ok(a.iter().copied().collect()),
        Value::Bands(values) => Err(per_band_error(values.len())),
    }
}

/// Cells of `full` where `mask` is true, in row-major order
pub(crate) fn gather<T: Element>(full: &Array2<T>, mask: &Array2<bool>) -> Array1<T> {
    full.iter()
        .zip(mask.iter())
        .filter(|&(_, &m)| m)
        .map(|(&v, _)| v)
        .collect()
}

/// Write `values` into the cells of `full` where `mask` is true
pub(crate) fn scatter<T: Element>(full: &mut Array2<T>, mask: &Array2<bool>, values: &[T]) {
    full.iter_mut()
        .zip(mask.iter())
        .filter(|&(_, &m)| m)
        .zip(values)
        .for_each(|((cell, _), &v)| *cell = v);
}

/// ndarray slice walking `range` in selection order
pub(crate) fn axis_slice(range: AxisRange) -> Slice {
    let start = range.offset as isize;
    Slice::new(start, Some(start + range.count as isize), range.step)
}

/// Stride of `range` applied to its own dense extent
pub(crate) fn stride_slice(range: AxisRange) -> Slice {
    Slice::new(0, None, range.step)
}

/// Subsample a dense block of `region` by its strides
pub(crate) fn subsample<T: Element>(dense: Array2<T>, region: &Region) -> Array2<T> {
    if region.is_dense() {
        return dense;
    }
    let mut view = dense.view();
    view.slice_axis_inplace(Axis(0), stride_slice(region.y));
    view.slice_axis_inplace(Axis(1), stride_slice(region.x));
    view.to_owned()
}
