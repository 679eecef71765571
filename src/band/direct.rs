//! Uncompressed band backed by a single ndarray buffer

use super::{axis_slice, cell_value, gather, mask_values, region_block, scatter, Band, Selection, Value};
use crate::error::Result;
use crate::key::{Key, Resolved};
use crate::types::Element;
use ndarray::{Array2, Axis};

/// Band holding every cell in one contiguous `Array2`.
///
/// This is the reference behaviour [`CompressedBand`](super::CompressedBand)
/// reproduces; every key maps straight onto an ndarray view.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectBand<T: Element> {
    array: Array2<T>,
}

impl<T: Element> DirectBand<T> {
    /// Zero-filled band of `size`
    pub fn new(size: (usize, usize)) -> Self {
        Self {
            array: Array2::zeros(size),
        }
    }

    /// Band of `size` with every cell set to `fill`
    pub fn with_fill(size: (usize, usize), fill: T) -> Self {
        Self {
            array: Array2::from_elem(size, fill),
        }
    }

    /// Wrap an existing array; the band takes its shape
    pub fn from_array(array: Array2<T>) -> Self {
        Self { array }
    }

    pub fn as_array(&self) -> &Array2<T> {
        &self.array
    }

    pub fn into_array(self) -> Array2<T> {
        self.array
    }
}

impl<T: Element> Band<T> for DirectBand<T> {
    fn size(&self) -> (usize, usize) {
        self.array.dim()
    }

    fn get(&self, key: &Key) -> Result<Selection<T>> {
        match key.resolve(self.size())? {
            Resolved::Cell { row, col } => Ok(Selection::Scalar(self.array[[row, col]])),
            Resolved::Region(region) => {
                let mut view = self.array.view();
                view.slice_axis_inplace(Axis(0), axis_slice(region.y));
                view.slice_axis_inplace(Axis(1), axis_slice(region.x));
                Ok(Selection::Array(view.to_owned().into_dyn()))
            }
            Resolved::Mask(mask) => Ok(Selection::Array(gather(&self.array, mask).into_dyn())),
        }
    }

    fn set(&mut self, key: &Key, value: Value<T>) -> Result<()> {
        match key.resolve(self.size())? {
            Resolved::Cell { row, col } => {
                self.array[[row, col]] = cell_value(value)?;
            }
            Resolved::Region(region) => {
                let block = region_block(value, region.shape())?;
                let mut view = self.array.view_mut();
                view.slice_axis_inplace(Axis(0), axis_slice(region.y));
                view.slice_axis_inplace(Axis(1), axis_slice(region.x));
                view.assign(&block);
            }
            Resolved::Mask(mask) => {
                let count = mask.iter().filter(|&&m| m).count();
                let values = mask_values(value, count)?;
                scatter(&mut self.array, mask, &values);
            }
        }
        Ok(())
    }
}
