//! Single- and multi-band views over same-shaped bands

use crate::band::{Band, Selection, Value};
use crate::error::{BandError, Result};
use crate::key::{Index, Key, SliceSpec};
use crate::types::{DataType, Element};
use ndarray::{Array2, Axis, Ix2};

/// One indexing surface over one or more bands of identical size.
///
/// With a single band every call is forwarded unchanged. With `N` bands,
/// `get` stacks the per-band results along a new leading axis (trailing for
/// mask keys) and `set` expects one value per band.
pub struct BandIndexer<T: Element> {
    bands: Vec<Box<dyn Band<T>>>,
}

impl<T: Element> BandIndexer<T> {
    /// Compose `bands`, which must be non-empty and share one size
    pub fn new(bands: Vec<Box<dyn Band<T>>>) -> Result<Self> {
        let first = bands.first().ok_or_else(|| {
            BandError::Configuration("band indexer requires at least one band".to_string())
        })?;

        let (size, dtype) = (first.size(), first.dtype());
        for (i, band) in bands.iter().enumerate().skip(1) {
            if band.size() != size {
                return Err(BandError::Configuration(format!(
                    "band {} has size {:?}, expected {:?}",
                    i,
                    band.size(),
                    size
                )));
            }
            if band.dtype() != dtype {
                return Err(BandError::Configuration(format!(
                    "band {} has dtype {}, expected {}",
                    i,
                    band.dtype(),
                    dtype
                )));
            }
        }

        Ok(Self { bands })
    }

    /// Indexer over a single band
    pub fn single(band: impl Band<T> + 'static) -> Self {
        Self {
            bands: vec![Box::new(band)],
        }
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Always false; an indexer holds at least one band
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn band(&self, i: usize) -> Option<&dyn Band<T>> {
        self.bands.get(i).map(|b| b.as_ref())
    }

    pub fn band_mut(&mut self, i: usize) -> Option<&mut (dyn Band<T> + 'static)> {
        self.bands.get_mut(i).map(|b| b.as_mut())
    }

    /// Release the bands
    pub fn into_bands(self) -> Vec<Box<dyn Band<T>>> {
        self.bands
    }

    /// `(rows, cols)` shared by every band
    pub fn size(&self) -> (usize, usize) {
        self.bands[0].size()
    }

    /// `[rows, cols]` for one band, `[N, rows, cols]` for `N` bands
    pub fn shape(&self) -> Vec<usize> {
        let (rows, cols) = self.size();
        match self.bands.len() {
            1 => vec![rows, cols],
            n => vec![n, rows, cols],
        }
    }

    pub fn dtype(&self) -> DataType {
        self.bands[0].dtype()
    }

    /// Read `key` from every band
    pub fn get(&self, key: &Key) -> Result<Selection<T>> {
        if let [band] = self.bands.as_slice() {
            return band.get(key);
        }

        let parts = self
            .bands
            .iter()
            .map(|band| band.get(key).map(Selection::into_array))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = parts.iter().map(|a| a.view()).collect();

        let axis = match key {
            Key::Mask(_) => Axis(parts[0].ndim()),
            _ => Axis(0),
        };
        Ok(Selection::Array(ndarray::stack(axis, &views)?))
    }

    /// Write `value` at `key`.
    ///
    /// A multi-band indexer accepts [`Value::Bands`] with one entry per band,
    /// an array whose band axis has length `N` (leading, or trailing for mask
    /// keys), or a scalar written to every band. Every per-band value is
    /// checked before any band is written.
    pub fn set(&mut self, key: &Key, value: Value<T>) -> Result<()> {
        if let [band] = self.bands.as_mut_slice() {
            return band.set(key, value);
        }

        let values = self.split_value(key, value)?;
        for (band, value) in self.bands.iter().zip(&values) {
            band.check_value(key, value).map_err(|err| match (key, err) {
                (Key::Mask(_), BandError::ShapeMismatch { expected, found }) => {
                    BandError::Configuration(format!(
                        "mask selects {:?} cells per band, got a value of shape {:?}",
                        expected, found
                    ))
                }
                (_, err) => err,
            })?;
        }

        for (band, value) in self.bands.iter_mut().zip(values) {
            band.set(key, value)?;
        }
        Ok(())
    }

    fn split_value(&self, key: &Key, value: Value<T>) -> Result<Vec<Value<T>>> {
        let n = self.bands.len();
        match value {
            Value::Scalar(v) => Ok(vec![Value::Scalar(v); n]),
            Value::Bands(values) if values.len() == n => Ok(values),
            Value::Bands(values) => Err(BandError::shape_mismatch(&[n], &[values.len()])),
            Value::Array(array) => {
                let is_mask = matches!(key, Key::Mask(_));
                let axis = match is_mask {
                    true => Axis(array.ndim().saturating_sub(1)),
                    false => Axis(0),
                };
                if array.ndim() == 0 || array.len_of(axis) != n {
                    let mut expected = self.bands[0].selection_shape(key)?;
                    match is_mask {
                        true => expected.push(n),
                        false => expected.insert(0, n),
                    }
                    return Err(BandError::shape_mismatch(&expected, array.shape()));
                }
                Ok(array
                    .axis_iter(axis)
                    .map(|part| Value::Array(part.to_owned()))
                    .collect())
            }
        }
    }

    /// Rows of the indexer in order, each `(N, cols)`.
    ///
    /// Call again to start over.
    pub fn rows(&self) -> Rows<'_, T> {
        Rows {
            indexer: self,
            next: 0,
        }
    }

    fn row(&self, i: usize) -> Result<Array2<T>> {
        let key = Key::Pair(Index::Int(i as isize), Index::Slice(SliceSpec::full()));
        let parts = self
            .bands
            .iter()
            .map(|band| band.get(&key)?.into_dimensionality::<Ix2>())
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = parts.iter().map(|a| a.view()).collect();
        Ok(ndarray::concatenate(Axis(0), &views)?)
    }
}

/// Iterator over the rows of a [`BandIndexer`]
pub struct Rows<'a, T: Element> {
    indexer: &'a BandIndexer<T>,
    next: usize,
}

impl<'a, T: Element> Iterator for Rows<'a, T> {
    type Item = Result<Array2<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.indexer.size().0 {
            return None;
        }
        let row = self.indexer.row(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.indexer.size().0.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<'a, T: Element> ExactSizeIterator for Rows<'a, T> {}

impl<'a, T: Element> IntoIterator for &'a BandIndexer<T> {
    type Item = Result<Array2<T>>;
    type IntoIter = Rows<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

impl<T: Element> std::fmt::Debug for BandIndexer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandIndexer")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .finish()
    }
}
