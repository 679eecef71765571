//! Error types for band operations

use thiserror::Error;

/// Main error type for band operations
#[derive(Error, Debug)]
pub enum BandError {
    /// Key arity or key kind cannot address a 2D band
    #[error("Dimensionality error: {0}")]
    Dimensionality(String),

    /// A key component is neither an integer nor a slice
    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("Shape mismatch: cannot assign value of shape {found:?} to selection of shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BandError {
    pub(crate) fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        BandError::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Specialized Result type for band operations
pub type Result<T> = std::result::Result<T, BandError>;

impl From<serde_json::Error> for BandError {
    fn from(err: serde_json::Error) -> Self {
        BandError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BandError {
    fn from(err: ndarray::ShapeError) -> Self {
        BandError::Dimensionality(err.to_string())
    }
}
