//! Error types for wxeval_analysis.

use thiserror::Error;

/// Result type alias using [`AnalysisError`].
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur in cost and permutation routines.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The cost function does not support this many classes.
    #[error("Unsupported number of classes: {got} (expected {expected})")]
    UnsupportedClassCount {
        /// Supported class count.
        expected: usize,
        /// Columns of the probability matrix.
        got: usize,
    },

    /// Array shapes do not line up.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] wxeval_core::CoreError),
}

impl From<ndarray::ShapeError> for AnalysisError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

pub(crate) fn check_index(index: usize, length: usize) -> Result<()> {
    if index >= length {
        return Err(AnalysisError::IndexOutOfBounds { index, length });
    }
    Ok(())
}
