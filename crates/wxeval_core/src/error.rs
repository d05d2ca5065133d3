//! Error types for wxeval_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Input validation errors.
///
/// Degenerate statistics (a zero denominator in a skill score) are never
/// reported through this type; they surface as `NaN` values instead.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Two paired arrays have different lengths.
    #[error("Length mismatch: {what} has length {got}, expected {expected}")]
    LengthMismatch {
        /// Name of the offending array.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// An array that must hold at least one value is empty.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// A probability lies outside [0, 1] or is NaN.
    #[error("Probability at index {index} is {value}, expected a value in [0, 1]")]
    ProbabilityOutOfRange {
        /// Position in the input array.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// A label is neither 0 nor 1.
    #[error("Label at index {index} is {value}, expected 0 or 1")]
    InvalidLabel {
        /// Position in the input array.
        index: usize,
        /// The offending value.
        value: i64,
    },

    /// A binarization threshold lies outside the admissible range.
    #[error("Binarization threshold {value} is outside [{min}, {max}]")]
    InvalidThreshold {
        /// The offending value.
        value: f64,
        /// Smallest admissible threshold.
        min: f64,
        /// Largest admissible threshold.
        max: f64,
    },

    /// Any other argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
