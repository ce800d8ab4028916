//! Error types for nnstore

use std::fmt;
use thiserror::Error;

/// Result type alias for nnstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nnstore operations
#[derive(Error, Debug)]
pub enum Error {
    /// No data source / generative data / model / density currently held.
    #[error("state missing: {0}")]
    StateMissing(String),

    /// A column operation was attempted against a variant it does not support.
    #[error("invalid column type: {0}")]
    InvalidColumnType(String),

    /// A scale type was used where the column does not support it.
    #[error("invalid scale type: {0}")]
    InvalidScaleType(String),

    /// A row index fell outside `[0, size)`.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A column index fell outside the column vector's bounds.
    #[error("invalid column index: {0}")]
    InvalidColumnIndex(String),

    /// A feature-vector position did not map to any column.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// A raw cell string failed to parse as a numeric value.
    #[error("parse error at column {column}: {value:?}")]
    ParseError { column: usize, value: String },

    /// A caller-supplied vector's length did not equal `dimension()`.
    #[error("invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// A caller-supplied vector's length did not match an expected size.
    #[error("invalid vector size: {0}")]
    InvalidVectorSize(String),

    /// A normalised-only operation was invoked before `normalize`.
    #[error("data source has not been normalized")]
    NotNormalized,

    /// A density-dependent operation was invoked with an empty density vector.
    #[error("no densities have been computed")]
    NoDensities,

    /// A persisted record's type-id header did not match the expected tag.
    #[error("invalid type id: expected {expected}, got {actual}")]
    InvalidTypeId { expected: String, actual: String },

    /// Binary I/O failed while reading or writing a persisted record.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A density estimate overflowed to infinity.
    #[error("invalid density: {0}")]
    InvalidDensity(String),

    /// Two vectors expected to have matching length did not.
    #[error("different sizes: {0}")]
    DifferentSizes(String),

    /// Tree search and linear search disagreed on result distances.
    #[error("nearest neighbor search disagreement: {0}")]
    NearestNeighborDifferent(String),

    /// Catch-all for invariants violated in a way none of the above names.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    pub fn state_missing(msg: impl Into<String>) -> Self {
        Self::StateMissing(msg.into())
    }

    pub fn invalid_column_type(msg: impl Into<String>) -> Self {
        Self::InvalidColumnType(msg.into())
    }

    pub fn invalid_scale_type(msg: impl Into<String>) -> Self {
        Self::InvalidScaleType(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn invalid_column_index(msg: impl Into<String>) -> Self {
        Self::InvalidColumnIndex(msg.into())
    }

    pub fn invalid_index(msg: impl Into<String>) -> Self {
        Self::InvalidIndex(msg.into())
    }

    pub fn parse_error(column: usize, value: impl Into<String>) -> Self {
        Self::ParseError {
            column,
            value: value.into(),
        }
    }

    pub fn invalid_dimension(expected: usize, actual: usize) -> Self {
        Self::InvalidDimension { expected, actual }
    }

    pub fn invalid_vector_size(msg: impl Into<String>) -> Self {
        Self::InvalidVectorSize(msg.into())
    }

    pub fn invalid_type_id(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidTypeId {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_density(msg: impl Into<String>) -> Self {
        Self::InvalidDensity(msg.into())
    }

    pub fn different_sizes(msg: impl Into<String>) -> Self {
        Self::DifferentSizes(msg.into())
    }

    pub fn nearest_neighbor_different(msg: impl Into<String>) -> Self {
        Self::NearestNeighborDifferent(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Whether the failed operation could plausibly succeed on retry without
    /// the caller changing anything about the request itself.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::StateMissing(_) => false,
            Error::InvalidColumnType(_) => false,
            Error::InvalidScaleType(_) => false,
            Error::OutOfRange(_) => false,
            Error::InvalidColumnIndex(_) => false,
            Error::InvalidIndex(_) => false,
            Error::ParseError { .. } => false,
            Error::InvalidDimension { .. } => false,
            Error::InvalidVectorSize(_) => false,
            Error::NotNormalized => false,
            Error::NoDensities => false,
            Error::InvalidTypeId { .. } => false,
            Error::InvalidDensity(_) => false,
            Error::DifferentSizes(_) => false,
            Error::NearestNeighborDifferent(_) => false,
            Error::InvalidOperation(_) => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Io(_) => ErrorCategory::Io,
            Error::StateMissing(_) => ErrorCategory::State,
            Error::InvalidColumnType(_) | Error::InvalidScaleType(_) => ErrorCategory::Schema,
            Error::OutOfRange(_) | Error::InvalidColumnIndex(_) | Error::InvalidIndex(_) => {
                ErrorCategory::Bounds
            }
            Error::ParseError { .. } => ErrorCategory::Parse,
            Error::InvalidDimension { .. } | Error::InvalidVectorSize(_) => {
                ErrorCategory::Dimension
            }
            Error::NotNormalized | Error::NoDensities => ErrorCategory::State,
            Error::InvalidTypeId { .. } => ErrorCategory::Persistence,
            Error::InvalidDensity(_) => ErrorCategory::Density,
            Error::DifferentSizes(_) | Error::NearestNeighborDifferent(_) => ErrorCategory::Index,
            Error::InvalidOperation(_) => ErrorCategory::Logic,
        }
    }
}

/// Error categories for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    State,
    Schema,
    Bounds,
    Parse,
    Dimension,
    Persistence,
    Density,
    Index,
    Logic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Io => "Io",
            ErrorCategory::State => "State",
            ErrorCategory::Schema => "Schema",
            ErrorCategory::Bounds => "Bounds",
            ErrorCategory::Parse => "Parse",
            ErrorCategory::Dimension => "Dimension",
            ErrorCategory::Persistence => "Persistence",
            ErrorCategory::Density => "Density",
            ErrorCategory::Index => "Index",
            ErrorCategory::Logic => "Logic",
        };
        write!(f, "{}", name)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidOperation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_creation() {
        let err = Error::out_of_range("row 7 of 5");
        assert!(matches!(err, Error::OutOfRange(_)));
        assert_eq!(err.to_string(), "out of range: row 7 of 5");
    }

    #[test]
    fn error_categories() {
        assert_eq!(Error::state_missing("no data source").category(), ErrorCategory::State);
        assert_eq!(
            Error::parse_error(2, "abc").category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            Error::invalid_dimension(4, 3).category(),
            ErrorCategory::Dimension
        );
    }

    #[test]
    fn error_recoverability() {
        assert!(!Error::NotNormalized.is_recoverable());
        assert!(!Error::invalid_operation("bad call").is_recoverable());
        assert!(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_recoverable());
    }
}
