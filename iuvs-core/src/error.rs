//! Error types for iuvs-core.

use thiserror::Error;

/// Result type alias for iuvs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for iuvs operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The version registry has no entry for a dataset key.
    #[error("version registry has no entry for '{key}'")]
    MissingVersion { key: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A product path could not be resolved.
    #[error("invalid product path: '{0}'")]
    InvalidPath(String),

    /// A group required by a write does not exist.
    #[error("group '{0}' does not exist")]
    MissingGroup(String),

    /// A dataset required as input does not exist.
    #[error("dataset '{0}' does not exist")]
    MissingDataset(String),

    /// A stored dataset does not hold the requested element type.
    #[error("dataset '{path}' holds {found} values, expected {expected}")]
    TypeMismatch {
        /// Dataset path.
        path: String,
        /// Requested element type.
        expected: &'static str,
        /// Stored element type.
        found: &'static str,
    },

    /// Array shapes do not line up.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The backing product container failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The external ephemeris provider failed.
    #[error("ephemeris error: {0}")]
    EphemerisError(String),
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}
