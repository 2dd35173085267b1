//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid backend: {0}")]
    InvalidBackend(String),

    #[error("invalid merge strategy: {0}")]
    InvalidStrategy(String),

    #[error("incompatible merge input: {0}")]
    IncompatibleShape(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
