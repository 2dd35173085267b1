//! Registry error taxonomy.

use filehub_core::Backend;
use filehub_metadata::MetadataError;
use filehub_storage::StorageError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The kinds of failure callers can tell apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidFormat,
    BackendUnavailable,
    BlobIo,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::InvalidFormat => "invalid_format",
            Self::BackendUnavailable => "backend_unavailable",
            Self::BlobIo => "blob_io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry operation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Blob content could not be parsed where JSON was required.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("{backend} store unavailable: {source}")]
    BackendUnavailable {
        backend: Backend,
        #[source]
        source: MetadataError,
    },

    #[error("blob i/o failed for {key}: {source}")]
    BlobIo {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Self::BlobIo { .. } => ErrorKind::BlobIo,
        }
    }

    /// Classify an error raised by the store of `backend`.
    pub fn metadata(backend: Backend, err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(what) => Self::NotFound(what),
            MetadataError::AlreadyExists(what) => {
                Self::InvalidInput(format!("{what} is already registered"))
            }
            source => Self::BackendUnavailable { backend, source },
        }
    }

    /// Classify an error raised by the blob store while handling `key`.
    pub fn blob(key: impl Into<String>, err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(reason) => {
                Self::InvalidInput(format!("unsafe blob path: {reason}"))
            }
            source => Self::BlobIo {
                key: key.into(),
                source,
            },
        }
    }
}

impl From<filehub_core::Error> for RegistryError {
    fn from(err: filehub_core::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
