//! Blob storage for filehub.
//!
//! Physical file content lives here, addressed by a key relative to one
//! fixed root. The store knows nothing about metadata.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::BlobStore;

use filehub_core::config::StorageConfig;
use std::sync::Arc;

/// Create a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            tracing::info!(root = %backend.root().display(), "blob root ready");
            Arc::new(backend)
        }
    };
    tracing::info!(backend = store.backend_name(), "blob store initialized");
    Ok(store)
}
