//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Blob store addressed by keys relative to one fixed root.
///
/// Implementations must reject any key that resolves outside their root with
/// [`StorageError::InvalidKey`](crate::StorageError::InvalidKey).
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Read a blob's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Write a blob atomically, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete a blob. Deleting a missing blob is not an error.
    ///
    /// Returns whether a blob was actually removed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// The one spelling of `key` this store addresses it by.
    ///
    /// Keys that name the same blob (`a/./b`, `a/x/../b`, `a\b`) map to the
    /// same canonical key. Keys that leave the root are rejected.
    fn canonical_key(&self, key: &str) -> StorageResult<String>;

    /// Get the backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the store is reachable and usable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
