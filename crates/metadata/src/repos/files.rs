//! File record repository.

use crate::error::MetadataResult;
use async_trait::async_trait;
use filehub_core::{BackendStats, FileFilter, FileId, FileRecord, NewFile};

/// Repository for file metadata in one backend.
///
/// Ids are issued by the backend and only unique within it.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Store a new file record and return it with its issued id.
    ///
    /// Fails with `AlreadyExists` when another record already points at the
    /// same blob key.
    async fn insert_file(&self, file: &NewFile) -> MetadataResult<FileRecord>;

    /// Get a file record by id.
    async fn get_file(&self, id: FileId) -> MetadataResult<Option<FileRecord>>;

    /// Find the record whose blob key is exactly `stored_path`.
    async fn find_by_stored_path(&self, stored_path: &str) -> MetadataResult<Option<FileRecord>>;

    /// List records matching `filter`, newest id first.
    async fn list_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRecord>>;

    /// Change a record's `original_name` and return the updated record.
    async fn rename_file(&self, id: FileId, new_name: &str) -> MetadataResult<FileRecord>;

    /// Remove a record and return what it held.
    async fn delete_file(&self, id: FileId) -> MetadataResult<FileRecord>;

    /// Count records in total, per category and per extension.
    async fn file_stats(&self) -> MetadataResult<BackendStats>;
}
