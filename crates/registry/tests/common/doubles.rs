//! Store doubles that inject failures.

use async_trait::async_trait;
use bytes::Bytes;
use filehub_core::{Backend, BackendStats, FileFilter, FileId, FileRecord, NewFile};
use filehub_metadata::{FileRepo, MetadataError, MetadataResult, MetadataStore};
use filehub_storage::{BlobStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::Arc;

fn injected() -> MetadataError {
    MetadataError::Internal("injected failure".to_string())
}

/// A metadata store whose every call fails as if the database were down.
pub struct FailingStore {
    backend: Backend,
}

impl FailingStore {
    #[allow(dead_code)]
    pub fn new(backend: Backend) -> Arc<Self> {
        Arc::new(Self { backend })
    }
}

#[async_trait]
impl FileRepo for FailingStore {
    async fn insert_file(&self, _file: &NewFile) -> MetadataResult<FileRecord> {
        Err(injected())
    }

    async fn get_file(&self, _id: FileId) -> MetadataResult<Option<FileRecord>> {
        Err(injected())
    }

    async fn find_by_stored_path(&self, _stored_path: &str) -> MetadataResult<Option<FileRecord>> {
        Err(injected())
    }

    async fn list_files(&self, _filter: &FileFilter) -> MetadataResult<Vec<FileRecord>> {
        Err(injected())
    }

    async fn rename_file(&self, _id: FileId, _new_name: &str) -> MetadataResult<FileRecord> {
        Err(injected())
    }

    async fn delete_file(&self, _id: FileId) -> MetadataResult<FileRecord> {
        Err(injected())
    }

    async fn file_stats(&self) -> MetadataResult<BackendStats> {
        Err(injected())
    }
}

#[async_trait]
impl MetadataStore for FailingStore {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn migrate(&self) -> MetadataResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        Err(injected())
    }

    async fn close(&self) {}
}

/// Wraps a real store and fails deletes of selected ids.
pub struct FlakyDeletes {
    inner: Arc<dyn MetadataStore>,
    failing: HashSet<FileId>,
}

impl FlakyDeletes {
    #[allow(dead_code)]
    pub fn new(inner: Arc<dyn MetadataStore>, failing: impl IntoIterator<Item = i64>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: failing.into_iter().map(FileId::new).collect(),
        })
    }
}

#[async_trait]
impl FileRepo for FlakyDeletes {
    async fn insert_file(&self, file: &NewFile) -> MetadataResult<FileRecord> {
        self.inner.insert_file(file).await
    }

    async fn get_file(&self, id: FileId) -> MetadataResult<Option<FileRecord>> {
        self.inner.get_file(id).await
    }

    async fn find_by_stored_path(&self, stored_path: &str) -> MetadataResult<Option<FileRecord>> {
        self.inner.find_by_stored_path(stored_path).await
    }

    async fn list_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRecord>> {
        self.inner.list_files(filter).await
    }

    async fn rename_file(&self, id: FileId, new_name: &str) -> MetadataResult<FileRecord> {
        self.inner.rename_file(id, new_name).await
    }

    async fn delete_file(&self, id: FileId) -> MetadataResult<FileRecord> {
        if self.failing.contains(&id) {
            return Err(injected());
        }
        self.inner.delete_file(id).await
    }

    async fn file_stats(&self) -> MetadataResult<BackendStats> {
        self.inner.file_stats().await
    }
}

#[async_trait]
impl MetadataStore for FlakyDeletes {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

/// Wraps a real blob store whose deletes always fail.
pub struct UndeletableBlobs {
    inner: Arc<dyn BlobStore>,
}

impl UndeletableBlobs {
    #[allow(dead_code)]
    pub fn new(inner: Arc<dyn BlobStore>) -> Arc<Self> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl BlobStore for UndeletableBlobs {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Err(StorageError::Io(std::io::Error::other("injected delete failure")))
    }

    fn canonical_key(&self, key: &str) -> StorageResult<String> {
        self.inner.canonical_key(key)
    }

    fn backend_name(&self) -> &'static str {
        "undeletable"
    }
}
