//! The operations offered to the HTTP layer.

use crate::bulk::{BulkEngine, BulkResult};
use crate::error::{RegistryError, RegistryResult};
use crate::merge::MergeEngine;
use crate::registry::Registry;
use bytes::Bytes;
use filehub_core::config::AppConfig;
use filehub_core::file::{derive_extension, new_blob_key, validate_file_name};
use filehub_core::{
    AggregateStats, Backend, FileFilter, FileKey, FileRecord, MergeStrategy, NewFile,
};
use std::sync::Arc;

/// Blob key prefix uploaded files are written under.
pub const UPLOAD_PREFIX: &str = "uploads";

/// A file arriving from the upload collaborator.
#[derive(Clone, Debug)]
pub struct Upload {
    pub name: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub data: Bytes,
}

/// Registry plus engines, wired from one configuration.
pub struct FileService {
    registry: Arc<Registry>,
    merge: MergeEngine,
    bulk: BulkEngine,
}

impl FileService {
    pub fn new(registry: Arc<Registry>, config: &AppConfig) -> Self {
        Self {
            merge: MergeEngine::new(registry.clone(), config.merge.clone()),
            bulk: BulkEngine::new(registry.clone(), config.bulk.concurrency),
            registry,
        }
    }

    /// Open the blob store and both metadata stores described by `config`.
    pub async fn open(config: &AppConfig) -> RegistryResult<Self> {
        config.validate().map_err(RegistryError::InvalidInput)?;

        let blobs = filehub_storage::from_config(&config.storage)
            .await
            .map_err(|e| RegistryError::blob("", e))?;
        let (relational, document) = tokio::try_join!(
            async {
                filehub_metadata::open_relational(&config.relational)
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Relational, e))
            },
            async {
                filehub_metadata::open_document(&config.document)
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Document, e))
            },
        )?;

        let registry = Registry::new(relational, document, blobs)?;
        Ok(Self::new(Arc::new(registry), config))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn search_files(&self, filter: &FileFilter) -> RegistryResult<Vec<FileRecord>> {
        self.registry.list(filter).await
    }

    pub async fn get_stats(&self) -> RegistryResult<AggregateStats> {
        self.registry.aggregate_stats().await
    }

    pub async fn get_file(&self, key: FileKey) -> RegistryResult<FileRecord> {
        self.registry.get(key).await
    }

    pub async fn read_content(&self, key: FileKey) -> RegistryResult<(FileRecord, Bytes)> {
        self.registry.read_content(key).await
    }

    pub async fn delete_file(&self, key: FileKey) -> RegistryResult<()> {
        self.registry.delete(key).await
    }

    pub async fn rename_file(&self, key: FileKey, new_name: &str) -> RegistryResult<FileRecord> {
        self.registry.rename(key, new_name).await
    }

    pub async fn bulk_delete(&self, keys: &[FileKey]) -> RegistryResult<BulkResult> {
        self.bulk.bulk_delete(keys).await
    }

    pub async fn merge_files(
        &self,
        first: FileKey,
        second: FileKey,
        strategy: MergeStrategy,
    ) -> RegistryResult<FileRecord> {
        self.merge.merge(first, second, strategy).await
    }

    /// Store an uploaded file's bytes and register it in `backend`.
    ///
    /// The blob is removed again if the record cannot be created.
    pub async fn upload(&self, backend: Backend, upload: Upload) -> RegistryResult<FileRecord> {
        let name = validate_file_name(&upload.name)?;
        let stored_path = new_blob_key(UPLOAD_PREFIX, &derive_extension(name));
        let file = NewFile::new(
            name,
            stored_path.clone(),
            upload.category.as_deref(),
            &upload.tags,
            upload.data.len() as u64,
        )?;

        let blobs = self.registry.blobs();
        blobs
            .put(&stored_path, upload.data)
            .await
            .map_err(|e| RegistryError::blob(&stored_path, e))?;

        match self.registry.register(file, backend).await {
            Ok(record) => Ok(record),
            Err(err) => {
                if let Err(cleanup) = blobs.delete(&stored_path).await {
                    tracing::warn!(
                        stored_path = %stored_path,
                        error = %cleanup,
                        "failed to remove uploaded blob after registration failed"
                    );
                }
                Err(err)
            }
        }
    }

    pub async fn health_check(&self) -> RegistryResult<()> {
        self.registry.health_check().await
    }

    /// Release both store pools. Call once at shutdown.
    pub async fn close(&self) {
        self.registry.close().await;
        tracing::info!("file service closed");
    }
}
