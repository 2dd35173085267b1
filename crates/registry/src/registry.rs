//! Unified registry over both metadata stores and the blob store.

use crate::error::{RegistryError, RegistryResult};
use bytes::Bytes;
use filehub_core::file::{derive_extension, normalize_tags, validate_file_name};
use filehub_core::{AggregateStats, Backend, FileFilter, FileKey, FileRecord, NewFile};
use filehub_metadata::MetadataStore;
use filehub_storage::BlobStore;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

/// One view over the relational store, the document store and the blobs.
///
/// Every operation on a single record is routed by the record's backend tag.
pub struct Registry {
    relational: Arc<dyn MetadataStore>,
    document: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl Registry {
    /// Assemble a registry from already-opened stores.
    ///
    /// Fails if a store reports a different backend than the slot it is
    /// passed in.
    pub fn new(
        relational: Arc<dyn MetadataStore>,
        document: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> RegistryResult<Self> {
        for (expected, store) in [
            (Backend::Relational, &relational),
            (Backend::Document, &document),
        ] {
            if store.backend() != expected {
                return Err(RegistryError::InvalidInput(format!(
                    "{} store passed where the {expected} store belongs",
                    store.backend()
                )));
            }
        }
        Ok(Self {
            relational,
            document,
            blobs,
        })
    }

    /// The metadata store holding records of `backend`.
    pub fn store(&self, backend: Backend) -> &Arc<dyn MetadataStore> {
        match backend {
            Backend::Relational => &self.relational,
            Backend::Document => &self.document,
        }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Search both stores and return one newest-first sequence.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &FileFilter) -> RegistryResult<Vec<FileRecord>> {
        let (mut records, document) = tokio::try_join!(
            self.list_in(Backend::Relational, filter),
            self.list_in(Backend::Document, filter),
        )?;
        records.extend(document);
        records.sort_by(newest_first);
        Ok(records)
    }

    async fn list_in(&self, backend: Backend, filter: &FileFilter) -> RegistryResult<Vec<FileRecord>> {
        self.store(backend)
            .list_files(filter)
            .await
            .map_err(|e| RegistryError::metadata(backend, e))
    }

    pub async fn get(&self, key: FileKey) -> RegistryResult<FileRecord> {
        self.store(key.backend)
            .get_file(key.id)
            .await
            .map_err(|e| RegistryError::metadata(key.backend, e))?
            .ok_or_else(|| RegistryError::NotFound(format!("{} file {}", key.backend, key.id)))
    }

    /// Change a record's user-facing name. The blob and extension stay put.
    #[instrument(skip(self))]
    pub async fn rename(&self, key: FileKey, new_name: &str) -> RegistryResult<FileRecord> {
        let new_name = validate_file_name(new_name)?;
        self.store(key.backend)
            .rename_file(key.id, new_name)
            .await
            .map_err(|e| RegistryError::metadata(key.backend, e))
    }

    /// Delete a record, then its blob.
    ///
    /// The metadata delete decides the outcome. A blob that cannot be removed
    /// afterwards is logged and left behind.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: FileKey) -> RegistryResult<()> {
        let record = self
            .store(key.backend)
            .delete_file(key.id)
            .await
            .map_err(|e| RegistryError::metadata(key.backend, e))?;

        match self.blobs.delete(&record.stored_path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    id = %key.id,
                    backend = %key.backend,
                    stored_path = %record.stored_path,
                    "blob already absent"
                );
            }
            Err(error) => {
                tracing::warn!(
                    id = %key.id,
                    backend = %key.backend,
                    stored_path = %record.stored_path,
                    error = %error,
                    "record deleted but its blob could not be removed"
                );
            }
        }
        Ok(())
    }

    /// Count records per backend and combined.
    #[instrument(skip(self))]
    pub async fn aggregate_stats(&self) -> RegistryResult<AggregateStats> {
        let (relational, document) = tokio::try_join!(
            async {
                self.relational
                    .file_stats()
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Relational, e))
            },
            async {
                self.document
                    .file_stats()
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Document, e))
            },
        )?;
        Ok(AggregateStats::from_parts(relational, document))
    }

    /// Record a file whose blob has already been written at `stored_path`.
    ///
    /// The name is re-validated and the extension and tags re-derived, so a
    /// hand-built [`NewFile`] cannot smuggle in inconsistent fields. The blob
    /// key is stored in the blob store's canonical form, and a blob may back
    /// at most one record across both backends.
    #[instrument(skip(self, file), fields(name = %file.original_name, stored_path = %file.stored_path))]
    pub async fn register(&self, file: NewFile, backend: Backend) -> RegistryResult<FileRecord> {
        let original_name = validate_file_name(&file.original_name)?.to_string();
        let stored_path = self
            .blobs
            .canonical_key(&file.stored_path)
            .map_err(|e| RegistryError::blob(&file.stored_path, e))?;
        let file = NewFile {
            extension: derive_extension(&original_name),
            tags: normalize_tags(&file.tags),
            original_name,
            stored_path,
            ..file
        };

        let present = self
            .blobs
            .exists(&file.stored_path)
            .await
            .map_err(|e| RegistryError::blob(&file.stored_path, e))?;
        if !present {
            return Err(RegistryError::InvalidInput(format!(
                "no blob stored at {}",
                file.stored_path
            )));
        }

        if let Some(owner) = self.find_by_stored_path(&file.stored_path).await? {
            return Err(RegistryError::InvalidInput(format!(
                "blob {} is already registered as {}",
                file.stored_path,
                owner.key()
            )));
        }

        let record = self
            .store(backend)
            .insert_file(&file)
            .await
            .map_err(|e| RegistryError::metadata(backend, e))?;
        tracing::info!(key = %record.key(), "registered file");
        Ok(record)
    }

    /// The record in either backend whose blob key is `stored_path`.
    async fn find_by_stored_path(&self, stored_path: &str) -> RegistryResult<Option<FileRecord>> {
        let (relational, document) = tokio::try_join!(
            self.find_in(Backend::Relational, stored_path),
            self.find_in(Backend::Document, stored_path),
        )?;
        Ok(relational.or(document))
    }

    async fn find_in(&self, backend: Backend, stored_path: &str) -> RegistryResult<Option<FileRecord>> {
        self.store(backend)
            .find_by_stored_path(stored_path)
            .await
            .map_err(|e| RegistryError::metadata(backend, e))
    }

    /// Fetch a record together with its content.
    pub async fn read_content(&self, key: FileKey) -> RegistryResult<(FileRecord, Bytes)> {
        let record = self.get(key).await?;
        let data = self.read_blob(&record).await?;
        Ok((record, data))
    }

    pub(crate) async fn read_blob(&self, record: &FileRecord) -> RegistryResult<Bytes> {
        self.blobs
            .get(&record.stored_path)
            .await
            .map_err(|e| RegistryError::blob(&record.stored_path, e))
    }

    /// Check both stores and the blob root.
    pub async fn health_check(&self) -> RegistryResult<()> {
        tokio::try_join!(
            async {
                self.relational
                    .health_check()
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Relational, e))
            },
            async {
                self.document
                    .health_check()
                    .await
                    .map_err(|e| RegistryError::metadata(Backend::Document, e))
            },
            async {
                self.blobs
                    .health_check()
                    .await
                    .map_err(|e| RegistryError::blob("", e))
            },
        )?;
        Ok(())
    }

    /// Close both store pools.
    pub async fn close(&self) {
        tokio::join!(self.relational.close(), self.document.close());
    }
}

/// Newest `created_at` first; ties go to the relational store, then the
/// higher id.
fn newest_first(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.backend.cmp(&b.backend))
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filehub_core::FileId;
    use time::macros::datetime;

    fn record(id: i64, backend: Backend, created_at: time::OffsetDateTime) -> FileRecord {
        NewFile {
            original_name: format!("f{id}.json"),
            stored_path: format!("uploads/{backend}-{id}.json"),
            extension: "json".to_string(),
            category: "c".to_string(),
            tags: Default::default(),
            size_bytes: 1,
            created_at,
        }
        .into_record(FileId::new(id), backend)
    }

    #[test]
    fn test_newest_first_interleaves_backends() {
        let mut records = vec![
            record(1, Backend::Relational, datetime!(2024-01-01 00:00 UTC)),
            record(1, Backend::Document, datetime!(2024-01-03 00:00 UTC)),
            record(2, Backend::Relational, datetime!(2024-01-02 00:00 UTC)),
            record(2, Backend::Document, datetime!(2024-01-02 00:00 UTC)),
            record(3, Backend::Relational, datetime!(2024-01-02 00:00 UTC)),
        ];
        records.sort_by(newest_first);

        let keys: Vec<String> = records.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "document:1",
                "relational:3",
                "relational:2",
                "document:2",
                "relational:1",
            ]
        );
    }
}
