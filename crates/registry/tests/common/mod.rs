//! Common test utilities for the registry.

pub mod doubles;

#[allow(unused_imports)]
pub use doubles::*;

use bytes::Bytes;
use filehub_core::config::AppConfig;
use filehub_core::file::{derive_extension, new_blob_key};
use filehub_core::{Backend, FileRecord, NewFile};
use filehub_metadata::MetadataStore;
use filehub_registry::{FileService, Registry, Upload};
use filehub_storage::BlobStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;

/// Stores handed to [`TestRegistry::with_stores`] for wrapping.
pub struct Stores {
    pub relational: Arc<dyn MetadataStore>,
    pub document: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
}

/// A file service on temporary storage, removed on drop.
pub struct TestRegistry {
    pub service: FileService,
    pub config: AppConfig,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestRegistry {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = AppConfig::for_testing(temp_dir.path());
        configure(&mut config);
        let service = FileService::open(&config)
            .await
            .expect("Failed to open file service");
        Self {
            service,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Open the real stores, then let `wrap` replace or decorate them.
    pub async fn with_stores(
        configure: impl FnOnce(&mut AppConfig),
        wrap: impl FnOnce(Stores) -> Stores,
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = AppConfig::for_testing(temp_dir.path());
        configure(&mut config);

        let stores = Stores {
            relational: filehub_metadata::open_relational(&config.relational)
                .await
                .expect("Failed to open relational store"),
            document: filehub_metadata::open_document(&config.document)
                .await
                .expect("Failed to open document store"),
            blobs: filehub_storage::from_config(&config.storage)
                .await
                .expect("Failed to open blob store"),
        };
        let stores = wrap(stores);
        let registry = Registry::new(stores.relational, stores.document, stores.blobs)
            .expect("Failed to assemble registry");

        Self {
            service: FileService::new(Arc::new(registry), &config),
            config,
            _temp_dir: temp_dir,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.service.registry()
    }

    pub fn blob_root(&self) -> PathBuf {
        match &self.config.storage {
            filehub_core::config::StorageConfig::Filesystem { path } => path.clone(),
        }
    }

    /// Number of blobs under `prefix` in the blob root.
    pub fn blob_count(&self, prefix: &str) -> usize {
        count_files(&self.blob_root().join(prefix))
    }

    /// Upload `content` as `name` through the service.
    pub async fn add_file(&self, backend: Backend, name: &str, content: &str) -> FileRecord {
        self.add_tagged_file(backend, name, &[], content).await
    }

    pub async fn add_tagged_file(
        &self,
        backend: Backend,
        name: &str,
        tags: &[&str],
        content: &str,
    ) -> FileRecord {
        self.service
            .upload(
                backend,
                Upload {
                    name: name.to_string(),
                    category: None,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    data: Bytes::from(content.to_string()),
                },
            )
            .await
            .expect("upload failed")
    }

    /// Register a file with an explicit creation time.
    pub async fn add_file_at(
        &self,
        backend: Backend,
        name: &str,
        category: &str,
        tags: &[&str],
        created_at: OffsetDateTime,
    ) -> FileRecord {
        let stored_path = new_blob_key("uploads", &derive_extension(name));
        self.registry()
            .blobs()
            .put(&stored_path, Bytes::from_static(b"{}"))
            .await
            .expect("blob write failed");
        let mut file = NewFile::new(name, stored_path, Some(category), tags.iter().copied(), 2)
            .expect("valid file");
        file.created_at = created_at;
        self.registry()
            .register(file, backend)
            .await
            .expect("register failed")
    }

    /// Read a blob straight from disk.
    pub fn read_blob(&self, stored_path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.blob_root().join(stored_path)).ok()
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}
