//! Common test utilities for metadata stores.

use filehub_core::{Backend, NewFile};
use filehub_metadata::{DocumentStore, MetadataResult, MetadataStore, RelationalStore};
use std::future::Future;
use std::sync::Arc;
use tempfile::TempDir;

/// A metadata store on a temporary database, removed on drop.
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    _temp_dir: TempDir,
}

impl TestMetadata {
    /// Open a fresh store of the given backend.
    pub async fn new(backend: Backend) -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store: Arc<dyn MetadataStore> = match backend {
            Backend::Relational => {
                Arc::new(RelationalStore::new(temp_dir.path().join("relational.db"), None).await?)
            }
            Backend::Document => Arc::new(
                DocumentStore::new(temp_dir.path().join("documents.db"), "files", None).await?,
            ),
        };
        Ok(Self {
            store,
            _temp_dir: temp_dir,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }
}

/// Run a test against both backends.
pub async fn run_metadata_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn MetadataStore>) -> Fut,
    Fut: Future<Output = ()>,
{
    for backend in Backend::ALL {
        let metadata = TestMetadata::new(backend)
            .await
            .unwrap_or_else(|e| panic!("Failed to open {backend} store: {e}"));
        test_fn(metadata.store()).await;
    }
}

/// A new file with a unique blob key.
#[allow(dead_code)]
pub fn new_file(name: &str, category: Option<&str>, tags: &[&str]) -> NewFile {
    let key = filehub_core::file::new_blob_key("uploads", &filehub_core::file::derive_extension(name));
    NewFile::new(name, key, category, tags.iter().copied(), 10).expect("valid file")
}
