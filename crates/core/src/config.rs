//! Configuration types shared across crates.

use crate::DEFAULT_CATEGORY;
use crate::file::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted upload body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Blob storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory all blob keys are relative to.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/blobs"),
        }
    }
}

/// Relational metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationalConfig {
    /// SQLite database file path.
    #[serde(default = "default_relational_path")]
    pub path: PathBuf,
    /// Seconds an operation may wait for the store connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: Option<u64>,
}

fn default_relational_path() -> PathBuf {
    PathBuf::from("./data/relational.db")
}

fn default_acquire_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            path: default_relational_path(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Document metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Database file holding the document collections.
    #[serde(default = "default_document_path")]
    pub path: PathBuf,
    /// Collection file documents are kept in.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Seconds an operation may wait for the store connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: Option<u64>,
}

fn default_document_path() -> PathBuf {
    PathBuf::from("./data/documents.db")
}

fn default_collection() -> String {
    "files".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: default_document_path(),
            collection: default_collection(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Merge policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Backend every merged record is created in. Fixed by policy, never
    /// inferred from the merge inputs.
    #[serde(default = "default_derived_backend")]
    pub derived_backend: Backend,
    /// Category assigned to merged records. Defaults to the upload default.
    #[serde(default = "default_derived_category")]
    pub derived_category: String,
}

fn default_derived_backend() -> Backend {
    Backend::Relational
}

fn default_derived_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            derived_backend: default_derived_backend(),
            derived_category: default_derived_category(),
        }
    }
}

/// Bulk operation tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Per-record operations in flight at once within one bulk call.
    #[serde(default = "default_bulk_concurrency")]
    pub concurrency: usize,
}

fn default_bulk_concurrency() -> usize {
    8
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_bulk_concurrency(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub relational: RelationalConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
}

impl AppConfig {
    /// Create a test configuration rooted at `root`.
    ///
    /// **For testing only.** Blobs and both databases live under `root`.
    pub fn for_testing(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            storage: StorageConfig::Filesystem {
                path: root.join("blobs"),
            },
            relational: RelationalConfig {
                path: root.join("relational.db"),
                acquire_timeout_secs: None,
            },
            document: DocumentConfig {
                path: root.join("documents.db"),
                collection: default_collection(),
                acquire_timeout_secs: None,
            },
            ..Default::default()
        }
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.bulk.concurrency == 0 {
            return Err("bulk.concurrency must be at least 1".to_string());
        }
        if self.document.collection.trim().is_empty() {
            return Err("document.collection must not be empty".to_string());
        }
        if self.relational.path == self.document.path {
            return Err(
                "relational.path and document.path must point at different databases".to_string(),
            );
        }
        Ok(())
    }
}
