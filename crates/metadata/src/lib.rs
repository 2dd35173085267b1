//! Metadata stores for filehub.
//!
//! Two independent backends hold file metadata:
//! - [`RelationalStore`]: a `files` table with a `file_tags` join table
//! - [`DocumentStore`]: self-describing JSON documents in a collection
//!
//! Both implement [`MetadataStore`] and speak [`FileRecord`] at the
//! boundary, whatever their native layout.
//!
//! [`FileRecord`]: filehub_core::FileRecord

pub mod document;
pub mod error;
pub mod models;
pub mod relational;
pub mod repos;
pub mod store;

pub use document::DocumentStore;
pub use error::{MetadataError, MetadataResult};
pub use relational::RelationalStore;
pub use repos::FileRepo;
pub use store::MetadataStore;

use filehub_core::config::{DocumentConfig, RelationalConfig};
use std::sync::Arc;

/// Open the relational store from configuration.
pub async fn open_relational(config: &RelationalConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = RelationalStore::new(&config.path, config.acquire_timeout_secs).await?;
    tracing::info!(path = %config.path.display(), "relational store ready");
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}

/// Open the document store from configuration.
pub async fn open_document(config: &DocumentConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = DocumentStore::new(
        &config.path,
        config.collection.clone(),
        config.acquire_timeout_secs,
    )
    .await?;
    tracing::info!(
        path = %config.path.display(),
        collection = %config.collection,
        "document store ready"
    );
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
