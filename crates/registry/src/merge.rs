//! Merge engine: combine two JSON files into a new derived file.

use crate::error::{RegistryError, RegistryResult};
use crate::registry::Registry;
use bytes::Bytes;
use filehub_core::config::MergeConfig;
use filehub_core::file::{file_stem, new_blob_key};
use filehub_core::{FileKey, FileRecord, MERGEABLE_EXTENSION, MergeStrategy, NewFile};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Blob key prefix merged files are written under.
pub const MERGED_PREFIX: &str = "merged";

/// Merges two `.json` records into a new record in the derived backend.
///
/// Source records and their blobs are only ever read.
pub struct MergeEngine {
    registry: Arc<Registry>,
    config: MergeConfig,
}

impl MergeEngine {
    pub fn new(registry: Arc<Registry>, config: MergeConfig) -> Self {
        Self { registry, config }
    }

    /// Merge `first` and `second` with `strategy` and register the result.
    #[instrument(skip(self), fields(derived_backend = %self.config.derived_backend))]
    pub async fn merge(
        &self,
        first: FileKey,
        second: FileKey,
        strategy: MergeStrategy,
    ) -> RegistryResult<FileRecord> {
        let (first, second) = tokio::try_join!(self.registry.get(first), self.registry.get(second))?;
        for record in [&first, &second] {
            if !record.is_mergeable() {
                return Err(RegistryError::InvalidInput(format!(
                    "{} ({}) is not a .{MERGEABLE_EXTENSION} file",
                    record.key(),
                    record.original_name
                )));
            }
        }

        let (first_data, second_data) = tokio::try_join!(
            self.registry.read_blob(&first),
            self.registry.read_blob(&second)
        )?;
        let first_value = parse_json(&first, &first_data)?;
        let second_value = parse_json(&second, &second_data)?;

        let merged = strategy.apply(first_value, second_value)?;
        let body = serde_json::to_vec_pretty(&merged).map_err(|e| {
            RegistryError::InvalidFormat(format!("merged document could not be encoded: {e}"))
        })?;

        let name = merged_name(&first, &second);
        let stored_path = new_blob_key(MERGED_PREFIX, MERGEABLE_EXTENSION);
        let tags = first.tags.union(&second.tags);
        let file = NewFile::new(
            &name,
            stored_path.clone(),
            Some(&self.config.derived_category),
            tags,
            body.len() as u64,
        )?;

        let blobs = self.registry.blobs();
        blobs
            .put(&stored_path, Bytes::from(body))
            .await
            .map_err(|e| RegistryError::blob(&stored_path, e))?;

        match self.registry.register(file, self.config.derived_backend).await {
            Ok(record) => {
                tracing::info!(
                    first = %first.key(),
                    second = %second.key(),
                    strategy = %strategy,
                    merged = %record.key(),
                    "merged files"
                );
                Ok(record)
            }
            Err(err) => {
                if let Err(cleanup) = blobs.delete(&stored_path).await {
                    tracing::warn!(
                        stored_path = %stored_path,
                        error = %cleanup,
                        "failed to remove merged blob after registration failed"
                    );
                }
                Err(err)
            }
        }
    }
}

fn parse_json(record: &FileRecord, data: &[u8]) -> RegistryResult<Value> {
    serde_json::from_slice(data).map_err(|e| {
        RegistryError::InvalidFormat(format!(
            "{} ({}) is not valid JSON: {e}",
            record.key(),
            record.original_name
        ))
    })
}

/// `merged_<stem of first>_<stem of second>.json`.
fn merged_name(first: &FileRecord, second: &FileRecord) -> String {
    format!(
        "merged_{}_{}.{MERGEABLE_EXTENSION}",
        file_stem(&first.original_name),
        file_stem(&second.original_name)
    )
}
