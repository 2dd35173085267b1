//! Bulk operations with per-record failure isolation.

use crate::error::{RegistryError, RegistryResult};
use crate::registry::Registry;
use filehub_core::FileKey;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of one bulk call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub succeeded: u64,
    pub failed: u64,
    /// One entry per failed record, naming its key.
    pub errors: Vec<String>,
}

impl BulkResult {
    /// Fold one record's outcome into the tally.
    fn record(mut self, key: FileKey, outcome: RegistryResult<()>) -> Self {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                tracing::warn!(key = %key, kind = %err.kind(), error = %err, "bulk delete entry failed");
                self.failed += 1;
                self.errors.push(format!("{key}: {err}"));
            }
        }
        self
    }
}

/// Runs a registry operation over many records.
///
/// Every record is attempted; one failure never stops the others.
pub struct BulkEngine {
    registry: Arc<Registry>,
    concurrency: usize,
}

impl BulkEngine {
    /// `concurrency` bounds the deletes in flight at once (minimum 1).
    pub fn new(registry: Arc<Registry>, concurrency: usize) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// Delete every record in `keys`.
    ///
    /// An empty request is rejected. Repeated keys are attempted once.
    #[instrument(skip(self, keys), fields(requested = keys.len()))]
    pub async fn bulk_delete(&self, keys: &[FileKey]) -> RegistryResult<BulkResult> {
        if keys.is_empty() {
            return Err(RegistryError::InvalidInput(
                "bulk delete requires at least one record".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<FileKey> = keys.iter().copied().filter(|key| seen.insert(*key)).collect();

        // `buffered` keeps input order, so `errors` lists failures in request order.
        let result = futures::stream::iter(unique)
            .map(|key| {
                let registry = self.registry.clone();
                async move { (key, registry.delete(key).await) }
            })
            .buffered(self.concurrency)
            .fold(BulkResult::default(), |acc, (key, outcome)| async move {
                acc.record(key, outcome)
            })
            .await;

        tracing::info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "bulk delete finished"
        );
        Ok(result)
    }
}
