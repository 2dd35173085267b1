//! Aggregate statistics. Derived on demand, never persisted.

use crate::file::Backend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts for one backend, or the combined view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStats {
    pub total: u64,
    pub by_category: BTreeMap<String, u64>,
    pub by_extension: BTreeMap<String, u64>,
}

impl BackendStats {
    /// Add another set of counts into this one.
    pub fn absorb(&mut self, other: &BackendStats) {
        self.total += other.total;
        for (category, count) in &other.by_category {
            *self.by_category.entry(category.clone()).or_default() += count;
        }
        for (extension, count) in &other.by_extension {
            *self.by_extension.entry(extension.clone()).or_default() += count;
        }
    }
}

/// Per-backend and combined counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub relational: BackendStats,
    pub document: BackendStats,
    pub combined: BackendStats,
}

impl AggregateStats {
    /// Combine independently computed per-backend counts.
    pub fn from_parts(relational: BackendStats, document: BackendStats) -> Self {
        let mut combined = BackendStats::default();
        combined.absorb(&relational);
        combined.absorb(&document);
        Self {
            relational,
            document,
            combined,
        }
    }

    /// Counts for a single backend.
    pub fn for_backend(&self, backend: Backend) -> &BackendStats {
        match backend {
            Backend::Relational => &self.relational,
            Backend::Document => &self.document,
        }
    }
}
