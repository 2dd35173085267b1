//! Search filter shared by both metadata backends.

use crate::file::{FileRecord, normalize_tags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conjunction of optional predicates over file records.
///
/// Constructed through [`FileFilter::new`] (or the builder methods), which
/// normalizes the inputs so both backends see identical predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    /// ASCII case-insensitive substring of `original_name`.
    pub query: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact extension, lower-cased and without a leading dot.
    pub extension: Option<String>,
    /// Records must carry every one of these tags.
    pub tags: BTreeSet<String>,
}

impl FileFilter {
    /// Build a normalized filter. Blank values are treated as absent.
    pub fn new<I, S>(
        query: Option<&str>,
        category: Option<&str>,
        extension: Option<&str>,
        tags: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::default()
            .with_query(query)
            .with_category(category)
            .with_extension(extension)
            .with_tags(tags)
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = non_blank(query);
        self
    }

    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = non_blank(category);
        self
    }

    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = non_blank(extension)
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.category.is_none()
            && self.extension.is_none()
            && self.tags.is_empty()
    }

    /// Evaluate the filter in memory.
    ///
    /// This is the reference semantics the backend query translations must
    /// agree with.
    pub fn matches(&self, record: &FileRecord) -> bool {
        if let Some(query) = &self.query
            && !record
                .original_name
                .to_ascii_lowercase()
                .contains(&query.to_ascii_lowercase())
        {
            return false;
        }
        if let Some(category) = &self.category
            && &record.category != category
        {
            return false;
        }
        if let Some(extension) = &self.extension
            && &record.extension != extension
        {
            return false;
        }
        self.tags.is_subset(&record.tags)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
