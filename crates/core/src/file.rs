//! File records and their identity.
//!
//! A record is identified by the pair `(id, backend)`: ids are only unique
//! within the backend that issued them, so two records in different backends
//! may share the same numeric id.

use crate::{DEFAULT_CATEGORY, Error, MERGEABLE_EXTENSION, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// The metadata store a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Single-table relational store.
    Relational,
    /// JSON document collection.
    Document,
}

impl Backend {
    /// Both backends, in canonical order.
    pub const ALL: [Backend; 2] = [Backend::Relational, Backend::Document];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relational" | "sql" => Ok(Self::Relational),
            "document" | "doc" => Ok(Self::Document),
            _ => Err(Error::InvalidBackend(s.to_string())),
        }
    }
}

/// Backend-issued record identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(i64);

impl FileId {
    /// Wrap a raw id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| Error::InvalidFileId(format!("{s:?}: {e}")))
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Globally unique address of a record: its id plus its origin backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub id: FileId,
    pub backend: Backend,
}

impl FileKey {
    pub fn new(id: impl Into<FileId>, backend: Backend) -> Self {
        Self {
            id: id.into(),
            backend,
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend, self.id)
    }
}

/// Canonical file metadata, identical in shape whichever backend holds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub backend: Backend,
    /// User-facing name; the only field rename touches.
    pub original_name: String,
    /// Blob key relative to the blob root. Never changes once set.
    pub stored_path: String,
    /// Lower-cased extension without the leading dot, or empty.
    pub extension: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FileRecord {
    /// The `(id, backend)` address of this record.
    pub fn key(&self) -> FileKey {
        FileKey::new(self.id, self.backend)
    }

    /// Whether this record may take part in a JSON merge.
    pub fn is_mergeable(&self) -> bool {
        self.extension == MERGEABLE_EXTENSION
    }
}

/// A fully-formed record that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFile {
    pub original_name: String,
    pub stored_path: String,
    pub extension: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub size_bytes: u64,
    pub created_at: OffsetDateTime,
}

impl NewFile {
    /// Validate the user-supplied parts and derive the rest.
    ///
    /// The extension is derived from `original_name`, an empty category falls
    /// back to [`DEFAULT_CATEGORY`] and `created_at` is stamped now.
    pub fn new<I, S>(
        original_name: &str,
        stored_path: impl Into<String>,
        category: Option<&str>,
        tags: I,
        size_bytes: u64,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let original_name = validate_file_name(original_name)?.to_string();
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();

        Ok(Self {
            extension: derive_extension(&original_name),
            original_name,
            stored_path: stored_path.into(),
            category,
            tags: normalize_tags(tags),
            size_bytes,
            created_at: now_millis(),
        })
    }

    /// Attach the backend-issued id.
    pub fn into_record(self, id: FileId, backend: Backend) -> FileRecord {
        FileRecord {
            id,
            backend,
            original_name: self.original_name,
            stored_path: self.stored_path,
            extension: self.extension,
            category: self.category,
            tags: self.tags,
            size_bytes: self.size_bytes,
            created_at: self.created_at,
        }
    }
}

/// Check a user-facing file name and return it trimmed.
///
/// Names must be non-empty and must not contain path separators, NUL, or be a
/// relative path component, so they can never address anything outside the
/// blob root.
pub fn validate_file_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidFileName("name must not be empty".to_string()));
    }
    if trimmed.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidFileName(format!(
            "name must not contain path separators: {name:?}"
        )));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(Error::InvalidFileName(format!(
            "name must not be a path component: {name:?}"
        )));
    }
    Ok(trimmed)
}

/// Lower-cased extension of `name` without the leading dot.
pub fn derive_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// File name without its extension.
pub fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Trim tags, drop empty ones and de-duplicate.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Generate a fresh blob key under `prefix`.
pub fn new_blob_key(prefix: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{prefix}/{}", Uuid::new_v4())
    } else {
        format!("{prefix}/{}.{extension}", Uuid::new_v4())
    }
}

/// Current UTC time truncated to milliseconds.
///
/// Both backends persist millisecond precision, so stamping at that precision
/// keeps a record identical before and after a round trip.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}
