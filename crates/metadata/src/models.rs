//! Native record shapes of the two metadata backends.
//!
//! Each backend keeps its own layout; everything leaving this crate is
//! converted into a [`FileRecord`].

use crate::error::{MetadataError, MetadataResult};
use filehub_core::{Backend, FileId, FileRecord, NewFile};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use time::OffsetDateTime;

// =============================================================================
// Relational backend
// =============================================================================

/// A row of the `files` table joined with its tags.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub id: i64,
    pub original_name: String,
    pub stored_path: String,
    pub extension: String,
    pub category: String,
    /// JSON array aggregated from `file_tags`.
    pub tags: String,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
}

impl FileRow {
    pub fn into_record(self) -> MetadataResult<FileRecord> {
        let tags: BTreeSet<String> = serde_json::from_str(&self.tags).map_err(|e| {
            MetadataError::Corrupt(format!("tags of relational file {}: {e}", self.id))
        })?;
        Ok(FileRecord {
            id: FileId::new(self.id),
            backend: Backend::Relational,
            original_name: self.original_name,
            stored_path: self.stored_path,
            extension: self.extension,
            category: self.category,
            tags,
            size_bytes: size_from_db(self.size_bytes, Backend::Relational, self.id)?,
            created_at: self.created_at,
        })
    }
}

// =============================================================================
// Document backend
// =============================================================================

/// A file document as stored in the document collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub path: String,
    pub ext: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub size: i64,
    #[serde(rename = "uploadedAt", with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

impl FileDocument {
    /// Build the document for a not-yet-stored file under the issued `_id`.
    pub fn from_new(id: i64, file: &NewFile) -> MetadataResult<Self> {
        let size = i64::try_from(file.size_bytes).map_err(|_| {
            MetadataError::Internal(format!("file size {} out of range", file.size_bytes))
        })?;
        Ok(Self {
            id,
            name: file.original_name.clone(),
            path: file.stored_path.clone(),
            ext: file.extension.clone(),
            category: file.category.clone(),
            tags: file.tags.iter().cloned().collect(),
            size,
            uploaded_at: file.created_at,
        })
    }

    /// Decode a stored document body.
    pub fn parse(body: &str) -> MetadataResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| MetadataError::Corrupt(format!("file document: {e}")))
    }

    pub fn into_record(self) -> MetadataResult<FileRecord> {
        Ok(FileRecord {
            id: FileId::new(self.id),
            backend: Backend::Document,
            original_name: self.name,
            stored_path: self.path,
            extension: self.ext,
            category: self.category,
            tags: self.tags.into_iter().collect(),
            size_bytes: size_from_db(self.size, Backend::Document, self.id)?,
            created_at: self.uploaded_at,
        })
    }
}

/// A `(key, count)` row of a GROUP BY query.
#[derive(Debug, Clone, FromRow)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

pub(crate) fn size_from_db(size: i64, backend: Backend, id: i64) -> MetadataResult<u64> {
    u64::try_from(size)
        .map_err(|_| MetadataError::Corrupt(format!("{backend} file {id} has negative size {size}")))
}

pub(crate) fn size_to_db(size: u64) -> MetadataResult<i64> {
    i64::try_from(size)
        .map_err(|_| MetadataError::Internal(format!("file size {size} out of range")))
}
