//! Document metadata store.
//!
//! Each file is one self-describing JSON document in a named collection,
//! stored with SQLite's JSON1 functions. Documents carry their own native
//! field names (`_id`, `name`, `path`, `ext`, `size`, `uploadedAt`) and are
//! queried by path expressions into the body. `_id` values come from a
//! per-collection sequence and are never reused.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{CountRow, FileDocument};
use crate::repos::FileRepo;
use crate::store::{MetadataStore, connect, count_map, like_pattern};
use async_trait::async_trait;
use filehub_core::{Backend, BackendStats, FileFilter, FileId, FileRecord, NewFile};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::path::Path;
use tracing::instrument;

/// SQLite JSON1-backed document store.
pub struct DocumentStore {
    pool: Pool<Sqlite>,
    collection: String,
}

impl DocumentStore {
    /// Open (and migrate) the store at `path`, keeping files in `collection`.
    pub async fn new(
        path: impl AsRef<Path>,
        collection: impl Into<String>,
        acquire_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(MetadataError::Config(
                "document collection name must not be empty".to_string(),
            ));
        }
        let pool = connect(path.as_ref(), acquire_timeout_secs).await?;
        let store = Self { pool, collection };
        store.migrate().await?;
        Ok(store)
    }

    /// The collection file documents live in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn decode(body: &str) -> MetadataResult<FileRecord> {
        FileDocument::parse(body)?.into_record()
    }
}

#[async_trait]
impl MetadataStore for DocumentStore {
    fn backend(&self) -> Backend {
        Backend::Document
    }

    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        // Also proves JSON1 is compiled in.
        sqlx::query("SELECT json('{}')").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FileRepo for DocumentStore {
    #[instrument(skip(self, file), fields(backend = "document", stored_path = %file.stored_path))]
    async fn insert_file(&self, file: &NewFile) -> MetadataResult<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO counters (collection, seq) VALUES (?, 1) \
             ON CONFLICT(collection) DO UPDATE SET seq = seq + 1 RETURNING seq",
        )
        .bind(&self.collection)
        .fetch_one(&mut *tx)
        .await?;

        let doc = FileDocument::from_new(id, file)?;
        let body = serde_json::to_string(&doc)
            .map_err(|e| MetadataError::Internal(format!("failed to encode document: {e}")))?;

        sqlx::query("INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)")
            .bind(&self.collection)
            .bind(id)
            .bind(&body)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                MetadataError::from_insert(e, || {
                    format!("document file for stored path {}", file.stored_path)
                })
            })?;

        tx.commit().await?;
        tracing::debug!(id, collection = %self.collection, "inserted file document");

        doc.into_record()
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn get_file(&self, id: FileId) -> MetadataResult<Option<FileRecord>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND doc_id = ?")
                .bind(&self.collection)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;
        body.as_deref().map(Self::decode).transpose()
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn find_by_stored_path(&self, stored_path: &str) -> MetadataResult<Option<FileRecord>> {
        let body: Option<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = ? AND json_extract(body, '$.path') = ?",
        )
        .bind(&self.collection)
        .bind(stored_path)
        .fetch_optional(&self.pool)
        .await?;
        body.as_deref().map(Self::decode).transpose()
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn list_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind(self.collection.as_str());
        if let Some(query) = &filter.query {
            qb.push(" AND json_extract(body, '$.name') LIKE ")
                .push_bind(like_pattern(query))
                .push(" ESCAPE '\\'");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND json_extract(body, '$.category') = ")
                .push_bind(category.as_str());
        }
        if let Some(extension) = &filter.extension {
            qb.push(" AND json_extract(body, '$.ext') = ")
                .push_bind(extension.as_str());
        }
        for tag in &filter.tags {
            qb.push(" AND EXISTS (SELECT 1 FROM json_each(documents.body, '$.tags') WHERE json_each.value = ")
                .push_bind(tag.as_str())
                .push(")");
        }
        qb.push(" ORDER BY doc_id DESC");

        let bodies: Vec<String> = qb
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        bodies.iter().map(|body| Self::decode(body)).collect()
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn rename_file(&self, id: FileId, new_name: &str) -> MetadataResult<FileRecord> {
        let body: Option<String> = sqlx::query_scalar(
            "UPDATE documents SET body = json_set(body, '$.name', ?) \
             WHERE collection = ? AND doc_id = ? RETURNING body",
        )
        .bind(new_name)
        .bind(&self.collection)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        match body {
            Some(body) => Self::decode(&body),
            None => Err(MetadataError::NotFound(format!("document file {id}"))),
        }
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn delete_file(&self, id: FileId) -> MetadataResult<FileRecord> {
        let body: Option<String> = sqlx::query_scalar(
            "DELETE FROM documents WHERE collection = ? AND doc_id = ? RETURNING body",
        )
        .bind(&self.collection)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        match body {
            Some(body) => {
                tracing::debug!(id = id.get(), collection = %self.collection, "deleted file document");
                Self::decode(&body)
            }
            None => Err(MetadataError::NotFound(format!("document file {id}"))),
        }
    }

    #[instrument(skip(self), fields(backend = "document"))]
    async fn file_stats(&self) -> MetadataResult<BackendStats> {
        let mut tx = self.pool.begin().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&mut *tx)
            .await?;
        let by_category = sqlx::query_as::<_, CountRow>(
            "SELECT COALESCE(json_extract(body, '$.category'), '') AS key, COUNT(*) AS count \
             FROM documents WHERE collection = ? GROUP BY key",
        )
        .bind(&self.collection)
        .fetch_all(&mut *tx)
        .await?;
        let by_extension = sqlx::query_as::<_, CountRow>(
            "SELECT COALESCE(json_extract(body, '$.ext'), '') AS key, COUNT(*) AS count \
             FROM documents WHERE collection = ? GROUP BY key",
        )
        .bind(&self.collection)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(BackendStats {
            total: u64::try_from(total).unwrap_or_default(),
            by_category: count_map(by_category),
            by_extension: count_map(by_extension),
        })
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
    collection TEXT PRIMARY KEY,
    seq INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id INTEGER NOT NULL,
    body TEXT NOT NULL CHECK (json_valid(body)),
    PRIMARY KEY (collection, doc_id)
);
-- One document per blob key within a collection.
CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_path
    ON documents(collection, json_extract(body, '$.path'));
CREATE INDEX IF NOT EXISTS idx_documents_category
    ON documents(collection, json_extract(body, '$.category'));
"#;
