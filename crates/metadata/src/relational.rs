//! Relational metadata store: one row per file, tags in a join table.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{CountRow, FileRow, size_to_db};
use crate::repos::FileRepo;
use crate::store::{MetadataStore, connect, count_map, like_pattern};
use async_trait::async_trait;
use filehub_core::{Backend, BackendStats, FileFilter, FileId, FileRecord, NewFile};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::path::Path;
use tracing::instrument;

/// Columns of [`FileRow`], tags aggregated into a JSON array.
const FILE_SELECT: &str = r#"
SELECT f.id, f.original_name, f.stored_path, f.extension, f.category, f.size_bytes, f.created_at,
    COALESCE((SELECT json_group_array(t.tag) FROM file_tags t WHERE t.file_id = f.id), '[]') AS tags
FROM files f
"#;

/// SQLite-backed relational metadata store.
pub struct RelationalStore {
    pool: Pool<Sqlite>,
}

impl RelationalStore {
    /// Open (and migrate) the store at `path`.
    pub async fn new(
        path: impl AsRef<Path>,
        acquire_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let pool = connect(path.as_ref(), acquire_timeout_secs).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for RelationalStore {
    fn backend(&self) -> Backend {
        Backend::Relational
    }

    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FileRepo for RelationalStore {
    #[instrument(skip(self, file), fields(backend = "relational", stored_path = %file.stored_path))]
    async fn insert_file(&self, file: &NewFile) -> MetadataResult<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO files (original_name, stored_path, extension, category, size_bytes, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.original_name)
        .bind(&file.stored_path)
        .bind(&file.extension)
        .bind(&file.category)
        .bind(size_to_db(file.size_bytes)?)
        .bind(file.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            MetadataError::from_insert(e, || {
                format!("relational file for stored path {}", file.stored_path)
            })
        })?;
        let id = result.last_insert_rowid();

        for tag in &file.tags {
            sqlx::query("INSERT INTO file_tags (file_id, tag) VALUES (?, ?)")
                .bind(id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(id, stored_path = %file.stored_path, "inserted relational file");

        Ok(file.clone().into_record(FileId::new(id), Backend::Relational))
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn get_file(&self, id: FileId) -> MetadataResult<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!("{FILE_SELECT} WHERE f.id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.map(FileRow::into_record).transpose()
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn find_by_stored_path(&self, stored_path: &str) -> MetadataResult<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!("{FILE_SELECT} WHERE f.stored_path = ?"))
            .bind(stored_path)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FileRow::into_record).transpose()
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn list_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(FILE_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(query) = &filter.query {
            qb.push(" AND f.original_name LIKE ")
                .push_bind(like_pattern(query))
                .push(" ESCAPE '\\'");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND f.category = ").push_bind(category.as_str());
        }
        if let Some(extension) = &filter.extension {
            qb.push(" AND f.extension = ").push_bind(extension.as_str());
        }
        for tag in &filter.tags {
            qb.push(" AND EXISTS (SELECT 1 FROM file_tags ft WHERE ft.file_id = f.id AND ft.tag = ")
                .push_bind(tag.as_str())
                .push(")");
        }
        qb.push(" ORDER BY f.id DESC");

        let rows = qb
            .build_query_as::<FileRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(FileRow::into_record).collect()
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn rename_file(&self, id: FileId, new_name: &str) -> MetadataResult<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE files SET original_name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("relational file {id}")));
        }

        let row = sqlx::query_as::<_, FileRow>(&format!("{FILE_SELECT} WHERE f.id = ?"))
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        row.into_record()
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn delete_file(&self, id: FileId) -> MetadataResult<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FileRow>(&format!("{FILE_SELECT} WHERE f.id = ?"))
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("relational file {id}")))?;

        // Tags go with the row via ON DELETE CASCADE.
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(id = id.get(), "deleted relational file");

        row.into_record()
    }

    #[instrument(skip(self), fields(backend = "relational"))]
    async fn file_stats(&self) -> MetadataResult<BackendStats> {
        // One read transaction so the three counts agree with each other.
        let mut tx = self.pool.begin().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&mut *tx)
            .await?;
        let by_category = sqlx::query_as::<_, CountRow>(
            "SELECT category AS key, COUNT(*) AS count FROM files GROUP BY category",
        )
        .fetch_all(&mut *tx)
        .await?;
        let by_extension = sqlx::query_as::<_, CountRow>(
            "SELECT extension AS key, COUNT(*) AS count FROM files GROUP BY extension",
        )
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

/// Relational schema.
///
/// AUTOINCREMENT keeps ids from being reused after a delete.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_name TEXT NOT NULL,
    stored_path TEXT NOT NULL UNIQUE,
    extension TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    size_bytes INTEGER NOT NULL CHECK (size_bytes >= 0),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_files_category ON files(category);
CREATE INDEX IF NOT EXISTS idx_files_extension ON files(extension);
CREATE INDEX IF NOT EXISTS idx_files_created_at ON files(created_at);

CREATE TABLE IF NOT EXISTS file_tags (
    file_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (file_id, tag),
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_file_tags_tag ON file_tags(tag, file_id);
"#;
