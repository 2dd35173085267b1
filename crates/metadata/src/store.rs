//! Metadata store trait and shared SQLite plumbing.

use crate::error::MetadataResult;
use crate::models::CountRow;
use crate::repos::FileRepo;
use async_trait::async_trait;
use filehub_core::Backend;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: FileRepo + Send + Sync {
    /// Which backend this store is.
    fn backend(&self) -> Backend;

    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Close the connection pool. Later calls fail with a database error.
    async fn close(&self);
}

/// Open a SQLite pool for one store database, creating the file if needed.
pub(crate) async fn connect(
    path: &Path,
    acquire_timeout_secs: Option<u64>,
) -> MetadataResult<Pool<Sqlite>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        // Prevent transient "database is locked" errors under concurrent access.
        .busy_timeout(Duration::from_secs(5));

    let mut pool_opts = SqlitePoolOptions::new()
        // SQLite permits limited write concurrency; a single connection
        // serializes writers instead of failing them.
        .max_connections(1);
    if let Some(secs) = acquire_timeout_secs {
        pool_opts = pool_opts.acquire_timeout(Duration::from_secs(secs));
    }

    Ok(pool_opts.connect_with(opts).await?)
}

/// Turn a free-text query into a `LIKE` pattern matching it as a substring.
///
/// `%`, `_` and the escape character itself match literally; pair with
/// `ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn count_map(rows: Vec<CountRow>) -> BTreeMap<String, u64> {
    rows.into_iter()
        .map(|row| (row.key, u64::try_from(row.count).unwrap_or_default()))
        .collect()
}
