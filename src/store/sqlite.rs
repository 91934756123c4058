//! SQLite-backed sample history
//!
//! Expects a table of the form:
//!
//! ```sql
//! CREATE TABLE data (
//!     value INTEGER NOT NULL,
//!     graph_type TEXT,
//!     recorded_at INTEGER NOT NULL
//! );
//! ```
//!
//! The file is opened read-only on every call, so a store that comes up
//! after the server is picked up without a restart.

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

use super::{HistoryRecord, SampleStore, StoreError, StoreResult};

/// Read-only history backed by a SQLite file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    max_records: usize,
}

impl SqliteStore {
    /// Create a store reading at most `max_records` of the newest samples
    pub fn new(path: impl AsRef<Path>, max_records: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_records,
        }
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> StoreResult<Connection> {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Connectivity(format!("{}: {}", path.display(), e)))
    }

    fn ping(path: &Path) -> StoreResult<()> {
        let conn = Self::open(path)?;
        conn.prepare("SELECT 1 FROM data LIMIT 1")
            .map_err(|e| StoreError::Connectivity(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn read(path: &Path, limit: usize) -> StoreResult<Vec<HistoryRecord>> {
        let conn = Self::open(path)?;

        // Newest `limit` rows, returned oldest first
        let mut stmt = conn
            .prepare(
                "SELECT value, graph_type, recorded_at FROM (
                     SELECT value, graph_type, recorded_at FROM data
                     ORDER BY recorded_at DESC LIMIT ?1
                 ) ORDER BY recorded_at ASC",
            )
            .map_err(|e| StoreError::Connectivity(format!("{}: {}", path.display(), e)))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                let graph_type: Option<String> = row.get(1)?;
                Ok(HistoryRecord {
                    value: row.get(0)?,
                    graph_type: graph_type.and_then(|s| s.parse().ok()),
                    recorded_at: row.get(2)?,
                })
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

#[async_trait]
impl SampleStore for SqliteStore {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    async fn check(&self) -> StoreResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::ping(&path))
            .await
            .map_err(|e| StoreError::Query(format!("store task failed: {}", e)))?
    }

    async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>> {
        let path = self.path.clone();
        let limit = self.max_records;
        let records = tokio::task::spawn_blocking(move || Self::read(&path, limit))
            .await
            .map_err(|e| StoreError::Query(format!("store task failed: {}", e)))??;

        tracing::debug!(store = %self.describe(), records = records.len(), "Fetched sample history");
        Ok(records)
    }
}
