//! Sample History
//!
//! Read-only access to samples recorded by some other process. The relay
//! never writes history; it only hands what exists to newly connected
//! clients.
//!
//! - [`NullStore`]: no store configured, history is always empty
//! - [`SqliteStore`]: reads the `data` table of a SQLite file

mod error;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chart::ChartType;
use crate::config::StoreConfig;

/// One previously recorded sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub value: i64,
    /// `None` when the stored label is missing or unknown
    pub graph_type: Option<ChartType>,
    /// Milliseconds since the Unix epoch
    pub recorded_at: i64,
}

/// Source of sample history
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Human-readable description for logs and health output
    fn describe(&self) -> String;

    /// Verify the store can be read
    async fn check(&self) -> StoreResult<()>;

    /// Fetch recorded samples, oldest first
    async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>>;
}

/// Store used when no history is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl SampleStore for NullStore {
    fn describe(&self) -> String {
        "none".to_string()
    }

    async fn check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>> {
        Ok(Vec::new())
    }
}

/// Build the store named by the configuration
pub fn from_config(config: &StoreConfig) -> Arc<dyn SampleStore> {
    match &config.path {
        Some(path) => Arc::new(SqliteStore::new(path, config.max_records)),
        None => Arc::new(NullStore),
    }
}

/// Fetch history, logging and swallowing store failures
pub async fn fetch_or_empty(store: &dyn SampleStore) -> Vec<HistoryRecord> {
    match store.fetch_all().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(store = %store.describe(), error = %e, "Failed to fetch sample history");
            Vec::new()
        }
    }
}
