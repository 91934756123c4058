//! History store error types

use thiserror::Error;

/// Errors that can occur while reading sample history
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be opened or is missing its schema
    #[error("Store unreachable: {0}")]
    Connectivity(String),

    /// The store was reachable but a read failed
    #[error("Query failed: {0}")]
    Query(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
