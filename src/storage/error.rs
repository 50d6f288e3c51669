//! Error types for the storage module.

use thiserror::Error;

/// Storage subsystem error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error for structured values.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Backend refused or could not serve the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
