//! Key-value persistence shared by the quota counter, preferences and
//! session tokens.
//!
//! Every value is a plain string keyed by a plain string. Components own
//! their keys; nothing outside a component writes that component's keys.

pub mod error;
pub mod memory;
pub mod preferences;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryKvStore;
pub use preferences::Preferences;
pub use sqlite::SqliteKvStore;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Boxed future type for key-value store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// String-keyed persistent storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, key: &str) -> StoreFuture<'_, StorageResult<Option<String>>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn set(&self, key: &str, value: &str) -> StoreFuture<'_, StorageResult<()>>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, key: &str) -> StoreFuture<'_, StorageResult<()>>;
}

/// Open the store selected by configuration.
///
/// # Errors
/// Returns an error if the `SQLite` database cannot be opened.
pub async fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryKvStore::new())),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteKvStore::new(config).await?)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StorageConfig::memory();
        let store = open_store(&config).await.unwrap();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            sqlite_path: dir.path().join("kv.sqlite"),
            ..StorageConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
