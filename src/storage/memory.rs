//! In-process key-value store.

use dashmap::DashMap;

use super::{KeyValueStore, StorageResult, StoreFuture};

/// Thread-safe in-memory store. Contents are lost on process exit.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> StoreFuture<'_, StorageResult<Option<String>>> {
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, key: &str, value: &str) -> StoreFuture<'_, StorageResult<()>> {
        self.entries.insert(key.to_string(), value.to_string());
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, StorageResult<()>> {
        self.entries.remove(key);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryKvStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("prompt_count", "3").await.unwrap();
        store.set("prompt_count", "4").await.unwrap();
        assert_eq!(store.get("prompt_count").await.unwrap().as_deref(), Some("4"));
        assert_eq!(store.len(), 1);

        store.remove("prompt_count").await.unwrap();
        store.remove("prompt_count").await.unwrap();
        assert!(store.is_empty());
    }
}
