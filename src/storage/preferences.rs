//! Persisted user preferences.

use std::sync::Arc;

use tracing::warn;

use super::KeyValueStore;

const DARK_MODE_KEY: &str = "dark_mode";

/// User preferences stored alongside the quota counter.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the dark mode flag. Write failures are logged and dropped.
    pub async fn save_dark_mode(&self, enabled: bool) {
        let value = if enabled { "true" } else { "false" };
        if let Err(err) = self.store.set(DARK_MODE_KEY, value).await {
            warn!(error = %err, "Failed to save dark mode preference");
        }
    }

    /// Read the dark mode flag. `None` means "follow the system default",
    /// which is also the answer when storage cannot be read.
    pub async fn dark_mode(&self) -> Option<bool> {
        match self.store.get(DARK_MODE_KEY).await {
            Ok(value) => value.map(|v| v == "true"),
            Err(err) => {
                warn!(error = %err, "Failed to read dark mode preference");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use crate::storage::testing::FailingStore;

    #[tokio::test]
    async fn test_dark_mode_tri_state() {
        let prefs = Preferences::new(Arc::new(MemoryKvStore::new()));
        assert_eq!(prefs.dark_mode().await, None);

        prefs.save_dark_mode(true).await;
        assert_eq!(prefs.dark_mode().await, Some(true));

        prefs.save_dark_mode(false).await;
        assert_eq!(prefs.dark_mode().await, Some(false));
    }

    #[tokio::test]
    async fn test_failing_store_falls_back_to_system_default() {
        let prefs = Preferences::new(Arc::new(FailingStore));
        prefs.save_dark_mode(true).await;
        assert_eq!(prefs.dark_mode().await, None);
    }
}
