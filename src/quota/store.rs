//! Per-day usage counter over key-value storage.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::KeyValueStore;

use super::clock::Clock;

/// Storage key of the usage counter.
pub const COUNT_KEY: &str = "prompt_count";
/// Storage key of the day the counter was last reset.
pub const RESET_DATE_KEY: &str = "last_reset_date";

/// Persisted quota state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuotaRecord {
    /// Actions used on `last_reset_date`.
    pub count: u32,
    /// ISO calendar day (`YYYY-MM-DD`) of the last reset.
    pub last_reset_date: Option<String>,
}

/// Owner of the quota keys.
///
/// Storage failures never escape: reads fail open to zero and writes are
/// logged and dropped. Mutations are serialized so concurrent increments
/// cannot lose updates.
pub struct QuotaStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl QuotaStore {
    /// Create a store over key-value storage and a day source.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    fn today(&self) -> String {
        self.clock.today().format("%Y-%m-%d").to_string()
    }

    async fn read_record(&self) -> QuotaRecord {
        let count = match self.store.get(COUNT_KEY).await {
            Ok(Some(raw)) => raw.trim().parse::<u32>().unwrap_or_else(|e| {
                warn!(value = %raw, error = %e, "Unparsable prompt count, treating as 0");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Error getting prompt count");
                0
            }
        };

        let last_reset_date = match self.store.get(RESET_DATE_KEY).await {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, "Error getting last reset date");
                None
            }
        };

        QuotaRecord {
            count,
            last_reset_date,
        }
    }

    /// Current record. A record from an earlier day reads as zero used.
    pub async fn get(&self) -> QuotaRecord {
        let mut record = self.read_record().await;
        if record.last_reset_date.as_deref() != Some(self.today().as_str()) {
            record.count = 0;
        }
        record
    }

    /// Count one action. Resets the counter first when the day changed.
    ///
    /// Returns the new count, also when persisting it failed.
    pub async fn increment(&self) -> u32 {
        let _guard = self.write_lock.lock().await;

        let today = self.today();
        let record = self.read_record().await;

        let current = if record.last_reset_date.as_deref() == Some(today.as_str()) {
            record.count
        } else {
            info!(
                previous = ?record.last_reset_date,
                today = %today,
                "New day, resetting prompt count"
            );
            self.write(COUNT_KEY, "0").await;
            self.write(RESET_DATE_KEY, &today).await;
            0
        };

        let next = current.saturating_add(1);
        self.write(COUNT_KEY, &next.to_string()).await;
        debug!(count = next, "Prompt count incremented");
        next
    }

    /// Give back `amount` actions, never going below zero.
    ///
    /// Returns the resulting count.
    pub async fn add_bonus(&self, amount: u32) -> u32 {
        let _guard = self.write_lock.lock().await;

        let current = self.get().await.count;
        let next = current.saturating_sub(amount);
        self.write(COUNT_KEY, &next.to_string()).await;
        info!(from = current, to = next, "Rewarded prompts added");
        next
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            warn!(key, error = %e, "Error persisting quota");
        }
    }
}
