//! Session token persistence and refresh throttling.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageResult};

/// Key holding the serialized session.
pub const SESSION_TOKEN_KEY: &str = "session.token";
/// Every key a session may occupy.
pub const SESSION_KEYS: [&str; 4] = [
    SESSION_TOKEN_KEY,
    "session.refresh_token",
    "session.user",
    "session.expires",
];

/// Refresh only when a token expires within this window.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(300);
/// Minimum spacing between two refreshes.
pub const REFRESH_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// An authenticated backend session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token exchanged for a new session.
    pub refresh_token: String,
    /// Expiry as Unix seconds.
    pub expires_at: i64,
}

/// Persists the session in key-value storage.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save a session.
    ///
    /// # Errors
    /// Returns an error if the session cannot be serialized or written.
    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        let json = serde_json::to_string(session)?;
        self.store.set(SESSION_TOKEN_KEY, &json).await
    }

    /// Load the saved session. Unreadable sessions are logged and ignored.
    pub async fn load(&self) -> Option<Session> {
        let raw = match self.store.get(SESSION_TOKEN_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Error reading session");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, "Stored session is not valid JSON"))
            .ok()
    }

    /// Remove every session key. Individual failures are logged and the
    /// remaining keys are still removed.
    pub async fn clear_session(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key).await {
                warn!(key, error = %e, "Error removing session key");
            }
        }
        debug!("Session cleared");
    }
}

/// Decides when a session is close enough to expiry to refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    window: Duration,
}

impl RefreshPolicy {
    /// Policy with a custom window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// True when the session expires within the window of `now` (Unix seconds).
    #[must_use]
    pub fn should_refresh(&self, session: &Session, now: i64) -> bool {
        let window = i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX);
        session.expires_at.saturating_sub(now) <= window
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(REFRESH_WINDOW)
    }
}

/// Admits at most one refresh per interval.
#[derive(Debug)]
pub struct RefreshLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RefreshLimiter {
    /// Limiter with a custom interval.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Claim the right to refresh at `now`.
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for RefreshLimiter {
    fn default() -> Self {
        Self::new(REFRESH_MIN_INTERVAL)
    }
}
