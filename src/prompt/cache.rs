//! Duplicate-avoidance cache for generated prompts.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;

/// Set of normalized prompts already handed out by one generator.
///
/// Not persisted. Unbounded unless built with a capacity, in which case the
/// least recently seen prompts are forgotten first.
pub struct PromptCache {
    seen: Mutex<LruCache<String, ()>>,
}

impl PromptCache {
    /// Create a cache, bounded when `capacity` is a positive number.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        let seen = match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            seen: Mutex::new(seen),
        }
    }

    /// Record a normalized prompt. Returns `false` if it was already known.
    pub async fn remember(&self, normalized: String) -> bool {
        let mut seen = self.seen.lock().await;
        if seen.contains(&normalized) {
            seen.promote(&normalized);
            return false;
        }
        seen.put(normalized, ());
        true
    }

    /// Whether a normalized prompt is known.
    pub async fn contains(&self, normalized: &str) -> bool {
        self.seen.lock().await.contains(normalized)
    }

    /// Number of remembered prompts.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::new(None)
    }
}
