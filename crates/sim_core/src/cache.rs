//! Injectable time-to-live cache.
//!
//! The simulation engine never reads the cache in its hot path. It is carried
//! on [`SimulationContext`](crate::context::SimulationContext) so that callers
//! can memoise serialised results across runs without global state.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use sim_core::cache::{MemoryTtlCache, TtlCache};
//!
//! let cache = MemoryTtlCache::new();
//! cache.set("report:42", "{}".to_string(), Duration::from_secs(60));
//! assert_eq!(cache.get("report:42").as_deref(), Some("{}"));
//! assert!(cache.get("report:7").is_none());
//! ```

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Key/value store whose entries expire after a time-to-live.
pub trait TtlCache: Send + Sync {
    /// Fetch a live entry.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or replace an entry that expires after `ttl`.
    fn set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory [`TtlCache`].
///
/// Expired entries are hidden from `get` and purged on the next `set`.
#[derive(Debug, Default)]
pub struct MemoryTtlCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryTtlCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TtlCache for MemoryTtlCache {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_then_get() {
        let cache = MemoryTtlCache::new();
        assert!(cache.is_empty());
        cache.set("a", "1".into(), Duration::from_secs(60));
        cache.set("a", "2".into(), Duration::from_secs(60));
        assert_eq!(cache.get("a").as_deref(), Some("2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_hidden_and_purged() {
        let cache = MemoryTtlCache::new();
        cache.set("stale", "x".into(), Duration::ZERO);
        assert!(cache.get("stale").is_none());

        cache.set("fresh", "y".into(), Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh").as_deref(), Some("y"));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache: Arc<dyn TtlCache> = Arc::new(MemoryTtlCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.set(&format!("k{}", i), i.to_string(), Duration::from_secs(60));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..4 {
            assert_eq!(cache.get(&format!("k{}", i)), Some(i.to_string()));
        }
    }
}
