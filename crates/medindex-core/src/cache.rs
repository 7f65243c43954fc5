//! Search result cache seam.
//!
//! The read path may sit behind a cache keyed on the lowercased query.
//! The trait speaks string payloads (JSON), matching what an external
//! cache like Redis would store; [`MemoryCache`] is the in-process stand-in.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Best-effort key/value cache for search payloads. Implementations must
/// treat misses and storage failures as cache misses, never as errors.
pub trait SearchCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, payload: String);
}

/// Default time-to-live for cached search results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// In-memory TTL cache.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl SearchCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored_at, payload)) if stored_at.elapsed() < self.ttl => {
                Some(payload.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, payload: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let cache = MemoryCache::default();
        cache.put("medicine_search_asp", "[\"ASPIRIN\"]".into());
        assert_eq!(
            cache.get("medicine_search_asp").as_deref(),
            Some("[\"ASPIRIN\"]")
        );
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let cache = MemoryCache::default();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new(Duration::ZERO);
        cache.put("k", "v".into());
        assert!(cache.get("k").is_none());
    }
}
