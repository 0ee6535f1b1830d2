//! Response cache for the hot read endpoints

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Keys for the rendered payloads this service memoizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// User-facing list of lots with free spots
    AvailableLots,
    /// Admin analytics summary
    AdminAnalytics,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AvailableLots => "available_lots",
            Self::AdminAnalytics => "admin_analytics",
        }
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// TTL cache of rendered JSON payloads, cleared on every state change
pub struct ResponseCache {
    entries: DashMap<&'static str, CacheEntry>,
    available_lots_ttl: Duration,
    admin_analytics_ttl: Duration,
}

impl ResponseCache {
    pub fn new(available_lots_ttl: Duration, admin_analytics_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            available_lots_ttl,
            admin_analytics_ttl,
        }
    }

    pub fn get(&self, key: CacheKey) -> Option<Value> {
        let entry = self.entries.get(key.as_str())?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key.as_str());
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: CacheKey, value: Value) {
        let ttl = match key {
            CacheKey::AvailableLots => self.available_lots_ttl,
            CacheKey::AdminAnalytics => self.admin_analytics_ttl,
        };
        self.entries.insert(
            key.as_str(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn invalidate(&self, key: CacheKey) {
        self.entries.remove(key.as_str());
    }

    /// Drop every state-derived payload. Called after any mutation.
    pub fn invalidate_all(&self) {
        self.invalidate(CacheKey::AvailableLots);
        self.invalidate(CacheKey::AdminAnalytics);
        debug!("Response cache invalidated");
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> ResponseCache {
        ResponseCache::new(Duration::from_secs(60), Duration::from_secs(300))
    }

    #[test]
    fn get_returns_cached_value_until_invalidated() {
        let cache = cache();
        assert!(cache.get(CacheKey::AvailableLots).is_none());

        cache.put(CacheKey::AvailableLots, json!([{"id": 1}]));
        assert_eq!(cache.get(CacheKey::AvailableLots), Some(json!([{"id": 1}])));

        cache.invalidate_all();
        assert!(cache.get(CacheKey::AvailableLots).is_none());
    }

    #[test]
    fn keys_are_independent() {
        let cache = cache();
        cache.put(CacheKey::AvailableLots, json!(1));
        cache.put(CacheKey::AdminAnalytics, json!(2));

        cache.invalidate(CacheKey::AvailableLots);
        assert!(cache.get(CacheKey::AvailableLots).is_none());
        assert_eq!(cache.get(CacheKey::AdminAnalytics), Some(json!(2)));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(10), Duration::from_millis(10));
        cache.put(CacheKey::AdminAnalytics, json!("stale"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(CacheKey::AdminAnalytics).is_none());
    }
}
