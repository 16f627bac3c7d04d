use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::ports::cache::PageCache;

const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// LRU page cache with a per-entry TTL.
pub struct MemoryCache {
    inner: RwLock<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            tracing::warn!(
                fallback = FALLBACK_CAPACITY.get(),
                "Cache max_entries was 0, using fallback capacity"
            );
            FALLBACK_CAPACITY
        });
        Self {
            inner: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map_or(0, |cache| cache.iter().filter(|(_, e)| !e.is_expired()).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(mut cache) = self.inner.write() else {
            tracing::error!(key, "Page cache lock poisoned, treating as miss");
            return None;
        };
        if cache.peek(key)?.is_expired() {
            cache.pop(key);
            return None;
        }
        cache.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        let Ok(mut cache) = self.inner.write() else {
            tracing::error!(key, "Page cache lock poisoned, skipping write");
            return;
        };
        cache.put(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_for_unknown_page() {
        let cache = MemoryCache::new(10);
        assert!(cache.get("https://www.bayut.com/to-rent/villas/uae/").is_none());
    }

    #[test]
    fn stored_page_is_returned() {
        let cache = MemoryCache::new(10);
        cache.set("page", "<html></html>", Duration::from_secs(60));
        assert_eq!(cache.get("page").as_deref(), Some("<html></html>"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_page_is_dropped() {
        let cache = MemoryCache::new(10);
        cache.set("page", "<html></html>", Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("page").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_page_is_evicted() {
        let cache = MemoryCache::new(2);
        cache.set("a", "1", Duration::from_secs(60));
        cache.set("b", "2", Duration::from_secs(60));
        assert!(cache.get("a").is_some());
        cache.set("c", "3", Duration::from_secs(60));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn zero_capacity_uses_fallback() {
        let cache = MemoryCache::new(0);
        cache.set("key", "value", Duration::from_secs(60));
        assert_eq!(cache.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn shared_between_threads() {
        use std::sync::Arc;
        let cache = Arc::new(MemoryCache::new(100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = format!("page{i}");
                    c.set(&key, "body", Duration::from_secs(60));
                    c.get(&key)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(cache.len(), 8);
    }
}
