use std::time::Duration;

/// Key/value store for fetched pages and rendered search outputs.
pub trait PageCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, ttl: Duration);
}
