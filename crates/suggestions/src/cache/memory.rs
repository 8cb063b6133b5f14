use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CacheBackend, CacheEntry, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-process cache with per-entry expiry. When full, expired entries
/// are purged first and then the entry closest to expiry is evicted.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // a poisoned map only means a panic elsewhere mid-insert; the data is still usable
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Live value for `key` together with its remaining lifetime.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(CacheEntry {
                value: entry.value.clone(),
                ttl: Some(entry.expires_at - now),
            }),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set_value(&self, key: &str, value: &str, ttl: Duration) {
        let mut entries = self.lock();
        let now = Instant::now();

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear_prefix(&self, prefix: &str) -> u64 {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        (before - entries.len()) as u64
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.get_entry(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set_value(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.remove(key);
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<u64, CacheError> {
        Ok(self.clear_prefix(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn stores_and_expires_entries() {
        let cache = MemoryCache::new(4);
        cache.set_value("a", "1", MINUTE);
        cache.set_value("b", "2", Duration::ZERO);

        assert_eq!(cache.get_value("a").as_deref(), Some("1"));
        assert_eq!(cache.get_value("b"), None);
        // expired entry is dropped on read
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_entry_closest_to_expiry_when_full() {
        let cache = MemoryCache::new(2);
        cache.set_value("short", "1", Duration::from_secs(5));
        cache.set_value("long", "2", Duration::from_secs(500));
        cache.set_value("new", "3", MINUTE);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_value("short"), None);
        assert!(cache.get_value("long").is_some());
        assert!(cache.get_value("new").is_some());
    }

    #[test]
    fn overwriting_an_existing_key_does_not_evict() {
        let cache = MemoryCache::new(2);
        cache.set_value("a", "1", MINUTE);
        cache.set_value("b", "2", MINUTE);
        cache.set_value("a", "3", MINUTE);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_value("a").as_deref(), Some("3"));
        assert_eq!(cache.get_value("b").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn clear_only_touches_matching_prefix() {
        let cache = MemoryCache::new(10);
        cache.set("suggestions:v1:a", "x", MINUTE).await.unwrap();
        cache.set("suggestions:v1:b", "x", MINUTE).await.unwrap();
        cache.set("other:c", "x", MINUTE).await.unwrap();

        assert_eq!(cache.clear("suggestions:").await.unwrap(), 2);
        let kept = cache.get("other:c").await.unwrap().unwrap();
        assert_eq!(kept.value, "x");
    }

    #[test]
    fn entries_report_remaining_lifetime() {
        let cache = MemoryCache::new(4);
        cache.set_value("a", "1", MINUTE);

        let entry = cache.get_entry("a").unwrap();
        let left = entry.ttl.unwrap();
        assert!(left <= MINUTE);
        assert!(left > Duration::from_secs(50));
    }
}
