use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::{CacheBackend, MemoryCache};

/// Memory in front of an optional shared backend.
///
/// Reads check memory first, then the shared tier, copying hits back into
/// memory for whatever lifetime the shared copy has left, capped at
/// `backfill_ttl`. Writes go to both. Shared-tier errors never reach the
/// caller.
pub struct TieredCache {
    memory: MemoryCache,
    remote: Option<Arc<dyn CacheBackend>>,
    backfill_ttl: Duration,
}

impl TieredCache {
    pub fn new(
        memory: MemoryCache,
        remote: Option<Arc<dyn CacheBackend>>,
        backfill_ttl: Duration,
    ) -> Self {
        Self {
            memory,
            remote,
            backfill_ttl,
        }
    }

    pub fn memory_only(capacity: usize) -> Self {
        Self::new(MemoryCache::new(capacity), None, Duration::from_secs(60))
    }

    /// A second cache over the same shared tier with its own memory tier, so
    /// its entries never compete with ours for capacity.
    pub fn sibling(&self, capacity: usize) -> Self {
        Self::new(
            MemoryCache::new(capacity),
            self.remote.clone(),
            self.backfill_ttl,
        )
    }

    pub fn redis_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.memory.get_value(key) {
            return Some(value);
        }

        let remote = self.remote.as_ref()?;
        match remote.get(key).await {
            Ok(Some(entry)) => {
                let ttl = entry
                    .ttl
                    .map_or(self.backfill_ttl, |left| left.min(self.backfill_ttl));
                if !ttl.is_zero() {
                    self.memory.set_value(key, &entry.value, ttl);
                }
                Some(entry.value)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(backend = remote.name(), %error, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        self.memory.set_value(key, value, ttl);

        if let Some(remote) = &self.remote {
            if let Err(error) = remote.set(key, value, ttl).await {
                warn!(backend = remote.name(), %error, "cache write failed");
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        self.memory.remove(key);

        if let Some(remote) = &self.remote {
            if let Err(error) = remote.delete(key).await {
                warn!(backend = remote.name(), %error, "cache delete failed");
            }
        }
    }

    /// Clears `prefix` from both tiers. Returns the larger of the two counts,
    /// since the same key usually lives in both.
    pub async fn clear(&self, prefix: &str) -> u64 {
        let local = self.memory.clear_prefix(prefix);

        let shared = match &self.remote {
            Some(remote) => match remote.clear(prefix).await {
                Ok(count) => count,
                Err(error) => {
                    warn!(backend = remote.name(), %error, "cache clear failed");
                    0
                }
            },
            None => 0,
        };

        local.max(shared)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::time::sleep;

    use super::*;
    use crate::cache::{CacheEntry, CacheError};

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    fn shared() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::new(8))
    }

    struct BrokenBackend;

    fn broken() -> CacheError {
        CacheError::Redis(::redis::RedisError::from((
            ::redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(broken())
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(broken())
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(broken())
        }

        async fn clear(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(broken())
        }
    }

    #[tokio::test]
    async fn shared_hit_backfills_memory() {
        let shared = shared();
        shared.set_value("k", "v", MINUTE);

        let cache = TieredCache::new(MemoryCache::new(8), Some(shared.clone()), HOUR);
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.memory_len(), 1);

        shared.remove("k");
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn backfilled_copy_expires_with_the_shared_copy() {
        let shared = shared();
        let writer = TieredCache::new(MemoryCache::new(8), Some(shared.clone()), HOUR);
        let reader = TieredCache::new(MemoryCache::new(8), Some(shared.clone()), HOUR);

        writer
            .set("suggestions:recent:v1:u1", "[\"Okay!\"]", Duration::from_millis(150))
            .await;
        assert!(reader.get("suggestions:recent:v1:u1").await.is_some());
        assert_eq!(reader.memory_len(), 1);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(shared.get_value("suggestions:recent:v1:u1"), None);
        assert_eq!(reader.get("suggestions:recent:v1:u1").await, None);
    }

    #[tokio::test]
    async fn backfill_is_capped_for_keys_without_expiry() {
        struct Persistent;

        #[async_trait]
        impl CacheBackend for Persistent {
            fn name(&self) -> &'static str {
                "persistent"
            }

            async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
                Ok(Some(CacheEntry {
                    value: "v".to_string(),
                    ttl: None,
                }))
            }

            async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
                Ok(())
            }

            async fn delete(&self, _key: &str) -> Result<(), CacheError> {
                Ok(())
            }

            async fn clear(&self, _prefix: &str) -> Result<u64, CacheError> {
                Ok(0)
            }
        }

        let cache = TieredCache::new(
            MemoryCache::new(8),
            Some(Arc::new(Persistent)),
            Duration::from_millis(100),
        );
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.memory.get_value("k").as_deref(), Some("v"));

        sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.memory.get_value("k"), None);
    }

    #[tokio::test]
    async fn writes_reach_both_tiers() {
        let shared = shared();
        let cache = TieredCache::new(MemoryCache::new(8), Some(shared.clone()), MINUTE);

        cache.set("suggestions:a", "1", MINUTE).await;
        assert_eq!(shared.get_value("suggestions:a").as_deref(), Some("1"));

        assert_eq!(cache.clear("suggestions:").await, 1);
        assert_eq!(cache.get("suggestions:a").await, None);
    }

    #[tokio::test]
    async fn siblings_share_the_remote_but_not_memory() {
        let shared = shared();
        let pools = TieredCache::new(MemoryCache::new(1), Some(shared.clone()), MINUTE);
        let recent = pools.sibling(1);

        recent.set("suggestions:recent:v1:u1", "[]", MINUTE).await;
        pools.set("suggestions:v1:a", "1", HOUR).await;

        assert_eq!(recent.memory_len(), 1);
        assert_eq!(pools.memory_len(), 1);
        assert!(shared.get_value("suggestions:recent:v1:u1").is_some());
    }

    #[tokio::test]
    async fn shared_tier_failures_degrade_to_memory() {
        let cache = TieredCache::new(MemoryCache::new(8), Some(Arc::new(BrokenBackend)), MINUTE);
        assert!(cache.redis_enabled());

        assert_eq!(cache.get("missing").await, None);
        cache.set("k", "v", MINUTE).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.clear("k").await, 1);
        cache.delete("k").await;
    }

    #[test]
    fn memory_only_reports_no_shared_tier() {
        let cache = TieredCache::memory_only(4);
        assert!(!cache.redis_enabled());
    }
}
