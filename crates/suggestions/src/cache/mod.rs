//! Two-tier cache for candidate pools and per-user recent suggestions.
//!
//! The in-process tier is always present. A shared Redis tier sits behind it
//! when configured; failures there are logged and treated as misses so the
//! pipeline keeps answering from memory.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod redis;
mod tiered;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;
pub use tiered::TieredCache;

/// A cached value and how long it has left. `ttl` is `None` when the backend
/// holds the key without an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix` and returns how many were removed.
    async fn clear(&self, prefix: &str) -> Result<u64, CacheError>;
}
