use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{CacheBackend, CacheEntry, CacheError};

const SCAN_BATCH: usize = 100;

/// Shared cache tier backed by a Redis connection manager.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

/// PTTL answers -1 for keys without expiry and -2 for missing keys.
fn remaining_ttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl).ok().map(Duration::from_millis)
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.connection.clone();
        let (value, pttl) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async::<_, (Option<String>, i64)>(&mut conn)
            .await?;

        Ok(value.map(|value| CacheEntry {
            value,
            ttl: remaining_ttl(pttl),
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, u64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async::<_, (u64, Vec<String>)>(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, u64>(&mut conn)
                    .await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pttl_replies_map_to_remaining_lifetime() {
        assert_eq!(remaining_ttl(1500), Some(Duration::from_millis(1500)));
        assert_eq!(remaining_ttl(0), Some(Duration::ZERO));
        assert_eq!(remaining_ttl(-1), None);
        assert_eq!(remaining_ttl(-2), None);
    }
}
