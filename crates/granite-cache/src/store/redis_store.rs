//! Redis-backed store shared by every service instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::CacheStore;
use crate::error::{CacheError, CacheResult};

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// Store backed by a Redis [`ConnectionManager`], which reconnects on its
/// own after a dropped connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Opens a managed connection to `url` (`redis://host:6379/0`).
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!("Connected to Redis");
        Ok(RedisStore { manager })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut con = self.manager.clone();
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut con = self.manager.clone();
        // SET EX rejects 0
        let seconds = ttl.as_secs().max(1);
        let _: () = con.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut con = self.manager.clone();
        let removed: u64 = con.del(keys).await?;
        Ok(removed)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut con = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        // SCAN instead of KEYS: never blocks the server on a large keyspace.
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await?;

            if !keys.is_empty() {
                let n: u64 = con.del(&keys).await?;
                removed += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, removed, "Pattern invalidated");
        Ok(removed)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut con = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
