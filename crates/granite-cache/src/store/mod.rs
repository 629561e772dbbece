//! # Cache Stores
//!
//! String-in, string-out backends behind one trait.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CacheStore (trait)                                │
//! │                                                                         │
//! │   RedisStore          MemoryStore            DisabledStore             │
//! │   ───────────         ───────────            ─────────────             │
//! │   SET EX / GET        HashMap + expiry       always miss               │
//! │   SCAN MATCH + DEL    glob over keys         deletes nothing           │
//! │   shared by all       one process only       caching switched off      │
//! │   service instances   (tests, fallback)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// A key/value store with per-entry expiry.
///
/// Deleting a key that is absent is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Returns how many of `keys` existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// Deletes every key matching a `*` glob; returns how many existed.
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64>;

    async fn ping(&self) -> CacheResult<()>;

    fn backend(&self) -> &'static str;
}

/// Store that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

#[async_trait]
impl CacheStore for DisabledStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
        Ok(0)
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}
