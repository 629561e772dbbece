//! # Cache Coordinator
//!
//! Read-through reads and mutation-driven invalidation over a
//! [`CacheStore`].
//!
//! ## Read Path
//! ```text
//! get_or_load(key, loader)
//!     │
//!     ├── store.get(key) ── hit, decodes ──► value
//!     │        │
//!     │        └── miss / store error / stale shape
//!     ▼
//! loader().await ── Err ──► Err (nothing cached)
//!     │ Ok(value)
//!     ▼
//! store.set(key, json, ttl)  (failure logged, value still returned)
//! ```
//!
//! No store failure reaches the caller. A stale hit within the TTL window is
//! accepted; the database stays the source of truth.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::invalidation::Mutation;
use crate::key::CacheKey;
use crate::policy::TtlPolicy;
use crate::store::{CacheStore, DisabledStore};

/// Typed front of a cache store.
#[derive(Debug, Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    policy: TtlPolicy,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, policy: TtlPolicy) -> Self {
        CacheCoordinator { store, policy }
    }

    /// A coordinator that never caches.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledStore), TtlPolicy::default())
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Cached value for `key`, if present and decodable.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key_str = key.to_string();
        let raw = match self.store.get(&key_str).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key_str, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key_str, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key_str, error = %e, "Cached value undecodable, treating as miss");
                None
            }
        }
    }

    /// Stores `value` under `key` with the policy's TTL.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let key_str = key.to_string();
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key_str, error = %e, "Value not serializable, skipping cache");
                return;
            }
        };

        if let Err(e) = self.store.set(&key_str, json, self.policy.ttl_for(key)).await {
            warn!(key = %key_str, error = %e, "Cache write failed");
        }
    }

    /// Returns the cached value or runs `loader` and caches its result.
    ///
    /// Loader errors are returned untouched and nothing is cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        debug!(key = %key, "Cache miss, loading");
        let value = loader().await?;
        self.put(key, &value).await;
        Ok(value)
    }

    /// Drops every entry `mutation` makes stale. Idempotent.
    pub async fn invalidate(&self, mutation: &Mutation) {
        let plan = mutation.plan();
        let keys: Vec<String> = plan.keys.iter().map(ToString::to_string).collect();

        let mut removed = 0;
        match self.store.delete(&keys).await {
            Ok(n) => removed += n,
            Err(e) => warn!(
                mutation = mutation.kind(),
                error = %e,
                "Cache key invalidation failed"
            ),
        }

        for pattern in &plan.patterns {
            match self.store.delete_pattern(pattern.as_str()).await {
                Ok(n) => removed += n,
                Err(e) => warn!(
                    mutation = mutation.kind(),
                    pattern = %pattern,
                    error = %e,
                    "Cache pattern invalidation failed"
                ),
            }
        }

        debug!(mutation = mutation.kind(), removed, "Cache invalidated");
    }

    /// Whether the backend answers.
    pub async fn health_check(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = self.backend(), error = %e, "Cache ping failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, CacheResult};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use granite_core::SheetQuery;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store whose every call fails.
    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Connection("down".to_string()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Connection("down".to_string()))
        }
        async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
            Err(CacheError::Connection("down".to_string()))
        }
        async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
            Err(CacheError::Connection("down".to_string()))
        }
        async fn ping(&self) -> CacheResult<()> {
            Err(CacheError::Connection("down".to_string()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn memory() -> (Arc<MemoryStore>, CacheCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = CacheCoordinator::new(store.clone(), TtlPolicy::default());
        (store, coordinator)
    }

    #[tokio::test]
    async fn test_get_or_load_reads_through_once() {
        let (_, cache) = memory();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::sheet("s1");

        for _ in 0..3 {
            let value: Result<String, ()> = cache
                .get_or_load(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("MS-0001".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "MS-0001");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let (store, cache) = memory();
        let key = CacheKey::sheet("s1");

        let result: Result<String, &str> = cache.get_or_load(&key, || async { Err("db down") }).await;
        assert_eq!(result.unwrap_err(), "db down");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidation_drops_sheet_views() {
        let (store, cache) = memory();
        let list_key = CacheKey::sheet_list(&SheetQuery::default());
        cache.put(&CacheKey::sheet("s1"), &1).await;
        cache.put(&CacheKey::sheet_full("s1"), &2).await;
        cache.put(&CacheKey::sheet("s2"), &3).await;
        cache.put(&list_key, &vec![1, 2]).await;
        cache.put(&CacheKey::SheetStats, &4).await;

        let mutation = Mutation::LineItemsChanged {
            sheet_id: "s1".to_string(),
        };
        cache.invalidate(&mutation).await;

        assert_eq!(store.len().await, 1);
        assert!(store.contains("sheet:s2").await);

        // Second run finds nothing and does not fail.
        cache.invalidate(&mutation).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_miss() {
        let cache = CacheCoordinator::new(Arc::new(BrokenStore), TtlPolicy::default());
        let key = CacheKey::SheetStats;

        assert_eq!(cache.get::<u32>(&key).await, None);
        cache.put(&key, &7u32).await;
        let loaded: Result<u32, ()> = cache.get_or_load(&key, || async { Ok(7) }).await;
        assert_eq!(loaded.unwrap(), 7);
        cache
            .invalidate(&Mutation::SheetDeleted {
                sheet_id: "s".to_string(),
            })
            .await;
        assert!(!cache.health_check().await);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let (store, cache) = memory();
        store
            .set("sheets:stats", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get::<u32>(&CacheKey::SheetStats).await, None);
    }

    #[tokio::test]
    async fn test_disabled_never_hits() {
        let cache = CacheCoordinator::disabled();
        cache.put(&CacheKey::SheetStats, &1u32).await;
        assert_eq!(cache.get::<u32>(&CacheKey::SheetStats).await, None);
        assert_eq!(cache.backend(), "disabled");
    }
}
