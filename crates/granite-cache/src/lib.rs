//! # granite-cache: Read-Through Cache for Granite Ledger
//!
//! Caches sheet views that are expensive to assemble and drops them when a
//! committed mutation makes them stale.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MeasurementService                                                    │
//! │       │                         │                                       │
//! │       │ reads                   │ after COMMIT                          │
//! │       ▼                         ▼                                       │
//! │  CacheCoordinator::get_or_load  CacheCoordinator::invalidate(Mutation) │
//! │       │                         │                                       │
//! │       ▼                         ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  CacheKey + TtlPolicy     Mutation → InvalidationPlan           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CacheStore: RedisStore | MemoryStore | DisabledStore                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let cache = CacheCoordinator::new(Arc::new(MemoryStore::new()), TtlPolicy::default());
//! let sheet = cache
//!     .get_or_load(&CacheKey::sheet(&id), || db.sheets().find_by_id(&id))
//!     .await?;
//! cache.invalidate(&Mutation::LineItemsChanged { sheet_id: id }).await;
//! ```

pub mod coordinator;
pub mod error;
pub mod invalidation;
pub mod key;
pub mod policy;
pub mod store;

pub use coordinator::CacheCoordinator;
pub use error::{CacheError, CacheResult};
pub use invalidation::{InvalidationPlan, Mutation};
pub use key::{query_fingerprint, CacheKey, KeyPattern, TtlClass};
pub use policy::TtlPolicy;
pub use store::{CacheStore, DisabledStore, MemoryStore, RedisStore};
