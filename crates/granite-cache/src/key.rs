//! # Cache Keys
//!
//! Every cached value is addressed through [`CacheKey`]; no call site builds
//! key strings by hand.
//!
//! ## Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  KEY                         VALUE                     TTL CLASS       │
//! │  ─────────────────────────   ───────────────────────   ──────────      │
//! │  customer:{id}               customer record           Entity          │
//! │  sheet:{id}                  MeasurementSheet          Entity          │
//! │  sheet:{id}:full             SheetWithItems            FullSheet       │
//! │  sheets:list:{query hash}    Vec<MeasurementSheet>     Listing         │
//! │  sheets:stats                SheetStatistics           Statistics      │
//! │                                                                         │
//! │  PATTERN                                                               │
//! │  sheets:list:*               every listing at once                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use granite_core::SheetQuery;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// How long a kind of key lives. Resolved to a duration by
/// [`TtlPolicy`](crate::TtlPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    Entity,
    FullSheet,
    Listing,
    Statistics,
}

/// A typed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Customer(String),
    Sheet(String),
    SheetFull(String),
    /// Listing for one query, identified by [`query_fingerprint`].
    SheetList(u64),
    SheetStats,
}

impl CacheKey {
    pub fn customer(id: impl Into<String>) -> Self {
        CacheKey::Customer(id.into())
    }

    pub fn sheet(id: impl Into<String>) -> Self {
        CacheKey::Sheet(id.into())
    }

    pub fn sheet_full(id: impl Into<String>) -> Self {
        CacheKey::SheetFull(id.into())
    }

    pub fn sheet_list(query: &SheetQuery) -> Self {
        CacheKey::SheetList(query_fingerprint(query))
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            CacheKey::Customer(_) | CacheKey::Sheet(_) => TtlClass::Entity,
            CacheKey::SheetFull(_) => TtlClass::FullSheet,
            CacheKey::SheetList(_) => TtlClass::Listing,
            CacheKey::SheetStats => TtlClass::Statistics,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Customer(id) => write!(f, "customer:{id}"),
            CacheKey::Sheet(id) => write!(f, "sheet:{id}"),
            CacheKey::SheetFull(id) => write!(f, "sheet:{id}:full"),
            CacheKey::SheetList(hash) => write!(f, "sheets:list:{hash:016x}"),
            CacheKey::SheetStats => f.write_str("sheets:stats"),
        }
    }
}

/// A glob over keys. Only a trailing `*` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// `sheets:list:*`
    SheetLists,
}

impl KeyPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPattern::SheetLists => "sheets:list:*",
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable 64-bit FNV-1a over every filter of `query`.
///
/// Stable across processes and builds, unlike `DefaultHasher`, so several
/// service instances sharing one Redis agree on listing keys.
pub fn query_fingerprint(query: &SheetQuery) -> u64 {
    let customer_type = query.customer_type.map(|t| t.as_str()).unwrap_or("");
    let status = query.status.map(|s| s.as_str()).unwrap_or("");
    let canonical = format!(
        "c={}|t={}|s={}|p={}|l={}|o={}",
        query.customer_id.as_deref().unwrap_or(""),
        customer_type,
        status,
        query.sheet_number_prefix.as_deref().unwrap_or(""),
        query.limit,
        query.offset,
    );

    canonical.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use granite_core::{CustomerType, SheetStatus};

    #[test]
    fn test_key_strings() {
        assert_eq!(CacheKey::customer("C1").to_string(), "customer:C1");
        assert_eq!(CacheKey::sheet("abc").to_string(), "sheet:abc");
        assert_eq!(CacheKey::sheet_full("abc").to_string(), "sheet:abc:full");
        assert_eq!(CacheKey::SheetStats.to_string(), "sheets:stats");
        assert!(CacheKey::sheet_list(&SheetQuery::default())
            .to_string()
            .starts_with("sheets:list:"));
        assert_eq!(KeyPattern::SheetLists.to_string(), "sheets:list:*");
    }

    #[test]
    fn test_fingerprint_is_stable_and_discriminating() {
        let a = SheetQuery {
            customer_type: Some(CustomerType::Builders),
            ..Default::default()
        };
        let b = SheetQuery {
            status: Some(SheetStatus::Draft),
            ..Default::default()
        };
        assert_eq!(query_fingerprint(&a), query_fingerprint(&a.clone()));
        assert_ne!(query_fingerprint(&a), query_fingerprint(&b));
        assert_ne!(
            query_fingerprint(&SheetQuery::default()),
            query_fingerprint(&SheetQuery {
                offset: 50,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_ttl_classes() {
        assert_eq!(CacheKey::sheet("x").ttl_class(), TtlClass::Entity);
        assert_eq!(CacheKey::sheet_full("x").ttl_class(), TtlClass::FullSheet);
        assert_eq!(CacheKey::SheetStats.ttl_class(), TtlClass::Statistics);
    }
}
