//! # TTL Policy
//!
//! Maps a key's [`TtlClass`] to an expiry.

use std::time::Duration;

use crate::key::{CacheKey, TtlClass};

/// Expiry per key kind.
///
/// Defaults: entities 1 h, full sheets 30 min, listings 5 min,
/// statistics 10 min.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub entity: Duration,
    pub full_sheet: Duration,
    pub listing: Duration,
    pub statistics: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy {
            entity: Duration::from_secs(3600),
            full_sheet: Duration::from_secs(1800),
            listing: Duration::from_secs(300),
            statistics: Duration::from_secs(600),
        }
    }
}

impl TtlPolicy {
    pub fn entity(mut self, ttl: Duration) -> Self {
        self.entity = ttl;
        self
    }

    pub fn full_sheet(mut self, ttl: Duration) -> Self {
        self.full_sheet = ttl;
        self
    }

    pub fn listing(mut self, ttl: Duration) -> Self {
        self.listing = ttl;
        self
    }

    pub fn statistics(mut self, ttl: Duration) -> Self {
        self.statistics = ttl;
        self
    }

    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        match key.ttl_class() {
            TtlClass::Entity => self.entity,
            TtlClass::FullSheet => self.full_sheet,
            TtlClass::Listing => self.listing,
            TtlClass::Statistics => self.statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for(&CacheKey::sheet("s")), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for(&CacheKey::sheet_full("s")), Duration::from_secs(1800));
        assert_eq!(
            policy.ttl_for(&CacheKey::sheet_list(&Default::default())),
            Duration::from_secs(300)
        );
        assert_eq!(policy.ttl_for(&CacheKey::SheetStats), Duration::from_secs(600));
    }

    #[test]
    fn test_overrides() {
        let policy = TtlPolicy::default().listing(Duration::from_secs(5));
        assert_eq!(
            policy.ttl_for(&CacheKey::sheet_list(&Default::default())),
            Duration::from_secs(5)
        );
    }
}
