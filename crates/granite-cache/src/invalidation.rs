//! # Invalidation Rules
//!
//! Which cached entries a mutation makes stale.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ Mutation             │ Dropped                                          │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │ SheetCreated         │ sheet:{id} sheet:{id}:full sheets:list:* stats   │
//! │ SheetUpdated         │ sheet:{id} sheet:{id}:full sheets:list:* stats   │
//! │ SheetDeleted         │ sheet:{id} sheet:{id}:full sheets:list:* stats   │
//! │ LineItemsChanged     │ sheet:{id} sheet:{id}:full sheets:list:* stats   │
//! │ CustomerUpdated      │ customer:{id} sheets:list:*                      │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Listings embed `total_area` and status, so any sheet or item change drops
//! all of them.

use crate::key::{CacheKey, KeyPattern};

/// A committed change to persisted data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SheetCreated { sheet_id: String },
    SheetUpdated { sheet_id: String },
    SheetDeleted { sheet_id: String },
    /// Insert, update, delete or renumber of items in one sheet.
    LineItemsChanged { sheet_id: String },
    CustomerUpdated { customer_id: String },
}

/// Exact keys and patterns to drop for one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
    pub patterns: Vec<KeyPattern>,
}

impl Mutation {
    pub fn plan(&self) -> InvalidationPlan {
        match self {
            Mutation::SheetCreated { sheet_id }
            | Mutation::SheetUpdated { sheet_id }
            | Mutation::SheetDeleted { sheet_id }
            | Mutation::LineItemsChanged { sheet_id } => InvalidationPlan {
                keys: vec![
                    CacheKey::sheet(sheet_id.as_str()),
                    CacheKey::sheet_full(sheet_id.as_str()),
                    CacheKey::SheetStats,
                ],
                patterns: vec![KeyPattern::SheetLists],
            },
            Mutation::CustomerUpdated { customer_id } => InvalidationPlan {
                keys: vec![CacheKey::customer(customer_id.as_str())],
                patterns: vec![KeyPattern::SheetLists],
            },
        }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::SheetCreated { .. } => "sheet_created",
            Mutation::SheetUpdated { .. } => "sheet_updated",
            Mutation::SheetDeleted { .. } => "sheet_deleted",
            Mutation::LineItemsChanged { .. } => "line_items_changed",
            Mutation::CustomerUpdated { .. } => "customer_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_change_drops_sheet_views() {
        let plan = Mutation::LineItemsChanged {
            sheet_id: "s1".to_string(),
        }
        .plan();
        let keys: Vec<String> = plan.keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["sheet:s1", "sheet:s1:full", "sheets:stats"]);
        assert_eq!(plan.patterns, vec![KeyPattern::SheetLists]);
    }

    #[test]
    fn test_customer_update_leaves_sheets() {
        let plan = Mutation::CustomerUpdated {
            customer_id: "c1".to_string(),
        }
        .plan();
        assert_eq!(plan.keys, vec![CacheKey::customer("c1")]);
    }
}
