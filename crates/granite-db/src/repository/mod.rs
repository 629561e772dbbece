//! # Repository Module
//!
//! Database repository implementations for the measurement ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  MeasurementService                                                    │
//! │       │                                                                 │
//! │       │  db.line_items().insert(sheet_id, item)                         │
//! │       ▼                                                                 │
//! │  LineItemRepository                                                    │
//! │  ├── find_by_id / list_for_sheet                                       │
//! │  ├── insert / insert_batch   (serial allocation + aggregate)           │
//! │  ├── update / delete         (aggregate, optional compaction)          │
//! │  └── renumber                                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories take and return the plain value types of granite-core;   │
//! │  SQL stays in this module.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SheetRepository`] - Sheet lifecycle, search and statistics
//! - [`LineItemRepository`] - Line items, serials and totals

pub mod line_item;
pub mod sheet;

pub use line_item::{LineItemRepository, NewLineItem, RenumberPolicy, MAX_ALLOCATION_ATTEMPTS};
pub use sheet::{SheetRepository, MAX_PAGE_SIZE};
