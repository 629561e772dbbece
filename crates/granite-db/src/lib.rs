//! # granite-db: Database Layer for Granite Ledger
//!
//! This crate provides persistence for measurement sheets and their slab
//! line items. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Granite Ledger Data Flow                         │
//! │                                                                         │
//! │  MeasurementService::add_line_item                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     granite-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ SheetRepo     │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ LineItemRepo  │    │ 001_...sql   │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                  ┌─────────────┴─────────────┐                 │   │
//! │  │                  ▼                           ▼                 │   │
//! │  │          sequence.rs                   aggregate.rs            │   │
//! │  │          sheet numbers, serials        total_area              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use granite_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ledger.db")).await?;
//! let sheet = db.sheets().create("CUST-7", CustomerType::GraniteShops).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sequence;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use sequence::{AtomicSequence, SequenceAllocator, SequenceSource, SqliteSequence};

// Repository re-exports for convenience
pub use repository::line_item::{LineItemRepository, NewLineItem, RenumberPolicy};
pub use repository::sheet::SheetRepository;
