//! # Sequence Allocation
//!
//! Two kinds of numbers are handed out here.
//!
//! ## Sheet Numbers vs Line-Item Serials
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SHEET NUMBERS (global)               LINE-ITEM SERIALS (per sheet)    │
//! │  ──────────────────────               ─────────────────────────────    │
//! │  SequenceSource::next_value           inside the insert transaction:   │
//! │    own autocommit statement             1. lock_sheet  (row UPDATE)    │
//! │    consumed even if the sheet           2. next_serial (MAX + 1)       │
//! │    insert later fails                   3. INSERT n rows               │
//! │                                                                         │
//! │  MS-0001, MS-0002, (gap), MS-0004     1, 2, 3, ... N   (dense)         │
//! │  never reused                         one writer per sheet at a time   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sheet lock is the first statement of the transaction and is a write,
//! so the transaction never has to upgrade a read snapshot to a write lock.
//! Another writer on the same sheet waits on the busy timeout.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use granite_core::{format_sheet_number, CustomerType};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Name of the counter backing sheet numbers.
pub const SHEET_NUMBER_SEQUENCE: &str = "sheet_number";

// =============================================================================
// Sequence Source
// =============================================================================

/// A named, monotonically increasing counter.
///
/// Every call consumes a value. Implementations must never return the same
/// value twice for one name, even across process restarts when persistent.
#[async_trait]
pub trait SequenceSource: Send + Sync + fmt::Debug {
    async fn next_value(&self, name: &str) -> DbResult<i64>;
}

/// Counter stored in the `sequences` table.
#[derive(Debug, Clone)]
pub struct SqliteSequence {
    pool: SqlitePool,
}

impl SqliteSequence {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSequence { pool }
    }
}

#[async_trait]
impl SequenceSource for SqliteSequence {
    async fn next_value(&self, name: &str) -> DbResult<i64> {
        // Runs on the pool, never inside a caller's transaction.
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequences (name, value) VALUES (?1, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        debug!(sequence = name, value, "Sequence advanced");
        Ok(value)
    }
}

/// Process-local counter. Used by tests and tooling that don't need
/// numbers to survive a restart.
#[derive(Debug, Default)]
pub struct AtomicSequence {
    start: i64,
    values: Mutex<HashMap<String, i64>>,
}

impl AtomicSequence {
    /// The first value handed out for any name is `last + 1`.
    pub fn starting_at(last: i64) -> Self {
        AtomicSequence {
            start: last,
            values: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SequenceSource for AtomicSequence {
    async fn next_value(&self, name: &str) -> DbResult<i64> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| DbError::Internal("sequence mutex poisoned".to_string()))?;
        let value = values.entry(name.to_string()).or_insert(self.start);
        *value += 1;
        Ok(*value)
    }
}

// =============================================================================
// Sequence Allocator
// =============================================================================

/// Formats sheet numbers from an injected [`SequenceSource`].
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    source: Arc<dyn SequenceSource>,
}

impl SequenceAllocator {
    pub fn new(source: Arc<dyn SequenceSource>) -> Self {
        SequenceAllocator { source }
    }

    /// Consumes the next sheet number, e.g. `MS-0007`.
    pub async fn next_sheet_number(&self) -> DbResult<String> {
        let value = self.source.next_value(SHEET_NUMBER_SEQUENCE).await?;
        Ok(format_sheet_number(value))
    }
}

// =============================================================================
// Per-Sheet Serials
// =============================================================================

/// Takes the write lock on `sheet_id` and returns the sheet's customer type.
///
/// Must be the first statement of the transaction. Zero rows means the sheet
/// does not exist and nothing has been written.
pub(crate) async fn lock_sheet(
    conn: &mut SqliteConnection,
    sheet_id: &str,
    now: DateTime<Utc>,
) -> DbResult<CustomerType> {
    sqlx::query_scalar::<_, CustomerType>(
        "UPDATE measurement_sheets SET updated_at = ?1 WHERE id = ?2 RETURNING customer_type",
    )
    .bind(now)
    .bind(sheet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Sheet", sheet_id))
}

/// Same as [`lock_sheet`], addressed through one of the sheet's line items.
///
/// Returns `(sheet_id, customer_type)`.
pub(crate) async fn lock_sheet_of_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    now: DateTime<Utc>,
) -> DbResult<(String, CustomerType)> {
    sqlx::query_as::<_, (String, CustomerType)>(
        r#"
        UPDATE measurement_sheets SET updated_at = ?1
        WHERE id = (SELECT sheet_id FROM slab_line_items WHERE id = ?2)
        RETURNING id, customer_type
        "#,
    )
    .bind(now)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Line item", item_id))
}

/// Freezes the customer type of a locked sheet. Keeps the first timestamp.
///
/// Called by every insert; the mark outlives the items that set it.
pub(crate) async fn freeze_customer_type(
    conn: &mut SqliteConnection,
    sheet_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE measurement_sheets SET type_locked_at = COALESCE(type_locked_at, ?1) WHERE id = ?2",
    )
    .bind(now)
    .bind(sheet_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Next free serial in a locked sheet: `MAX(serial_number) + 1`, or 1.
pub(crate) async fn next_serial(conn: &mut SqliteConnection, sheet_id: &str) -> DbResult<i64> {
    let max: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(serial_number), 0) FROM slab_line_items WHERE sheet_id = ?1",
    )
    .bind(sheet_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(max + 1)
}

// =============================================================================
// Unit Tests
// =============================================================================
