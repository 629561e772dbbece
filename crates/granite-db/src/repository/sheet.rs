//! # Sheet Repository
//!
//! Database operations for measurement sheets.
//!
//! ## Sheet Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sheet Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create() → MS-0001 { status: Draft, total_area: 0 }            │
//! │                                                                         │
//! │  2. MEASURE (LineItemRepository)                                       │
//! │     └── insert / insert_batch / update / delete                        │
//! │     └── total_area rebuilt in the same transaction                     │
//! │     └── customer type frozen once the first item exists                │
//! │                                                                         │
//! │  3. COMPLETE                                                           │
//! │     └── complete() → { status: Completed, completed_at }               │
//! │                                                                         │
//! │  (delete() removes the sheet and, by cascade, its items)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use granite_core::{
    CustomerType, MeasurementSheet, SheetQuery, SheetStatistics, SheetWithItems, SlabLineItem,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::line_item::ITEM_COLUMNS;
use crate::sequence::SequenceAllocator;

const SHEET_COLUMNS: &str = "id, sheet_number, customer_id, customer_type, status, \
     total_area, created_at, updated_at, completed_at";

/// Hard ceiling on one search page.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Repository for measurement sheet operations.
#[derive(Debug, Clone)]
pub struct SheetRepository {
    pool: SqlitePool,
    allocator: SequenceAllocator,
}

impl SheetRepository {
    /// Creates a new SheetRepository.
    pub fn new(pool: SqlitePool, allocator: SequenceAllocator) -> Self {
        SheetRepository { pool, allocator }
    }

    /// Gets a sheet by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<MeasurementSheet>> {
        let sql = format!("SELECT {SHEET_COLUMNS} FROM measurement_sheets WHERE id = ?1");
        let sheet = sqlx::query_as::<_, MeasurementSheet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sheet)
    }

    /// Gets a sheet by its human-facing number (`MS-0001`).
    pub async fn find_by_number(&self, sheet_number: &str) -> DbResult<Option<MeasurementSheet>> {
        let sql = format!("SELECT {SHEET_COLUMNS} FROM measurement_sheets WHERE sheet_number = ?1");
        let sheet = sqlx::query_as::<_, MeasurementSheet>(&sql)
            .bind(sheet_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(sheet)
    }

    /// Gets a sheet and its items from one read snapshot.
    ///
    /// The sheet's `total_area` always matches the returned items, even
    /// while other writers are busy on the same sheet.
    pub async fn find_with_items(&self, id: &str) -> DbResult<Option<SheetWithItems>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {SHEET_COLUMNS} FROM measurement_sheets WHERE id = ?1");
        let Some(sheet) = sqlx::query_as::<_, MeasurementSheet>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM slab_line_items WHERE sheet_id = ?1 ORDER BY serial_number"
        );
        let items = sqlx::query_as::<_, SlabLineItem>(&sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Some(SheetWithItems { sheet, items }))
    }

    /// Creates a draft sheet with a freshly allocated number.
    ///
    /// ## What This Does
    /// 1. Consumes the next sheet number (its own statement, never rolled back)
    /// 2. Inserts the sheet with `total_area = 0`
    ///
    /// If step 2 fails the number stays consumed. That leaves a gap in the
    /// numbering and never a duplicate.
    pub async fn create(
        &self,
        customer_id: &str,
        customer_type: CustomerType,
    ) -> DbResult<MeasurementSheet> {
        let sheet_number = self.allocator.next_sheet_number().await?;
        let now = Utc::now();

        let sheet = MeasurementSheet {
            id: Uuid::new_v4().to_string(),
            sheet_number,
            customer_id: customer_id.trim().to_string(),
            customer_type,
            status: Default::default(),
            total_area: 0.0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO measurement_sheets (
                id, sheet_number, customer_id, customer_type, status,
                total_area, created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&sheet.id)
        .bind(&sheet.sheet_number)
        .bind(&sheet.customer_id)
        .bind(sheet.customer_type)
        .bind(sheet.status)
        .bind(sheet.total_area)
        .bind(sheet.created_at)
        .bind(sheet.updated_at)
        .bind(sheet.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("sheet_number") => {
                DbError::duplicate("sheet_number", &sheet.sheet_number)
            }
            other => other,
        })?;

        info!(
            sheet_id = %sheet.id,
            sheet_number = %sheet.sheet_number,
            customer_type = %sheet.customer_type,
            "Measurement sheet created"
        );

        Ok(sheet)
    }

    /// Marks a sheet completed.
    ///
    /// Completing an already-completed sheet keeps the original
    /// `completed_at` and returns the sheet unchanged otherwise.
    pub async fn complete(&self, id: &str) -> DbResult<MeasurementSheet> {
        let now = Utc::now();

        let sql = format!(
            r#"
            UPDATE measurement_sheets SET
                status = 'completed',
                completed_at = COALESCE(completed_at, ?1),
                updated_at = CASE WHEN status = 'completed' THEN updated_at ELSE ?1 END
            WHERE id = ?2
            RETURNING {SHEET_COLUMNS}
            "#
        );
        let sheet = sqlx::query_as::<_, MeasurementSheet>(&sql)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Sheet", id))?;

        info!(sheet_id = %id, sheet_number = %sheet.sheet_number, "Measurement sheet completed");
        Ok(sheet)
    }

    /// Changes the customer type of a sheet that never had a line item.
    ///
    /// The first insert freezes the type for good; deleting every item
    /// afterwards does not reopen it.
    ///
    /// ## Errors
    /// - `NotFound` if the sheet doesn't exist
    /// - `CustomerTypeLocked` once any line item has been attached
    pub async fn change_customer_type(
        &self,
        id: &str,
        customer_type: CustomerType,
    ) -> DbResult<MeasurementSheet> {
        let now = Utc::now();

        // Single statement: the lock check and the write are atomic.
        let sql = format!(
            r#"
            UPDATE measurement_sheets SET customer_type = ?1, updated_at = ?2
            WHERE id = ?3 AND type_locked_at IS NULL
            RETURNING {SHEET_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, MeasurementSheet>(&sql)
            .bind(customer_type)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(sheet) => {
                info!(sheet_id = %id, customer_type = %customer_type, "Sheet customer type changed");
                Ok(sheet)
            }
            None => match self.find_by_id(id).await? {
                Some(sheet) => Err(DbError::CustomerTypeLocked {
                    sheet_id: id.to_string(),
                    locked: sheet.customer_type.to_string(),
                }),
                None => Err(DbError::not_found("Sheet", id)),
            },
        }
    }

    /// Deletes a sheet and, by cascade, its line items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM measurement_sheets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sheet", id));
        }

        info!(sheet_id = %id, "Measurement sheet deleted");
        Ok(())
    }

    /// Lists sheets matching `query`, newest first.
    ///
    /// Every filter is optional; `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn search(&self, query: &SheetQuery) -> DbResult<Vec<MeasurementSheet>> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {SHEET_COLUMNS} FROM measurement_sheets WHERE 1 = 1"
        ));

        if let Some(customer_id) = &query.customer_id {
            builder.push(" AND customer_id = ").push_bind(customer_id.trim());
        }
        if let Some(customer_type) = query.customer_type {
            builder.push(" AND customer_type = ").push_bind(customer_type);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(prefix) = query.sheet_number_prefix.as_deref().map(str::trim) {
            if !prefix.is_empty() {
                // substr instead of LIKE: no wildcard escaping needed
                builder
                    .push(" AND substr(sheet_number, 1, ")
                    .push_bind(prefix.chars().count() as i64)
                    .push(") = ")
                    .push_bind(prefix);
            }
        }

        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        builder
            .push(" ORDER BY created_at DESC, sheet_number DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));

        let sheets = builder
            .build_query_as::<MeasurementSheet>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = sheets.len(), "Sheet search complete");
        Ok(sheets)
    }

    /// Aggregated counts and area across every sheet.
    pub async fn statistics(&self) -> DbResult<SheetStatistics> {
        let stats = sqlx::query_as::<_, SheetStatistics>(
            r#"
            SELECT
                COUNT(*) AS total_sheets,
                COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0) AS draft_sheets,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed_sheets,
                (SELECT COUNT(*) FROM slab_line_items) AS total_line_items,
                CAST(ROUND(COALESCE(SUM(total_area), 0.0), 2) AS REAL) AS total_area
            FROM measurement_sheets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
