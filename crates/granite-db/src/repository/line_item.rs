//! # Line Item Repository
//!
//! Database operations for slab line items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert / insert_batch                                                  │
//! │                                                                         │
//! │  attempt 1..=3                                                         │
//! │    BEGIN                                                               │
//! │      lock_sheet(sheet_id)         ── zero rows? NotFound, nothing kept │
//! │      customer type matches?       ── no? CustomerTypeLocked            │
//! │      serial = MAX(serial) + 1                                          │
//! │      INSERT item(serial), item(serial + 1), ...                        │
//! │      freeze customer type                                              │
//! │      recompute_total_area                                              │
//! │    COMMIT                                                              │
//! │    UNIQUE(sheet_id, serial_number) hit? ── roll back, next attempt     │
//! │                                                                         │
//! │  update / delete                                                        │
//! │    BEGIN                                                               │
//! │      lock_sheet_of_item(item_id)                                       │
//! │      UPDATE or DELETE                                                  │
//! │      [delete + Compact] renumber                                       │
//! │      recompute_total_area                                              │
//! │    COMMIT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use granite_core::validation::ValidatedLineItem;
use granite_core::{CalculationResult, CustomerType, SlabCategory, SlabLineItem};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::recompute_total_area;
use crate::error::{DbError, DbResult};
use crate::sequence::{freeze_customer_type, lock_sheet, lock_sheet_of_item, next_serial};

/// Attempts per insert before a serial conflict is surfaced.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

pub(crate) const ITEM_COLUMNS: &str = "id, sheet_id, serial_number, block_number, length, breadth, \
     category, final_length, final_breadth, area, calculation_trail, created_at, updated_at";

// =============================================================================
// Write Models
// =============================================================================

/// A validated, already-computed line item ready to persist.
///
/// `customer_type` is the type the area was computed under; the write is
/// rejected if the sheet holds a different one by the time it is locked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub customer_type: CustomerType,
    pub block_number: Option<String>,
    pub length: f64,
    pub breadth: f64,
    pub category: SlabCategory,
    pub final_length: f64,
    pub final_breadth: f64,
    pub area: f64,
    pub calculation_trail: String,
}

impl NewLineItem {
    /// Combines validated input with its calculation result.
    pub fn from_calculation(input: ValidatedLineItem, result: &CalculationResult) -> Self {
        NewLineItem {
            customer_type: result.customer_type,
            block_number: input.block_number,
            length: input.length,
            breadth: input.breadth,
            category: input.category,
            final_length: result.final_length,
            final_breadth: result.final_breadth,
            area: result.area,
            calculation_trail: result.trail(),
        }
    }
}

/// What to do with serial numbers after a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenumberPolicy {
    /// Leave the hole; later inserts still continue from `MAX + 1`.
    KeepGaps,
    /// Close the hole in the same transaction so serials stay `1..N`.
    #[default]
    Compact,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for line-item operations.
#[derive(Debug, Clone)]
pub struct LineItemRepository {
    pool: SqlitePool,
}

impl LineItemRepository {
    /// Creates a new LineItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LineItemRepository { pool }
    }

    /// Gets a line item by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<SlabLineItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM slab_line_items WHERE id = ?1");
        let item = sqlx::query_as::<_, SlabLineItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// All items of a sheet, ordered by serial number.
    pub async fn list_for_sheet(&self, sheet_id: &str) -> DbResult<Vec<SlabLineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM slab_line_items WHERE sheet_id = ?1 ORDER BY serial_number"
        );
        let items = sqlx::query_as::<_, SlabLineItem>(&sql)
            .bind(sheet_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Inserts one item at the end of the sheet.
    pub async fn insert(&self, sheet_id: &str, item: NewLineItem) -> DbResult<SlabLineItem> {
        let mut inserted = self.insert_batch(sheet_id, vec![item]).await?;
        inserted
            .pop()
            .ok_or_else(|| DbError::Internal("insert returned no row".to_string()))
    }

    /// Inserts `items` with consecutive serials in one transaction.
    ///
    /// Either every item is stored or none is. An empty batch is a no-op.
    ///
    /// ## Errors
    /// - `NotFound` if the sheet doesn't exist
    /// - `CustomerTypeLocked` if an item was computed for another type
    /// - `SequenceAllocationConflict` after [`MAX_ALLOCATION_ATTEMPTS`]
    pub async fn insert_batch(
        &self,
        sheet_id: &str,
        items: Vec<NewLineItem>,
    ) -> DbResult<Vec<SlabLineItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 1;
        loop {
            match self.try_insert_batch(sheet_id, &items).await {
                Err(err) if err.is_serial_collision() => {
                    if attempt >= MAX_ALLOCATION_ATTEMPTS {
                        warn!(sheet_id, attempt, "Serial allocation kept colliding, giving up");
                        return Err(DbError::SequenceAllocationConflict {
                            sheet_id: sheet_id.to_string(),
                        });
                    }
                    debug!(sheet_id, attempt, "Serial collision, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_insert_batch(
        &self,
        sheet_id: &str,
        items: &[NewLineItem],
    ) -> DbResult<Vec<SlabLineItem>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let locked = lock_sheet(&mut tx, sheet_id, now).await?;
        if let Some(item) = items.iter().find(|i| i.customer_type != locked) {
            debug!(sheet_id, requested = %item.customer_type, locked = %locked, "Customer type mismatch");
            return Err(DbError::CustomerTypeLocked {
                sheet_id: sheet_id.to_string(),
                locked: locked.to_string(),
            });
        }

        let first_serial = next_serial(&mut tx, sheet_id).await?;
        let mut stored = Vec::with_capacity(items.len());
        for (serial, item) in (first_serial..).zip(items) {
            let row = insert_row(&mut tx, sheet_id, serial, item, now).await?;
            stored.push(row);
        }
        freeze_customer_type(&mut tx, sheet_id, now).await?;

        let total = recompute_total_area(&mut tx, sheet_id).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sheet_id,
            count = stored.len(),
            first_serial,
            total_area = total,
            "Line items added"
        );
        Ok(stored)
    }

    /// Replaces the measured fields of an item; its serial stays.
    pub async fn update(&self, item_id: &str, item: NewLineItem) -> DbResult<SlabLineItem> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let (sheet_id, locked) = lock_sheet_of_item(&mut tx, item_id, now).await?;
        if item.customer_type != locked {
            return Err(DbError::CustomerTypeLocked {
                sheet_id,
                locked: locked.to_string(),
            });
        }

        let sql = format!(
            r#"
            UPDATE slab_line_items SET
                block_number = ?1,
                length = ?2,
                breadth = ?3,
                category = ?4,
                final_length = ?5,
                final_breadth = ?6,
                area = ?7,
                calculation_trail = ?8,
                updated_at = ?9
            WHERE id = ?10
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, SlabLineItem>(&sql)
            .bind(&item.block_number)
            .bind(item.length)
            .bind(item.breadth)
            .bind(item.category)
            .bind(item.final_length)
            .bind(item.final_breadth)
            .bind(item.area)
            .bind(&item.calculation_trail)
            .bind(now)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Line item", item_id))?;

        let total = recompute_total_area(&mut tx, &sheet_id).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            item_id,
            sheet_id = %sheet_id,
            serial_number = updated.serial_number,
            total_area = total,
            "Line item updated"
        );
        Ok(updated)
    }

    /// Deletes an item and returns it as it was stored.
    pub async fn delete(&self, item_id: &str, policy: RenumberPolicy) -> DbResult<SlabLineItem> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let (sheet_id, _) = lock_sheet_of_item(&mut tx, item_id, now).await?;

        let sql = format!("DELETE FROM slab_line_items WHERE id = ?1 RETURNING {ITEM_COLUMNS}");
        let deleted = sqlx::query_as::<_, SlabLineItem>(&sql)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Line item", item_id))?;

        let renumbered = match policy {
            RenumberPolicy::Compact => compact_serials(&mut tx, &sheet_id, now).await?,
            RenumberPolicy::KeepGaps => 0,
        };

        let total = recompute_total_area(&mut tx, &sheet_id).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            item_id,
            sheet_id = %sheet_id,
            serial_number = deleted.serial_number,
            renumbered,
            total_area = total,
            "Line item deleted"
        );
        Ok(deleted)
    }

    /// Closes serial gaps in a sheet so the items read `1..N` again.
    ///
    /// Relative order is preserved. Returns how many items moved.
    pub async fn renumber(&self, sheet_id: &str) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        lock_sheet(&mut tx, sheet_id, now).await?;
        let moved = compact_serials(&mut tx, sheet_id, now).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(sheet_id, moved, "Sheet renumbered");
        Ok(moved)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_row(
    conn: &mut SqliteConnection,
    sheet_id: &str,
    serial_number: i64,
    item: &NewLineItem,
    now: DateTime<Utc>,
) -> DbResult<SlabLineItem> {
    let row = SlabLineItem {
        id: Uuid::new_v4().to_string(),
        sheet_id: sheet_id.to_string(),
        serial_number,
        block_number: item.block_number.clone(),
        length: item.length,
        breadth: item.breadth,
        category: item.category,
        final_length: item.final_length,
        final_breadth: item.final_breadth,
        area: item.area,
        calculation_trail: item.calculation_trail.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO slab_line_items (
            id, sheet_id, serial_number, block_number, length, breadth,
            category, final_length, final_breadth, area, calculation_trail,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&row.id)
    .bind(&row.sheet_id)
    .bind(row.serial_number)
    .bind(&row.block_number)
    .bind(row.length)
    .bind(row.breadth)
    .bind(row.category)
    .bind(row.final_length)
    .bind(row.final_breadth)
    .bind(row.area)
    .bind(&row.calculation_trail)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(&mut *conn)
    .await?;

    debug!(sheet_id, serial_number, area = row.area, "Line item row inserted");
    Ok(row)
}

/// Reassigns serials `1..N` in ascending serial order.
///
/// Walking upwards, the target value `k` is never held by a row that has
/// not been visited yet, so the UNIQUE index is never tripped mid-way.
async fn compact_serials(
    conn: &mut SqliteConnection,
    sheet_id: &str,
    now: DateTime<Utc>,
) -> DbResult<u64> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT id, serial_number FROM slab_line_items WHERE sheet_id = ?1 ORDER BY serial_number",
    )
    .bind(sheet_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut moved = 0;
    for ((id, serial), target) in rows.into_iter().zip(1_i64..) {
        if serial == target {
            continue;
        }
        sqlx::query("UPDATE slab_line_items SET serial_number = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(target)
            .bind(now)
            .bind(&id)
            .execute(&mut *conn)
            .await?;
        moved += 1;
    }

    Ok(moved)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use granite_core::validation::validate_line_item;
    use granite_core::{strategy_for, LineItemInput, MeasurementSheet};

    async fn setup(customer_type: CustomerType) -> (Database, MeasurementSheet) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sheet = db.sheets().create("CUST-1", customer_type).await.unwrap();
        (db, sheet)
    }

    fn computed(customer_type: CustomerType, length: f64, breadth: f64) -> NewLineItem {
        let input = validate_line_item(&LineItemInput::new(length, breadth, SlabCategory::Polished))
            .unwrap();
        let result = strategy_for(customer_type).compute(length, breadth).unwrap();
        NewLineItem::from_calculation(input, &result)
    }

    async fn sheet_total(db: &Database, sheet_id: &str) -> f64 {
        db.sheets().find_by_id(sheet_id).await.unwrap().unwrap().total_area
    }

    #[tokio::test]
    async fn test_insert_allocates_from_one() {
        let (db, sheet) = setup(CustomerType::GraniteShops).await;
        let repo = db.line_items();

        let first = repo
            .insert(&sheet.id, computed(CustomerType::GraniteShops, 150.0, 146.0))
            .await
            .unwrap();
        let second = repo
            .insert(&sheet.id, computed(CustomerType::GraniteShops, 149.0, 145.0))
            .await
            .unwrap();

        assert_eq!(first.serial_number, 1);
        assert_eq!(second.serial_number, 2);
        assert_eq!(first.area, 147.0);
        assert_eq!(second.area, 141.0);
        assert_eq!(sheet_total(&db, &sheet.id).await, 288.0);
    }

    #[tokio::test]
    async fn test_batch_allocates_consecutive_serials() {
        let (db, sheet) = setup(CustomerType::Retail).await;
        let repo = db.line_items();
        repo.insert(&sheet.id, computed(CustomerType::Retail, 12.0, 12.0))
            .await
            .unwrap();

        let batch = vec![
            computed(CustomerType::Retail, 24.0, 12.0),
            computed(CustomerType::Retail, 36.0, 12.0),
            computed(CustomerType::Retail, 48.0, 12.0),
        ];
        let stored = repo.insert_batch(&sheet.id, batch).await.unwrap();

        let serials: Vec<i64> = stored.iter().map(|i| i.serial_number).collect();
        assert_eq!(serials, vec![2, 3, 4]);
        assert_eq!(sheet_total(&db, &sheet.id).await, 10.0);
    }

    #[tokio::test]
    async fn test_insert_into_missing_sheet_writes_nothing() {
        let (db, _) = setup(CustomerType::Retail).await;
        let err = db
            .line_items()
            .insert("missing", computed(CustomerType::Retail, 12.0, 12.0))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.sheets().statistics().await.unwrap().total_line_items, 0);
    }

    #[tokio::test]
    async fn test_customer_type_mismatch_is_rejected() {
        let (db, sheet) = setup(CustomerType::Builders).await;
        let err = db
            .line_items()
            .insert(&sheet.id, computed(CustomerType::Retail, 12.0, 12.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CustomerTypeLocked { .. }));
    }

    #[tokio::test]
    async fn test_customer_type_locked_after_first_item() {
        let (db, sheet) = setup(CustomerType::Builders).await;
        db.line_items()
            .insert(&sheet.id, computed(CustomerType::Builders, 150.0, 146.0))
            .await
            .unwrap();

        let err = db
            .sheets()
            .change_customer_type(&sheet.id, CustomerType::Retail)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CustomerTypeLocked { .. }));
    }

    #[tokio::test]
    async fn test_customer_type_stays_locked_after_items_are_deleted() {
        let (db, sheet) = setup(CustomerType::GraniteShops).await;
        let item = db
            .line_items()
            .insert(&sheet.id, computed(CustomerType::GraniteShops, 150.0, 146.0))
            .await
            .unwrap();
        db.line_items()
            .delete(&item.id, RenumberPolicy::Compact)
            .await
            .unwrap();
        assert!(db.line_items().list_for_sheet(&sheet.id).await.unwrap().is_empty());

        let err = db
            .sheets()
            .change_customer_type(&sheet.id, CustomerType::Retail)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CustomerTypeLocked { .. }));

        let stored = db.sheets().find_by_id(&sheet.id).await.unwrap().unwrap();
        assert_eq!(stored.customer_type, CustomerType::GraniteShops);
    }

    #[tokio::test]
    async fn test_update_keeps_serial_and_refreshes_total() {
        let (db, sheet) = setup(CustomerType::Exporters).await;
        let repo = db.line_items();
        let item = repo
            .insert(&sheet.id, computed(CustomerType::Exporters, 150.0, 146.0))
            .await
            .unwrap();
        assert_eq!(item.area, 147.0);

        let updated = repo
            .update(&item.id, computed(CustomerType::Exporters, 3.0, 2.0))
            .await
            .unwrap();

        assert_eq!(updated.serial_number, item.serial_number);
        assert_eq!(updated.area, 0.0);
        assert_eq!(sheet_total(&db, &sheet.id).await, 0.0);
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let (db, _) = setup(CustomerType::Retail).await;
        let err = db
            .line_items()
            .update("missing", computed(CustomerType::Retail, 1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_with_compaction() {
        let (db, sheet) = setup(CustomerType::Retail).await;
        let repo = db.line_items();
        let items = repo
            .insert_batch(
                &sheet.id,
                vec![
                    computed(CustomerType::Retail, 12.0, 12.0),
                    computed(CustomerType::Retail, 24.0, 12.0),
                    computed(CustomerType::Retail, 36.0, 12.0),
                ],
            )
            .await
            .unwrap();

        repo.delete(&items[0].id, RenumberPolicy::Compact)
            .await
            .unwrap();

        let remaining = repo.list_for_sheet(&sheet.id).await.unwrap();
        let serials: Vec<i64> = remaining.iter().map(|i| i.serial_number).collect();
        assert_eq!(serials, vec![1, 2]);
        assert_eq!(remaining[0].id, items[1].id);
        assert_eq!(sheet_total(&db, &sheet.id).await, 5.0);
    }

    #[tokio::test]
    async fn test_delete_keeping_gaps_then_renumber() {
        let (db, sheet) = setup(CustomerType::Retail).await;
        let repo = db.line_items();
        let items = repo
            .insert_batch(
                &sheet.id,
                vec![
                    computed(CustomerType::Retail, 12.0, 12.0),
                    computed(CustomerType::Retail, 12.0, 12.0),
                    computed(CustomerType::Retail, 12.0, 12.0),
                ],
            )
            .await
            .unwrap();

        repo.delete(&items[1].id, RenumberPolicy::KeepGaps)
            .await
            .unwrap();
        let next = repo
            .insert(&sheet.id, computed(CustomerType::Retail, 12.0, 12.0))
            .await
            .unwrap();
        assert_eq!(next.serial_number, 4);

        assert_eq!(repo.renumber(&sheet.id).await.unwrap(), 2);
        let serials: Vec<i64> = repo
            .list_for_sheet(&sheet.id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.serial_number)
            .collect();
        assert_eq!(serials, vec![1, 2, 3]);
        assert_eq!(sheet_total(&db, &sheet.id).await, 3.0);
    }

    #[tokio::test]
    async fn test_deleting_sheet_cascades_items() {
        let (db, sheet) = setup(CustomerType::Retail).await;
        let item = db
            .line_items()
            .insert(&sheet.id, computed(CustomerType::Retail, 12.0, 12.0))
            .await
            .unwrap();

        db.sheets().delete(&sheet.id).await.unwrap();
        assert!(db.line_items().find_by_id(&item.id).await.unwrap().is_none());
    }
}
