//! # Aggregate Maintenance
//!
//! Keeps `measurement_sheets.total_area` equal to the sum of the sheet's
//! current line-item areas.
//!
//! ```text
//! BEGIN
//!   lock sheet row
//!   INSERT / UPDATE / DELETE slab_line_items
//!   recompute_total_area   ◄── same transaction, full SUM every time
//! COMMIT
//! ```
//!
//! The total is always rebuilt from the rows, never adjusted by a delta, so
//! rounding drift cannot accumulate across edits.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Recomputes and stores the total area of `sheet_id`; returns the new total.
pub async fn recompute_total_area(conn: &mut SqliteConnection, sheet_id: &str) -> DbResult<f64> {
    let total: Option<f64> = sqlx::query_scalar(
        r#"
        UPDATE measurement_sheets
        SET total_area = (
            SELECT CAST(ROUND(COALESCE(SUM(area), 0.0), 2) AS REAL)
            FROM slab_line_items
            WHERE sheet_id = ?1
        )
        WHERE id = ?1
        RETURNING total_area
        "#,
    )
    .bind(sheet_id)
    .fetch_optional(&mut *conn)
    .await?;

    let total = total.ok_or_else(|| DbError::not_found("Sheet", sheet_id))?;
    debug!(sheet_id, total_area = total, "Sheet total recomputed");
    Ok(total)
}
