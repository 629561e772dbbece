//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── serial UNIQUE hit ──► SequenceAllocationConflict (retried)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (measurement-service) ← code + message                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - The owning sheet disappeared before a line item was inserted
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate sheet number (sequence was reset by hand)
    /// - Any UNIQUE index violation other than the serial index
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Line item referencing a non-existent sheet_id
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Two writers picked the same serial inside one sheet.
    ///
    /// ## When This Occurs
    /// - `UNIQUE(sheet_id, serial_number)` rejected an insert
    ///
    /// Line-item inserts retry this a bounded number of times before
    /// letting it escape.
    #[error("Serial allocation conflict on sheet {sheet_id}")]
    SequenceAllocationConflict { sheet_id: String },

    /// The sheet's customer type can no longer change.
    ///
    /// ## When This Occurs
    /// - Changing the type of a sheet that has ever had a line item
    /// - An item was computed for one type while the sheet holds another
    #[error("Customer type of sheet {sheet_id} is locked to {locked}")]
    CustomerTypeLocked { sheet_id: String, locked: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - CHECK constraint rejected a row
    /// - `database is locked` after the busy timeout
    /// - Runtime SQL error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a UNIQUE violation on the line-item serial index.
    pub(crate) fn is_serial_collision(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { field, .. } if field.contains("serial_number")
        )
    }

    /// Whether a retry of the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::SequenceAllocationConflict { .. } | DbError::PoolExhausted
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_collision_detection() {
        let err = DbError::duplicate(
            "slab_line_items.sheet_id, slab_line_items.serial_number",
            "unknown",
        );
        assert!(err.is_serial_collision());
        assert!(!DbError::duplicate("measurement_sheets.sheet_number", "MS-0001")
            .is_serial_collision());
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::SequenceAllocationConflict {
            sheet_id: "s".to_string()
        }
        .is_retryable());
        assert!(!DbError::not_found("Sheet", "s").is_retryable());
    }
}
