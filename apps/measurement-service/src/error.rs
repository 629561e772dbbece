//! # Service Error Type
//!
//! Unified error type for every `MeasurementService` operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Granite Ledger                         │
//! │                                                                         │
//! │  CoreError::Validation ─────────────► VALIDATION_ERROR (+ violations)  │
//! │  CoreError::UnsupportedCustomerType ► UNSUPPORTED_CUSTOMER_TYPE        │
//! │  DbError::NotFound ─────────────────► NOT_FOUND                        │
//! │  DbError::SequenceAllocationConflict                                   │
//! │  DbError::CustomerTypeLocked ───────► CONFLICT                         │
//! │  DbError::UniqueViolation                                              │
//! │  other DbError ─────────────────────► DATABASE_ERROR (details logged)  │
//! │  CoreError::Calculation ────────────► INTERNAL (details logged)        │
//! │                                                                         │
//! │  Cache errors never get here: the coordinator absorbs them.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation failed: length is required",
//!   "violations": [{ "kind": "required", "field": "length" }]
//! }
//! ```

use granite_core::{CoreError, ValidationError, ValidationFailed};
use granite_db::DbError;
use serde::Serialize;

/// Error returned from service operations.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Field-level details for `VALIDATION_ERROR`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ValidationError>,
}

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Customer type token not recognised
    UnsupportedCustomerType,

    /// Sheet or line item not found
    NotFound,

    /// Concurrent write or locked state; retrying may succeed
    Conflict,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ValidationFailed> for ServiceError {
    fn from(failed: ValidationFailed) -> Self {
        ServiceError {
            code: ErrorCode::ValidationError,
            message: failed.to_string(),
            violations: failed.violations,
        }
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(failed) => failed.into(),
            CoreError::UnsupportedCustomerType { .. } => {
                ServiceError::new(ErrorCode::UnsupportedCustomerType, err.to_string())
            }
            CoreError::Calculation { .. } => {
                tracing::error!("Calculation failed: {}", err);
                ServiceError::internal("Area calculation failed")
            }
        }
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ServiceError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::SequenceAllocationConflict { sheet_id } => ServiceError::new(
                ErrorCode::Conflict,
                format!("Could not allocate a serial number on sheet {}, try again", sheet_id),
            ),
            DbError::CustomerTypeLocked { sheet_id, locked } => ServiceError::new(
                ErrorCode::Conflict,
                format!(
                    "Sheet {} has had line items; its customer type stays {}",
                    sheet_id, locked
                ),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}
