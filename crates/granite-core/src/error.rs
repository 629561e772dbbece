//! # Error Types
//!
//! Domain-specific error types for granite-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  granite-core errors (this file)                                       │
//! │  ├── CoreError         - Domain errors                                 │
//! │  ├── ValidationFailed  - Every violation found in one request          │
//! │  └── ValidationError   - A single field-level violation                │
//! │                                                                         │
//! │  granite-db errors (separate crate)                                    │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  measurement-service errors (app)                                      │
//! │  └── ServiceError      - What callers see (code + message)             │
//! │                                                                         │
//! │  Flow: ValidationError → ValidationFailed → CoreError → ServiceError   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every field-level error carries the field name and the offending value
//! 3. Errors are enum variants, never String
//! 4. Validation never short-circuits: callers get the full list at once

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Measurement logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// One or more inputs failed validation.
    ///
    /// Always recoverable by correcting input; never retried automatically.
    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    /// The customer-type token is not one of the five recognised values.
    ///
    /// ## When This Occurs
    /// - A caller bypassed validation with a hand-built token
    /// - A stored sheet carries a type this build does not know
    #[error("Unsupported customer type: '{token}'")]
    UnsupportedCustomerType { token: String },

    /// The computed area is not a usable number.
    ///
    /// Unreachable for validated input, but checked on every result.
    #[error("Calculation failed for {customer_type}: {reason}")]
    Calculation {
        customer_type: String,
        reason: String,
    },
}

impl CoreError {
    /// Creates an UnsupportedCustomerType error.
    pub fn unsupported(token: impl Into<String>) -> Self {
        CoreError::UnsupportedCustomerType {
            token: token.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A required field is missing.
    #[error("{field} is required")]
    Required { field: String },

    /// Value is not a finite number.
    #[error("{field} must be a number (got {value})")]
    NotNumeric { field: String, value: String },

    /// Value must be greater than zero.
    #[error("{field} must be greater than 0 (got {value})")]
    MustBePositive { field: String, value: String },

    /// Value exceeds the accepted maximum.
    #[error("{field} must not exceed {max} (got {value})")]
    TooLarge { field: String, value: String, max: String },

    /// Text value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value is not in allowed set.
    #[error("{field} '{value}' must be one of: {}", .allowed.join(", "))]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::MustBePositive { field, .. }
            | ValidationError::TooLarge { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }

    /// Same violation with `prefix` put in front of the field name, e.g.
    /// `items[2].length` for the third element of a batch.
    pub fn with_field_prefix(mut self, prefix: &str) -> Self {
        match &mut self {
            ValidationError::Required { field }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::MustBePositive { field, .. }
            | ValidationError::TooLarge { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::NotAllowed { field, .. } => {
                *field = format!("{prefix}{field}");
            }
        }
        self
    }
}

/// Every violation collected while validating one request.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("Validation failed: {}", messages(.violations))]
pub struct ValidationFailed {
    pub violations: Vec<ValidationError>,
}

impl ValidationFailed {
    /// Human-readable message per violation, in the order found.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Whether any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field() == field)
    }
}

fn messages(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
