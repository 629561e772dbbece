//! # Validation Module
//!
//! Input validation gate in front of the calculation strategies.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation (forms)                                         │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Presence, finiteness, 0 < x ≤ 10,000                              │
//! │  ├── Customer type and category tokens                                 │
//! │  └── Collects EVERY violation into one ValidationFailed                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE(sheet_id, serial_number)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use granite_core::validation::validate;
//!
//! assert!(validate(Some(150.0), Some(146.0), "granite_shops").is_ok());
//!
//! let failed = validate(None, Some(-4.0), "wholesale").unwrap_err();
//! assert_eq!(failed.violations.len(), 3);
//! ```

use crate::error::{ValidationError, ValidationFailed};
use crate::types::{CustomerType, LineItemInput, SlabCategory};
use crate::{MAX_BLOCK_NUMBER_LEN, MAX_DIMENSION};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationFailed>;

/// Dimensions and customer type that passed [`validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedInput {
    pub length: f64,
    pub breadth: f64,
    pub customer_type: CustomerType,
}

/// Line-item fields that passed [`validate_line_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLineItem {
    pub block_number: Option<String>,
    pub length: f64,
    pub breadth: f64,
    pub category: SlabCategory,
}

// =============================================================================
// Validators
// =============================================================================

/// Validates raw dimensions and a customer-type token.
///
/// ## Rules
/// - `length` and `breadth` present, finite, `> 0` and `≤ 10,000`
/// - `customer_type` one of the five recognised tokens
///
/// Violations are collected, not short-circuited.
pub fn validate(
    length: Option<f64>,
    breadth: Option<f64>,
    customer_type: &str,
) -> ValidationResult<ValidatedInput> {
    let mut violations = Vec::new();

    let length = check_dimension("length", length, &mut violations);
    let breadth = check_dimension("breadth", breadth, &mut violations);
    let customer_type = check_customer_type(customer_type, &mut violations);

    match (length, breadth, customer_type) {
        (Some(length), Some(breadth), Some(customer_type)) if violations.is_empty() => {
            Ok(ValidatedInput {
                length,
                breadth,
                customer_type,
            })
        }
        _ => Err(ValidationFailed { violations }),
    }
}

/// Validates the fields of a line item.
///
/// Adds category and block-number rules on top of the dimension rules.
pub fn validate_line_item(input: &LineItemInput) -> ValidationResult<ValidatedLineItem> {
    let mut violations = Vec::new();

    let length = check_dimension("length", input.length, &mut violations);
    let breadth = check_dimension("breadth", input.breadth, &mut violations);

    let category = match input.category.as_deref() {
        None => {
            violations.push(ValidationError::Required {
                field: "category".to_string(),
            });
            None
        }
        Some(token) => {
            let parsed = SlabCategory::parse(token);
            if parsed.is_none() {
                violations.push(ValidationError::NotAllowed {
                    field: "category".to_string(),
                    value: token.to_string(),
                    allowed: SlabCategory::tokens(),
                });
            }
            parsed
        }
    };

    let block_number = input
        .block_number
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    if let Some(ref block) = block_number {
        if block.chars().count() > MAX_BLOCK_NUMBER_LEN {
            violations.push(ValidationError::TooLong {
                field: "block_number".to_string(),
                max: MAX_BLOCK_NUMBER_LEN,
            });
        }
    }

    match (length, breadth, category) {
        (Some(length), Some(breadth), Some(category)) if violations.is_empty() => {
            Ok(ValidatedLineItem {
                block_number,
                length,
                breadth,
                category,
            })
        }
        _ => Err(ValidationFailed { violations }),
    }
}

/// Validates a customer-type token on its own.
pub fn validate_customer_type(token: &str) -> ValidationResult<CustomerType> {
    let mut violations = Vec::new();
    match check_customer_type(token, &mut violations) {
        Some(t) => Ok(t),
        None => Err(ValidationFailed { violations }),
    }
}

// =============================================================================
// Field Checks
// =============================================================================

fn check_dimension(
    field: &str,
    value: Option<f64>,
    violations: &mut Vec<ValidationError>,
) -> Option<f64> {
    let Some(value) = value else {
        violations.push(ValidationError::Required {
            field: field.to_string(),
        });
        return None;
    };

    if !value.is_finite() {
        violations.push(ValidationError::NotNumeric {
            field: field.to_string(),
            value: value.to_string(),
        });
        return None;
    }

    if value <= 0.0 {
        violations.push(ValidationError::MustBePositive {
            field: field.to_string(),
            value: value.to_string(),
        });
        return None;
    }

    if value > MAX_DIMENSION {
        violations.push(ValidationError::TooLarge {
            field: field.to_string(),
            value: value.to_string(),
            max: MAX_DIMENSION.to_string(),
        });
        return None;
    }

    Some(value)
}

fn check_customer_type(token: &str, violations: &mut Vec<ValidationError>) -> Option<CustomerType> {
    if token.trim().is_empty() {
        violations.push(ValidationError::Required {
            field: "customer_type".to_string(),
        });
        return None;
    }

    match token.parse::<CustomerType>() {
        Ok(t) => Some(t),
        Err(_) => {
            violations.push(ValidationError::NotAllowed {
                field: "customer_type".to_string(),
                value: token.to_string(),
                allowed: CustomerType::tokens(),
            });
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        let v = validate(Some(150.0), Some(146.0), "builders").unwrap();
        assert_eq!(v.customer_type, CustomerType::Builders);
        assert!(validate(Some(10_000.0), Some(0.5), "retail").is_ok());
    }

    #[test]
    fn test_dimension_bounds() {
        assert!(validate(Some(0.0), Some(100.0), "retail").is_err());
        assert!(validate(Some(-1.0), Some(100.0), "retail").is_err());
        assert!(validate(Some(10_000.01), Some(100.0), "retail").is_err());
        assert!(validate(Some(f64::NAN), Some(100.0), "retail").is_err());
        assert!(validate(Some(f64::INFINITY), Some(100.0), "retail").is_err());
    }

    #[test]
    fn test_collects_every_violation() {
        let failed = validate(None, Some(0.0), "").unwrap_err();
        let fields: Vec<&str> = failed.violations.iter().map(|v| v.field()).collect();
        assert_eq!(fields, vec!["length", "breadth", "customer_type"]);
    }

    #[test]
    fn test_unknown_customer_type_lists_allowed() {
        let failed = validate(Some(1.0), Some(1.0), "unknown").unwrap_err();
        match &failed.violations[0] {
            ValidationError::NotAllowed { allowed, .. } => assert_eq!(allowed.len(), 5),
            other => panic!("unexpected violation: {other:?}"),
        }
    }

    #[test]
    fn test_line_item_rules() {
        let ok = validate_line_item(&LineItemInput::new(120.0, 60.0, SlabCategory::Flamed)
            .with_block_number("  B-17 "))
        .unwrap();
        assert_eq!(ok.block_number.as_deref(), Some("B-17"));
        assert_eq!(ok.category, SlabCategory::Flamed);

        let bad = LineItemInput {
            block_number: Some("X".repeat(60)),
            length: None,
            breadth: Some(20_000.0),
            category: Some("glossy".to_string()),
        };
        let failed = validate_line_item(&bad).unwrap_err();
        assert_eq!(failed.violations.len(), 4);
        assert!(failed.has_field("block_number"));
        assert!(failed.has_field("category"));
    }

    #[test]
    fn test_blank_block_number_is_absent() {
        let mut input = LineItemInput::new(12.0, 12.0, SlabCategory::Honed);
        input.block_number = Some("   ".to_string());
        assert_eq!(validate_line_item(&input).unwrap().block_number, None);
    }
}
