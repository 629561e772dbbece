//! # granite-core: Pure Measurement Logic for Granite Ledger
//!
//! This crate computes billable square footage for granite slabs. It contains
//! the dimension-adjustment rules for every customer type as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Granite Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                measurement-service (facade)                     │   │
//! │  │   calculate, create_sheet, add_line_item, update_line_item ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ granite-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ adjuster  │  │ strategy  │  │ resolver  │  │ validation│  │   │
//! │  │   │ multiple  │  │  5 rules  │  │ token →   │  │  collect  │  │   │
//! │  │   │   of 3    │  │  → area   │  │ strategy  │  │ all errs  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CACHE • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        granite-db (SQLite)          granite-cache (Redis)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MeasurementSheet, SlabLineItem, CustomerType, ...)
//! - [`area`] - Square-footage arithmetic and half-up rounding
//! - [`adjuster`] - Multiple-of-3 dimension reduction
//! - [`strategy`] - One calculation strategy per customer type
//! - [`resolver`] - Customer-type token → strategy lookup
//! - [`validation`] - Input validation that collects every violation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use granite_core::calculate;
//!
//! let result = calculate(150.0, 146.0, "granite_shops").unwrap();
//! assert_eq!(result.final_length, 147.0);
//! assert_eq!(result.final_breadth, 144.0);
//! assert_eq!(result.area, 147.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjuster;
pub mod area;
pub mod error;
pub mod resolver;
pub mod strategy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use adjuster::{adjust, AdjustOutcome, Adjustment};
pub use error::{CoreError, CoreResult, ValidationError, ValidationFailed};
pub use resolver::{describe_strategy, resolve, strategy_for};
pub use strategy::{CalculationResult, CalculationStrategy, ComputationAnomaly};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest accepted raw dimension, in inches.
///
/// ## Business Reason
/// Catches typos such as an extra zero before they reach a sheet.
pub const MAX_DIMENSION: f64 = 10_000.0;

/// Square inches in one square foot.
pub const SQUARE_INCHES_PER_SQUARE_FOOT: f64 = 144.0;

/// Maximum unit decrements the divisibility adjuster may take before it
/// gives up and reports a computation anomaly.
pub const DIVISIBILITY_ITERATION_CEILING: u32 = 100;

/// Maximum length of a block number written on a line item.
pub const MAX_BLOCK_NUMBER_LEN: usize = 50;

// =============================================================================
// Entry Point
// =============================================================================

/// Validates the raw input, resolves the strategy for `customer_type` and
/// computes the billable area.
///
/// ## Errors
/// - [`CoreError::Validation`] with every violation when any input is bad
/// - [`CoreError::Calculation`] when the area comes out non-finite or negative
pub fn calculate(length: f64, breadth: f64, customer_type: &str) -> CoreResult<CalculationResult> {
    let input = validation::validate(Some(length), Some(breadth), customer_type)?;
    strategy_for(input.customer_type).compute(input.length, input.breadth)
}

// =============================================================================
// Unit Tests
// =============================================================================
