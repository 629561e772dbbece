//! # Domain Types
//!
//! Core domain types used throughout Granite Ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌─────────────────┐     │
//! │  │ MeasurementSheet │   │  SlabLineItem    │   │  CustomerType   │     │
//! │  │  ──────────────  │   │  ──────────────  │   │  ─────────────  │     │
//! │  │  id (UUID)       │◄──│  sheet_id (FK)   │   │  Retail         │     │
//! │  │  sheet_number    │   │  serial_number   │   │  GraniteShops   │     │
//! │  │  customer_type   │   │  length/breadth  │   │  Builders       │     │
//! │  │  total_area      │   │  final_* / area  │   │  Exporters      │     │
//! │  │  status          │   │  trail           │   │  Outstation...  │     │
//! │  └──────────────────┘   └──────────────────┘   └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (`sheet_number`, `serial_number`) - human-readable

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Customer Type
// =============================================================================

/// The five negotiated measurement conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    /// Walk-in buyers; measured as cut.
    Retail,
    /// Stone shops; length and breadth trimmed to multiples of 3.
    GraniteShops,
    /// Construction firms; only length trimmed.
    Builders,
    /// Export orders; flat deductions, no divisibility pass.
    Exporters,
    /// Out-of-town parties; same rule as granite shops.
    OutstationParties,
}

impl CustomerType {
    /// Every customer type, in display order.
    pub const ALL: [CustomerType; 5] = [
        CustomerType::Retail,
        CustomerType::GraniteShops,
        CustomerType::Builders,
        CustomerType::Exporters,
        CustomerType::OutstationParties,
    ];

    /// The wire/storage token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Retail => "retail",
            CustomerType::GraniteShops => "granite_shops",
            CustomerType::Builders => "builders",
            CustomerType::Exporters => "exporters",
            CustomerType::OutstationParties => "outstation_parties",
        }
    }

    /// All recognised tokens (for error messages).
    pub fn tokens() -> Vec<String> {
        Self::ALL.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        CustomerType::ALL
            .into_iter()
            .find(|t| t.as_str() == token)
            .ok_or_else(|| CoreError::unsupported(token))
    }
}

// =============================================================================
// Slab Category
// =============================================================================

/// Surface finish recorded on each line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SlabCategory {
    Polished,
    Honed,
    Flamed,
    Leathered,
}

impl SlabCategory {
    pub const ALL: [SlabCategory; 4] = [
        SlabCategory::Polished,
        SlabCategory::Honed,
        SlabCategory::Flamed,
        SlabCategory::Leathered,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SlabCategory::Polished => "polished",
            SlabCategory::Honed => "honed",
            SlabCategory::Flamed => "flamed",
            SlabCategory::Leathered => "leathered",
        }
    }

    /// Parses a category token, `None` when unrecognised.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        SlabCategory::ALL.into_iter().find(|c| c.as_str() == token)
    }

    pub fn tokens() -> Vec<String> {
        Self::ALL.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl Default for SlabCategory {
    fn default() -> Self {
        SlabCategory::Polished
    }
}

impl fmt::Display for SlabCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sheet Status
// =============================================================================

/// Lifecycle of a measurement sheet. Moves draft → completed only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    /// Operators are still measuring.
    Draft,
    /// Sheet handed over for billing.
    Completed,
}

impl SheetStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SheetStatus::Draft => "draft",
            SheetStatus::Completed => "completed",
        }
    }
}

impl Default for SheetStatus {
    fn default() -> Self {
        SheetStatus::Draft
    }
}

// =============================================================================
// Measurement Sheet
// =============================================================================

/// An ordered ledger of slab measurements for one customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MeasurementSheet {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-facing number, `MS-0001`.
    pub sheet_number: String,

    /// Reference into the external customer records.
    pub customer_id: String,

    /// Fixed once the first line item exists.
    pub customer_type: CustomerType,

    pub status: SheetStatus,

    /// Σ area of the current line items, square feet.
    pub total_area: f64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl MeasurementSheet {
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == SheetStatus::Completed
    }
}

/// Formats a sheet sequence value as `MS-%04d`.
///
/// ## Example
/// ```rust
/// use granite_core::format_sheet_number;
///
/// assert_eq!(format_sheet_number(7), "MS-0007");
/// assert_eq!(format_sheet_number(12345), "MS-12345");
/// ```
pub fn format_sheet_number(value: i64) -> String {
    format!("MS-{:04}", value)
}

// =============================================================================
// Slab Line Item
// =============================================================================

/// One measured slab on a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SlabLineItem {
    pub id: String,
    pub sheet_id: String,
    /// Dense 1..N within the sheet.
    pub serial_number: i64,
    pub block_number: Option<String>,
    /// Raw length as measured, inches.
    pub length: f64,
    /// Raw breadth as measured, inches.
    pub breadth: f64,
    pub category: SlabCategory,
    pub final_length: f64,
    pub final_breadth: f64,
    /// Billable area, square feet (2 dp).
    pub area: f64,
    /// Calculation steps joined with newlines.
    pub calculation_trail: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A sheet together with its line items, ordered by serial number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SheetWithItems {
    pub sheet: MeasurementSheet,
    pub items: Vec<SlabLineItem>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Raw line-item fields as an operator entered them.
///
/// Every field is optional so that validation can report all missing
/// values at once instead of failing on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemInput {
    pub block_number: Option<String>,
    pub length: Option<f64>,
    pub breadth: Option<f64>,
    pub category: Option<String>,
}

impl LineItemInput {
    /// Convenience constructor used by callers that already hold numbers.
    pub fn new(length: f64, breadth: f64, category: SlabCategory) -> Self {
        LineItemInput {
            block_number: None,
            length: Some(length),
            breadth: Some(breadth),
            category: Some(category.as_str().to_string()),
        }
    }

    pub fn with_block_number(mut self, block_number: impl Into<String>) -> Self {
        self.block_number = Some(block_number.into());
        self
    }
}

// =============================================================================
// Queries & Statistics
// =============================================================================

/// Filters for listing sheets. `Hash` feeds the listing cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SheetQuery {
    pub customer_id: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<SheetStatus>,
    /// Matches sheet numbers starting with this text, e.g. `MS-00`.
    pub sheet_number_prefix: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SheetQuery {
    fn default() -> Self {
        SheetQuery {
            customer_id: None,
            customer_type: None,
            status: None,
            sheet_number_prefix: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Aggregated figures across all sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SheetStatistics {
    pub total_sheets: i64,
    pub draft_sheets: i64,
    pub completed_sheets: i64,
    pub total_line_items: i64,
    pub total_area: f64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_type_round_trips_tokens() {
        for t in CustomerType::ALL {
            assert_eq!(t.as_str().parse::<CustomerType>().unwrap(), t);
        }
        assert!("wholesale".parse::<CustomerType>().is_err());
        assert_eq!(
            " builders ".parse::<CustomerType>().unwrap(),
            CustomerType::Builders
        );
    }

    #[test]
    fn test_customer_type_serde_matches_token() {
        let json = serde_json::to_string(&CustomerType::OutstationParties).unwrap();
        assert_eq!(json, "\"outstation_parties\"");
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(SlabCategory::parse("Honed"), Some(SlabCategory::Honed));
        assert_eq!(SlabCategory::parse("glossy"), None);
    }

    #[test]
    fn test_sheet_status_default() {
        assert_eq!(SheetStatus::default(), SheetStatus::Draft);
    }

    #[test]
    fn test_format_sheet_number() {
        assert_eq!(format_sheet_number(1), "MS-0001");
        assert_eq!(format_sheet_number(9999), "MS-9999");
    }
}
