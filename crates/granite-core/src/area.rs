//! # Area Module
//!
//! Square-footage arithmetic shared by every calculation strategy.
//!
//! ## Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Slabs are measured in inches and billed in square feet:               │
//! │                                                                         │
//! │    area_sq_ft = (length_in × breadth_in) ÷ 144                         │
//! │                                                                         │
//! │  Billed areas are rounded half-up to 2 decimal places. Sheet totals    │
//! │  are re-summed from the rounded line areas, never accumulated.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::SQUARE_INCHES_PER_SQUARE_FOOT;

/// Decimal places kept on billed areas.
pub const AREA_DECIMALS: i32 = 2;

/// Unrounded square feet for dimensions given in inches.
#[inline]
pub fn square_feet(length: f64, breadth: f64) -> f64 {
    length * breadth / SQUARE_INCHES_PER_SQUARE_FOOT
}

/// Rounds half-up to `decimals` places.
///
/// `f64::round` rounds half away from zero, which is half-up for the
/// non-negative values areas take. A small epsilon absorbs binary
/// representation error so that `1.005` rounds to `1.01`.
///
/// ## Example
/// ```rust
/// use granite_core::area::round_half_up;
///
/// assert_eq!(round_half_up(102.083333, 2), 102.08);
/// assert_eq!(round_half_up(1.005, 2), 1.01);
/// assert_eq!(round_half_up(0.125, 2), 0.13);
/// ```
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let nudged = scaled + scaled.signum() * f64::EPSILON * scaled.abs().max(1.0) * 4.0;
    nudged.round() / factor
}

/// Billed area: square feet rounded to [`AREA_DECIMALS`].
#[inline]
pub fn billed_area(length: f64, breadth: f64) -> f64 {
    round_half_up(square_feet(length, breadth), AREA_DECIMALS)
}

/// Sums already-rounded line areas and rounds the total again, so the
/// result carries no binary drift beyond 2 decimals.
pub fn sum_areas<I>(areas: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    round_half_up(areas.into_iter().sum(), AREA_DECIMALS)
}

/// Formats a dimension without a trailing `.0` for whole inches.
pub fn format_dimension(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
