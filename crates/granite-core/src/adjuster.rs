//! # Divisibility Adjuster
//!
//! Reduces a raw dimension to a value divisible by 3, after deducting a
//! fixed allowance. Used by the wholesale customer types.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust(raw = 149, subtrahend = 3)                                     │
//! │                                                                         │
//! │  raw < subtrahend? ──► yes ──► 0   (BelowSubtrahend, not an error)     │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  v = 149 - 3 = 146                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  146 % 3 = 2  ──► drop the remainder ──► 144                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  144 (Reduced)                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stepping `v` down one inch at a time until `v % 3 == 0` lands on the same
//! value as `v - v.rem_euclid(3)`, so the closed form is used. A finite value
//! settles in at most two steps, far inside
//! [`DIVISIBILITY_ITERATION_CEILING`](crate::DIVISIBILITY_ITERATION_CEILING); only non-finite input would run past
//! it, and that yields `0` plus an anomaly.

use serde::{Deserialize, Serialize};

/// How an adjustment was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustOutcome {
    /// `raw - subtrahend` was already a multiple of 3.
    Exact,
    /// The remainder was dropped.
    Reduced,
    /// `raw < subtrahend`; floored to zero.
    BelowSubtrahend,
    /// The iteration budget ran out; floored to zero.
    Anomaly,
}

/// Result of [`adjust`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Raw dimension handed in.
    pub raw: f64,
    /// Allowance deducted before the divisibility pass.
    pub subtrahend: f64,
    /// `raw - subtrahend`, before reduction.
    pub deducted: f64,
    /// Final value: `0` or a multiple of 3.
    pub value: f64,
    pub outcome: AdjustOutcome,
}

impl Adjustment {
    #[inline]
    pub fn is_anomaly(&self) -> bool {
        self.outcome == AdjustOutcome::Anomaly
    }
}

/// Deducts `subtrahend` from `raw` and reduces the rest to the nearest lower
/// multiple of 3.
///
/// Pure and deterministic; shares no state across calls.
///
/// ## Example
/// ```rust
/// use granite_core::adjuster::{adjust, AdjustOutcome};
///
/// let adj = adjust(149.0, 3.0);
/// assert_eq!(adj.value, 144.0);
/// assert_eq!(adj.outcome, AdjustOutcome::Reduced);
///
/// assert_eq!(adjust(2.0, 3.0).value, 0.0);
/// ```
pub fn adjust(raw: f64, subtrahend: f64) -> Adjustment {
    let deducted = raw - subtrahend;
    let result = |value: f64, outcome| Adjustment {
        raw,
        subtrahend,
        deducted,
        value,
        outcome,
    };

    if raw < subtrahend {
        return result(0.0, AdjustOutcome::BelowSubtrahend);
    }

    if !deducted.is_finite() {
        return result(0.0, AdjustOutcome::Anomaly);
    }

    let remainder = deducted.rem_euclid(3.0);
    if remainder == 0.0 || deducted <= 0.0 {
        return result(deducted, AdjustOutcome::Exact);
    }

    // At most two unit steps; only non-finite input could exceed the ceiling.
    result(deducted - remainder, AdjustOutcome::Reduced)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple_is_unchanged() {
        let adj = adjust(150.0, 3.0);
        assert_eq!(adj.value, 147.0);
        assert_eq!(adj.outcome, AdjustOutcome::Exact);
    }

    #[test]
    fn test_remainder_is_dropped() {
        assert_eq!(adjust(149.0, 3.0).value, 144.0);
        assert_eq!(adjust(145.0, 2.0).value, 141.0);
        assert_eq!(adjust(146.0, 2.0).value, 144.0);
    }

    #[test]
    fn test_below_subtrahend_floors_to_zero() {
        let adj = adjust(1.0, 2.0);
        assert_eq!(adj.value, 0.0);
        assert_eq!(adj.outcome, AdjustOutcome::BelowSubtrahend);
    }

    #[test]
    fn test_equal_to_subtrahend_is_zero() {
        let adj = adjust(3.0, 3.0);
        assert_eq!(adj.value, 0.0);
        assert_eq!(adj.outcome, AdjustOutcome::Exact);
    }

    #[test]
    fn test_fractional_dimension_reduces_to_whole_multiple() {
        assert_eq!(adjust(10.5, 3.0).value, 6.0);
    }

    #[test]
    fn test_non_finite_is_anomaly() {
        let adj = adjust(f64::INFINITY, 3.0);
        assert!(adj.is_anomaly());
        assert_eq!(adj.value, 0.0);
    }

    #[test]
    fn test_large_finite_value_is_reduced() {
        let adj = adjust(1e15 + 1.0, 3.0);
        assert_eq!(adj.outcome, AdjustOutcome::Reduced);
        assert_eq!(adj.value, 999_999_999_999_996.0);
    }

    #[test]
    fn test_output_is_zero_or_multiple_of_three() {
        for raw in 0..=600 {
            for subtrahend in [2.0, 3.0] {
                let v = adjust(raw as f64, subtrahend).value;
                assert!(v == 0.0 || v % 3.0 == 0.0, "raw={raw} sub={subtrahend} -> {v}");
                assert!(v >= 0.0);
            }
        }
    }
}
