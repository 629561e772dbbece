//! # Calculation Strategies
//!
//! One strategy per customer type. Each turns validated raw dimensions into
//! final dimensions, a billed area and an audit trail.
//!
//! ## Rules
//! ```text
//! ┌────────────────────┬──────────────┬──────────────┬─────────────────────┐
//! │ Customer type      │ Length       │ Breadth      │ Area                │
//! ├────────────────────┼──────────────┼──────────────┼─────────────────────┤
//! │ Retail             │ L            │ B            │ L×B/144             │
//! │ GraniteShops       │ adjust(L,3)  │ adjust(B,2)  │ fL×fB/144           │
//! │ Builders           │ adjust(L,3)  │ B            │ fL×B/144            │
//! │ Exporters          │ max(L-3,0)   │ max(B-2,0)   │ fL×fB/144           │
//! │ OutstationParties  │ = GraniteShops                                    │
//! └────────────────────┴──────────────┴──────────────┴─────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::adjuster::{adjust, AdjustOutcome, Adjustment};
use crate::area::{billed_area, format_dimension};
use crate::error::{CoreError, CoreResult};
use crate::types::CustomerType;

const LENGTH_ALLOWANCE: f64 = 3.0;
const BREADTH_ALLOWANCE: f64 = 2.0;

// =============================================================================
// Result Types
// =============================================================================

/// The divisibility adjuster ran out of budget for a dimension.
///
/// Logged by callers and treated as a zero dimension, never as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComputationAnomaly {
    pub field: String,
    pub value: f64,
    pub reason: String,
}

/// Output of one calculation. Never cached: the same slab can be
/// re-measured before it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculationResult {
    pub customer_type: CustomerType,
    pub final_length: f64,
    pub final_breadth: f64,
    /// Square feet, rounded half-up to 2 dp.
    pub area: f64,
    /// Ordered, human-readable justification of the area.
    pub calculation_steps: Vec<String>,
    /// Canonical formula, e.g. `(150 × 146) ÷ 144`.
    pub raw_calculation: String,
    pub anomalies: Vec<ComputationAnomaly>,
}

impl CalculationResult {
    /// The steps joined into the trail stored on a line item.
    pub fn trail(&self) -> String {
        self.calculation_steps.join("\n")
    }
}

// =============================================================================
// Strategy Trait
// =============================================================================

/// Computes the billed area for one customer type.
///
/// Implementations assume their inputs already passed
/// [`validate`](crate::validation::validate).
pub trait CalculationStrategy: Send + Sync {
    fn customer_type(&self) -> CustomerType;

    /// One sentence for UI display.
    fn description(&self) -> &'static str;

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult>;
}

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct RetailStrategy;

impl CalculationStrategy for RetailStrategy {
    fn customer_type(&self) -> CustomerType {
        CustomerType::Retail
    }

    fn description(&self) -> &'static str {
        "Retail: area is length × breadth ÷ 144 with no adjustment."
    }

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult> {
        let mut trail = Trail::new(length, breadth);
        trail.push(format!("Length: {} (unchanged)", format_dimension(length)));
        trail.push(format!("Breadth: {} (unchanged)", format_dimension(breadth)));
        let raw = format!(
            "({} × {}) ÷ 144",
            format_dimension(length),
            format_dimension(breadth)
        );
        trail.finish(self.customer_type(), length, breadth, raw)
    }
}

/// Length less 3 and breadth less 2, both reduced to multiples of 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraniteShopsStrategy;

impl GraniteShopsStrategy {
    fn compute_as(
        customer_type: CustomerType,
        length: f64,
        breadth: f64,
    ) -> CoreResult<CalculationResult> {
        let mut trail = Trail::new(length, breadth);
        let final_length = trail.adjusted("length", adjust(length, LENGTH_ALLOWANCE));
        let final_breadth = trail.adjusted("breadth", adjust(breadth, BREADTH_ALLOWANCE));
        let raw = format!(
            "({} × {}) ÷ 144 (adjusted for divisibility by 3)",
            format_dimension(length),
            format_dimension(breadth)
        );
        trail.finish(customer_type, final_length, final_breadth, raw)
    }
}

impl CalculationStrategy for GraniteShopsStrategy {
    fn customer_type(&self) -> CustomerType {
        CustomerType::GraniteShops
    }

    fn description(&self) -> &'static str {
        "Granite shops: length less 3 and breadth less 2, each reduced to a multiple of 3."
    }

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult> {
        Self::compute_as(self.customer_type(), length, breadth)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildersStrategy;

impl CalculationStrategy for BuildersStrategy {
    fn customer_type(&self) -> CustomerType {
        CustomerType::Builders
    }

    fn description(&self) -> &'static str {
        "Builders: length less 3 reduced to a multiple of 3; breadth unchanged."
    }

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult> {
        let mut trail = Trail::new(length, breadth);
        let final_length = trail.adjusted("length", adjust(length, LENGTH_ALLOWANCE));
        trail.push(format!("Breadth: {} (unchanged)", format_dimension(breadth)));
        let raw = format!(
            "({} × {}) ÷ 144 (length adjusted for divisibility by 3)",
            format_dimension(length),
            format_dimension(breadth)
        );
        trail.finish(self.customer_type(), final_length, breadth, raw)
    }
}

/// Flat deductions only; no divisibility pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportersStrategy;

impl CalculationStrategy for ExportersStrategy {
    fn customer_type(&self) -> CustomerType {
        CustomerType::Exporters
    }

    fn description(&self) -> &'static str {
        "Exporters: length less 3 and breadth less 2, never below zero, with no divisibility rule."
    }

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult> {
        let mut trail = Trail::new(length, breadth);
        let final_length = trail.deducted("Length", length, LENGTH_ALLOWANCE);
        let final_breadth = trail.deducted("Breadth", breadth, BREADTH_ALLOWANCE);
        let raw = format!(
            "({} × {}) ÷ 144 (length - 3, breadth - 2)",
            format_dimension(length),
            format_dimension(breadth)
        );
        trail.finish(self.customer_type(), final_length, final_breadth, raw)
    }
}

/// Same rule as [`GraniteShopsStrategy`], reported under its own type.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutstationPartiesStrategy;

impl CalculationStrategy for OutstationPartiesStrategy {
    fn customer_type(&self) -> CustomerType {
        CustomerType::OutstationParties
    }

    fn description(&self) -> &'static str {
        "Outstation parties: same as granite shops, length less 3 and breadth less 2 reduced to multiples of 3."
    }

    fn compute(&self, length: f64, breadth: f64) -> CoreResult<CalculationResult> {
        GraniteShopsStrategy::compute_as(self.customer_type(), length, breadth)
    }
}

// =============================================================================
// Trail Builder
// =============================================================================

struct Trail {
    steps: Vec<String>,
    anomalies: Vec<ComputationAnomaly>,
}

impl Trail {
    fn new(length: f64, breadth: f64) -> Self {
        Trail {
            steps: vec![format!(
                "Original dimensions: {} × {}",
                format_dimension(length),
                format_dimension(breadth)
            )],
            anomalies: Vec::new(),
        }
    }

    fn push(&mut self, step: String) {
        self.steps.push(step);
    }

    /// Records an adjuster result and returns the final value.
    fn adjusted(&mut self, field: &str, adj: Adjustment) -> f64 {
        let label = capitalize(field);
        let raw = format_dimension(adj.raw);
        let sub = format_dimension(adj.subtrahend);
        let value = format_dimension(adj.value);
        let step = match adj.outcome {
            AdjustOutcome::Exact => format!(
                "{label}: {raw} - {sub} = {value} (divisible by 3)"
            ),
            AdjustOutcome::Reduced => format!(
                "{label}: {raw} - {sub} = {}, reduced to {value} (divisible by 3)",
                format_dimension(adj.deducted)
            ),
            AdjustOutcome::BelowSubtrahend => format!(
                "{label}: {raw} is less than {sub}, set to 0"
            ),
            AdjustOutcome::Anomaly => {
                self.anomalies.push(ComputationAnomaly {
                    field: field.to_string(),
                    value: adj.raw,
                    reason: "divisibility adjustment did not converge".to_string(),
                });
                format!("{label}: {raw} could not be adjusted, set to 0")
            }
        };
        self.steps.push(step);
        adj.value
    }

    /// Records a flat deduction floored at zero and returns the final value.
    fn deducted(&mut self, label: &str, raw: f64, allowance: f64) -> f64 {
        let value = (raw - allowance).max(0.0);
        self.steps.push(format!(
            "{label}: {} - {} = {}",
            format_dimension(raw),
            format_dimension(allowance),
            format_dimension(value)
        ));
        value
    }

    fn finish(
        mut self,
        customer_type: CustomerType,
        final_length: f64,
        final_breadth: f64,
        raw_calculation: String,
    ) -> CoreResult<CalculationResult> {
        let area = billed_area(final_length, final_breadth);
        if !area.is_finite() || area < 0.0 {
            return Err(CoreError::Calculation {
                customer_type: customer_type.to_string(),
                reason: format!("area {area} is not a non-negative finite number"),
            });
        }

        self.steps.push(format!(
            "Area: ({} × {}) ÷ 144 = {:.2} sq ft",
            format_dimension(final_length),
            format_dimension(final_breadth),
            area
        ));

        Ok(CalculationResult {
            customer_type,
            final_length,
            final_breadth,
            area,
            calculation_steps: self.steps,
            raw_calculation,
            anomalies: self.anomalies,
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::round_half_up;

    const SAMPLES: [(f64, f64); 8] = [
        (144.0, 144.0),
        (150.0, 146.0),
        (149.0, 145.0),
        (3.0, 2.0),
        (1.0, 1.0),
        (97.5, 63.25),
        (10_000.0, 10_000.0),
        (4.0, 7.0),
    ];

    #[test]
    fn test_retail_area_is_plain_formula() {
        for (l, b) in SAMPLES {
            let r = RetailStrategy.compute(l, b).unwrap();
            assert_eq!(r.area, round_half_up(l * b / 144.0, 2));
            assert_eq!((r.final_length, r.final_breadth), (l, b));
        }
    }

    #[test]
    fn test_outstation_matches_granite_shops() {
        for (l, b) in SAMPLES {
            let g = GraniteShopsStrategy.compute(l, b).unwrap();
            let o = OutstationPartiesStrategy.compute(l, b).unwrap();
            assert_eq!(
                (g.final_length, g.final_breadth, g.area),
                (o.final_length, o.final_breadth, o.area)
            );
            assert_eq!(o.customer_type, CustomerType::OutstationParties);
        }
    }

    #[test]
    fn test_builders_keeps_breadth() {
        for (l, b) in SAMPLES {
            let r = BuildersStrategy.compute(l, b).unwrap();
            assert_eq!(r.final_breadth, b);
            assert!(r.final_length == 0.0 || r.final_length % 3.0 == 0.0);
        }
    }

    #[test]
    fn test_exporters_skip_divisibility() {
        for (l, b) in SAMPLES {
            let r = ExportersStrategy.compute(l, b).unwrap();
            assert_eq!(r.final_length, (l - 3.0).max(0.0));
            assert_eq!(r.final_breadth, (b - 2.0).max(0.0));
        }
        let r = ExportersStrategy.compute(152.0, 100.0).unwrap();
        assert_eq!(r.final_length, 149.0);
    }

    #[test]
    fn test_granite_shops_trail() {
        let r = GraniteShopsStrategy.compute(149.0, 145.0).unwrap();
        assert_eq!(
            r.calculation_steps,
            vec![
                "Original dimensions: 149 × 145".to_string(),
                "Length: 149 - 3 = 146, reduced to 144 (divisible by 3)".to_string(),
                "Breadth: 145 - 2 = 143, reduced to 141 (divisible by 3)".to_string(),
                "Area: (144 × 141) ÷ 144 = 141.00 sq ft".to_string(),
            ]
        );
        assert_eq!(
            r.raw_calculation,
            "(149 × 145) ÷ 144 (adjusted for divisibility by 3)"
        );
        assert!(r.anomalies.is_empty());
    }

    #[test]
    fn test_small_granite_slab_floors_to_zero() {
        let r = GraniteShopsStrategy.compute(2.0, 1.0).unwrap();
        assert_eq!((r.final_length, r.final_breadth, r.area), (0.0, 0.0, 0.0));
        assert!(r.calculation_steps[1].contains("less than 3"));
    }

    #[test]
    fn test_anomaly_is_reported_not_raised() {
        let r = GraniteShopsStrategy.compute(f64::NAN, 100.0).unwrap();
        assert_eq!(r.final_length, 0.0);
        assert_eq!(r.area, 0.0);
        assert_eq!(r.anomalies.len(), 1);
        assert_eq!(r.anomalies[0].field, "length");
    }

    #[test]
    fn test_negative_area_is_rejected() {
        let err = RetailStrategy.compute(-12.0, 12.0).unwrap_err();
        assert!(matches!(err, CoreError::Calculation { .. }));
    }
}
