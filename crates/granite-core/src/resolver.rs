//! # Strategy Resolver
//!
//! Maps a customer-type token to its [`CalculationStrategy`]. Pure lookup
//! over statically registered strategies; no I/O, no allocation.

use crate::error::CoreResult;
use crate::strategy::{
    BuildersStrategy, CalculationStrategy, ExportersStrategy, GraniteShopsStrategy,
    OutstationPartiesStrategy, RetailStrategy,
};
use crate::types::CustomerType;

static RETAIL: RetailStrategy = RetailStrategy;
static GRANITE_SHOPS: GraniteShopsStrategy = GraniteShopsStrategy;
static BUILDERS: BuildersStrategy = BuildersStrategy;
static EXPORTERS: ExportersStrategy = ExportersStrategy;
static OUTSTATION_PARTIES: OutstationPartiesStrategy = OutstationPartiesStrategy;

/// Strategy for an already-parsed customer type.
pub fn strategy_for(customer_type: CustomerType) -> &'static dyn CalculationStrategy {
    match customer_type {
        CustomerType::Retail => &RETAIL,
        CustomerType::GraniteShops => &GRANITE_SHOPS,
        CustomerType::Builders => &BUILDERS,
        CustomerType::Exporters => &EXPORTERS,
        CustomerType::OutstationParties => &OUTSTATION_PARTIES,
    }
}

/// Resolves a token such as `"granite_shops"`.
///
/// ## Errors
/// [`CoreError::UnsupportedCustomerType`](crate::CoreError::UnsupportedCustomerType)
/// when the token is not one of the five recognised values.
///
/// ## Example
/// ```rust
/// use granite_core::{resolve, CustomerType};
///
/// let strategy = resolve("builders").unwrap();
/// assert_eq!(strategy.customer_type(), CustomerType::Builders);
/// assert!(resolve("wholesale").is_err());
/// ```
pub fn resolve(token: &str) -> CoreResult<&'static dyn CalculationStrategy> {
    let customer_type: CustomerType = token.parse()?;
    Ok(strategy_for(customer_type))
}

/// Fixed one-sentence description of a customer type's rule.
pub fn describe_strategy(token: &str) -> CoreResult<&'static str> {
    resolve(token).map(|s| s.description())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn test_every_type_resolves_to_itself() {
        for t in CustomerType::ALL {
            assert_eq!(resolve(t.as_str()).unwrap().customer_type(), t);
        }
    }

    #[test]
    fn test_unknown_token() {
        let err = resolve("unknown").err().unwrap();
        assert_eq!(
            err,
            CoreError::UnsupportedCustomerType {
                token: "unknown".to_string()
            }
        );
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let mut seen: Vec<&str> = CustomerType::ALL
            .iter()
            .map(|t| describe_strategy(t.as_str()).unwrap())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }
}
