//! Cost model — slippage and commission from a `MarketSpec`.
//!
//! Slippage is a fixed price offset against the trader on both legs.
//! Commission is a rate on fill notional, or a flat amount per contract
//! when the market defines one. Entry and exit are costed the same way.

use crate::domain::{Direction, MarketSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    pub slippage: f64,
    pub commission_rate: f64,
    pub commission_per_contract: Option<f64>,
}

impl CostModel {
    pub fn from_spec(spec: &MarketSpec) -> Self {
        Self {
            slippage: spec.slippage_ticks.max(0.0),
            commission_rate: spec.commission_rate,
            commission_per_contract: spec.commission_per_contract,
        }
    }

    /// Fill price when opening `direction`, and the slippage cost in currency.
    pub fn entry_fill(&self, direction: Direction, price: f64, quantity: f64) -> (f64, f64) {
        (direction.adverse_entry(price, self.slippage), self.slippage * quantity.abs())
    }

    /// Fill price when closing `direction`, and the slippage cost in currency.
    pub fn exit_fill(&self, direction: Direction, price: f64, quantity: f64) -> (f64, f64) {
        (direction.adverse_exit(price, self.slippage), self.slippage * quantity.abs())
    }

    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        match self.commission_per_contract {
            Some(per_contract) => quantity.abs() * per_contract,
            None => fill_price * quantity.abs() * self.commission_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetClass;

    #[test]
    fn slippage_is_adverse_on_both_legs() {
        let spec = MarketSpec::new("X", AssetClass::Crypto).with_slippage_ticks(0.5);
        let cost = CostModel::from_spec(&spec);
        assert_eq!(cost.entry_fill(Direction::Long, 100.0, 10.0), (100.5, 5.0));
        assert_eq!(cost.exit_fill(Direction::Long, 100.0, 10.0), (99.5, 5.0));
        assert_eq!(cost.entry_fill(Direction::Short, 100.0, 10.0).0, 99.5);
        assert_eq!(cost.exit_fill(Direction::Short, 100.0, 10.0).0, 100.5);
    }

    #[test]
    fn commission_rate_on_notional() {
        let spec = MarketSpec::new("X", AssetClass::Crypto).with_commission_rate(0.001);
        let cost = CostModel::from_spec(&spec);
        assert!((cost.commission(200.0, 3.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn per_contract_commission() {
        let mut spec = MarketSpec::new("ES", AssetClass::Futures);
        spec.commission_per_contract = Some(2.25);
        let cost = CostModel::from_spec(&spec);
        assert_eq!(cost.commission(5_000.0, -2.0), 4.5);
    }
}
