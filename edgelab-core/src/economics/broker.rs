//! Broker — whether a trade is allowed under the market's margin rules.

use super::margin_call;
use crate::domain::MarketSpec;
use serde::{Deserialize, Serialize};

/// Affordability check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affordability {
    pub affordable: bool,
    /// Margin plus entry commission.
    pub required: f64,
}

/// Pre-trade margin gate for one market.
#[derive(Debug, Clone)]
pub struct Broker {
    spec: MarketSpec,
    margin_call_level: f64,
}

impl Broker {
    pub fn new(spec: MarketSpec, margin_call_level: f64) -> Self {
        Self { spec, margin_call_level }
    }

    pub fn spec(&self) -> &MarketSpec {
        &self.spec
    }

    pub fn margin_call_level(&self) -> f64 {
        self.margin_call_level
    }

    /// Margin plus entry commission against available cash. Never partial:
    /// callers either take the full quantity or reject the entry.
    pub fn can_afford(
        &self,
        entry_price: f64,
        quantity: f64,
        available_cash: f64,
        is_intraday: bool,
    ) -> Affordability {
        let margin = self.spec.margin(entry_price, quantity, is_intraday);
        let commission = match self.spec.commission_per_contract {
            Some(per_contract) => quantity.abs() * per_contract,
            None => entry_price * quantity.abs() * self.spec.commission_rate,
        };
        let required = margin + commission;
        Affordability {
            affordable: required <= available_cash,
            required,
        }
    }

    pub fn margin_call(&self, equity: f64, margin_used: f64) -> bool {
        margin_call(equity, margin_used, self.margin_call_level)
    }

    /// Shrink `desired` to what `available_cash` can carry at the market's
    /// commission rate.
    pub fn adjust_quantity_for_cash(&self, entry_price: f64, desired: f64, available_cash: f64) -> f64 {
        let max = self
            .spec
            .max_affordable_quantity(entry_price, available_cash, self.spec.commission_rate);
        desired.min(max).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetClass;

    fn broker(leverage: f64) -> Broker {
        let spec = MarketSpec::new("ETHUSDT", AssetClass::Crypto)
            .with_leverage(leverage)
            .with_commission_rate(0.001);
        Broker::new(spec, 0.5)
    }

    #[test]
    fn affordable_within_cash() {
        let check = broker(10.0).can_afford(100.0, 50.0, 1_000.0, false);
        // margin 500 + commission 5
        assert!(check.affordable);
        assert!((check.required - 505.0).abs() < 1e-9);
    }

    #[test]
    fn unaffordable_when_margin_exceeds_cash() {
        let check = broker(1.0).can_afford(100.0, 50.0, 1_000.0, false);
        assert!(!check.affordable);
    }

    #[test]
    fn per_contract_commission_overrides_rate() {
        let mut b = broker(10.0);
        b.spec.commission_per_contract = Some(2.5);
        let check = b.can_afford(100.0, 4.0, 1_000.0, false);
        assert!((check.required - (40.0 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn adjust_quantity_caps_at_affordable() {
        let b = broker(10.0);
        let qty = b.adjust_quantity_for_cash(100.0, 1_000.0, 1_000.0);
        assert!((qty - 1_000.0 / (100.0 * (0.1 + 0.001))).abs() < 1e-9);
        assert_eq!(b.adjust_quantity_for_cash(100.0, 3.0, 1_000.0), 3.0);
    }

    #[test]
    fn margin_call_uses_configured_level() {
        let b = broker(10.0);
        assert!(b.margin_call(49.0, 100.0));
        assert!(!b.margin_call(51.0, 100.0));
    }
}
