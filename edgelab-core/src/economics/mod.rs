//! Market economics — margin, maintenance margin, P&L and affordability.
//!
//! Every function here is pure and parameterized by a [`MarketSpec`].
//! Leverage enters only the margin formulas. P&L is `price change × quantity`
//! for every asset class and every leverage setting.
//!
//! Degenerate inputs (zero or negative leverage, price, or stop distance)
//! return a 0.0 sentinel instead of dividing by zero.

pub mod broker;

pub use broker::Broker;

use crate::domain::{AssetClass, Direction, MarketSpec};

/// P&L of `quantity` units moved from `entry_price` to `price`.
///
/// Shared by realized and unrealized P&L. Does not take a [`MarketSpec`],
/// so leverage cannot reach it.
pub fn pnl(entry_price: f64, price: f64, quantity: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Long => (price - entry_price) * quantity,
        Direction::Short => (entry_price - price) * quantity,
    }
}

/// Margin-call decision.
///
/// No margin in use never triggers. Non-positive equity always triggers,
/// whatever the level: leveraged losses can push equity below zero before the
/// ratio test would fire. Otherwise triggers when `equity / margin_used` falls
/// below `margin_call_level`.
pub fn margin_call(equity: f64, margin_used: f64, margin_call_level: f64) -> bool {
    if margin_used <= 0.0 {
        return false;
    }
    if equity <= 0.0 {
        return true;
    }
    equity / margin_used < margin_call_level
}

impl MarketSpec {
    /// Initial margin required to open `quantity` at `entry_price`.
    ///
    /// Traditional futures post a fixed amount per contract (the intraday
    /// rate when `is_intraday` and one is configured). Everything else posts
    /// `notional / leverage`.
    pub fn margin(&self, entry_price: f64, quantity: f64, is_intraday: bool) -> f64 {
        if let Some(initial) = self.initial_margin_per_contract {
            if self.asset_class == AssetClass::Futures {
                let per_contract = match (is_intraday, self.intraday_margin_per_contract) {
                    (true, Some(intraday)) => intraday,
                    _ => initial,
                };
                return quantity.abs() * per_contract;
            }
        }
        if self.leverage <= 0.0 {
            return 0.0;
        }
        entry_price * quantity.abs() / self.leverage
    }

    /// Minimum equity needed to keep the position open.
    ///
    /// With a maintenance rate configured: marked notional × rate.
    /// Traditional futures without a rate keep their initial per-contract margin.
    /// Otherwise falls back to the initial-margin formula.
    pub fn maintenance_margin(
        &self,
        entry_price: f64,
        quantity: f64,
        current_price: Option<f64>,
    ) -> f64 {
        let price = current_price.unwrap_or(entry_price);
        if let Some(rate) = self.maintenance_margin_rate {
            return price * quantity.abs() * rate;
        }
        // Overnight rate: fixed-margin futures keep their initial per-contract amount.
        self.margin(entry_price, quantity, false)
    }

    pub fn unrealized_pnl(
        &self,
        entry_price: f64,
        current_price: f64,
        quantity: f64,
        direction: Direction,
    ) -> f64 {
        pnl(entry_price, current_price, quantity, direction)
    }

    pub fn realized_pnl(
        &self,
        entry_price: f64,
        exit_price: f64,
        quantity: f64,
        direction: Direction,
    ) -> f64 {
        pnl(entry_price, exit_price, quantity, direction)
    }

    /// Largest quantity whose margin plus entry commission fits in `available_cash`:
    /// `cash / (price × (1/leverage + commission_rate))`.
    pub fn max_affordable_quantity(
        &self,
        entry_price: f64,
        available_cash: f64,
        commission_rate: f64,
    ) -> f64 {
        if entry_price <= 0.0 || available_cash <= 0.0 || self.leverage <= 0.0 {
            return 0.0;
        }
        let denominator = entry_price * (1.0 / self.leverage + commission_rate);
        if denominator <= 0.0 {
            return 0.0;
        }
        available_cash / denominator
    }

    /// Pip value of one standard lot in quote-currency dollars (forex only).
    ///
    /// USD-quoted pairs are worth $10 per pip per lot. USD-based pairs are
    /// worth `contract_size × pip_size / price` (pip size 0.01 for JPY).
    pub fn pip_value_per_lot(&self, entry_price: f64) -> f64 {
        let contract_size = match (self.asset_class, self.contract_size) {
            (AssetClass::Forex, Some(size)) => size,
            _ => return 0.0,
        };
        let quote = self.symbol.get(self.symbol.len().saturating_sub(3)..).unwrap_or("");
        if quote.contains("USD") {
            return 10.0;
        }
        if self.symbol.starts_with("USD") {
            if entry_price <= 0.0 {
                return 0.0;
            }
            let pip_size = if self.symbol.contains("JPY") {
                0.01
            } else {
                self.pip_value.unwrap_or(0.0001)
            };
            return contract_size * pip_size / entry_price;
        }
        10.0
    }

    pub fn pip_value_per_unit(&self, entry_price: f64) -> f64 {
        let contract_size = match (self.asset_class, self.contract_size) {
            (AssetClass::Forex, Some(size)) if size > 0.0 => size,
            _ => return 0.0,
        };
        let per_lot = self.pip_value_per_lot(entry_price);
        if per_lot <= 0.0 {
            return 0.0;
        }
        per_lot / contract_size
    }

    /// Lots risking `risk_amount` over a stop `stop_loss_pips` away (forex only).
    pub fn lot_size_from_risk(&self, risk_amount: f64, stop_loss_pips: f64, entry_price: f64) -> f64 {
        if self.asset_class != AssetClass::Forex {
            return 0.0;
        }
        let per_lot = self.pip_value_per_lot(entry_price);
        if per_lot <= 0.0 || stop_loss_pips <= 0.0 {
            return 0.0;
        }
        risk_amount / (stop_loss_pips * per_lot)
    }

    /// Units risking `risk_amount` over a stop `stop_loss_pips` away (forex only).
    pub fn quantity_from_risk(&self, risk_amount: f64, stop_loss_pips: f64, entry_price: f64) -> f64 {
        if self.asset_class != AssetClass::Forex {
            return 0.0;
        }
        let per_unit = self.pip_value_per_unit(entry_price);
        if per_unit <= 0.0 || stop_loss_pips <= 0.0 {
            return 0.0;
        }
        risk_amount / (stop_loss_pips * per_unit)
    }

    /// Lots to units for forex; other markets already quote in units.
    pub fn lot_size_to_units(&self, lot_size: f64) -> f64 {
        match (self.asset_class, self.contract_size) {
            (AssetClass::Forex, Some(size)) => lot_size * size,
            _ => lot_size,
        }
    }
}
