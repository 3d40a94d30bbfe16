//! MarketSpec — per-symbol trading rules (leverage, contract size, costs, margin).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Forex,
    Crypto,
    Stock,
    Futures,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Forex => "forex",
            AssetClass::Crypto => "crypto",
            AssetClass::Stock => "stock",
            AssetClass::Futures => "futures",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    #[default]
    Spot,
    Futures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginMode {
    Isolated,
    #[default]
    Cross,
}

/// Market-specific trading rules.
///
/// Leverage is consulted only by the margin formulas in [`crate::economics`];
/// P&L is always `price change × quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSpec {
    pub symbol: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    pub asset_class: AssetClass,
    #[serde(default)]
    pub market_type: MarketType,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    /// Units per standard lot/contract (e.g. 100 000 for FX).
    #[serde(default)]
    pub contract_size: Option<f64>,
    /// Pip size in price units (e.g. 0.0001 for most FX pairs).
    #[serde(default)]
    pub pip_value: Option<f64>,
    #[serde(default = "default_min_trade_size")]
    pub min_trade_size: f64,
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// Fixed commission per contract; overrides `commission_rate` when set.
    #[serde(default)]
    pub commission_per_contract: Option<f64>,
    /// Adverse price offset applied to every fill, in price units.
    #[serde(default)]
    pub slippage_ticks: f64,
    #[serde(default)]
    pub initial_margin_per_contract: Option<f64>,
    #[serde(default)]
    pub intraday_margin_per_contract: Option<f64>,
    #[serde(default)]
    pub maintenance_margin_rate: Option<f64>,
    #[serde(default)]
    pub margin_mode: MarginMode,
}

fn default_exchange() -> String {
    "unknown".to_string()
}

fn default_leverage() -> f64 {
    1.0
}

fn default_min_trade_size() -> f64 {
    0.01
}

fn default_price_precision() -> u32 {
    5
}

fn default_quantity_precision() -> u32 {
    2
}

fn default_commission_rate() -> f64 {
    0.0004
}

impl MarketSpec {
    /// Spec with the stock defaults for an asset class: unlevered, 4 bps
    /// commission, no slippage, no per-contract margin.
    pub fn new(symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: default_exchange(),
            asset_class,
            market_type: MarketType::Spot,
            leverage: default_leverage(),
            contract_size: None,
            pip_value: None,
            min_trade_size: default_min_trade_size(),
            price_precision: default_price_precision(),
            quantity_precision: default_quantity_precision(),
            commission_rate: default_commission_rate(),
            commission_per_contract: None,
            slippage_ticks: 0.0,
            initial_margin_per_contract: None,
            intraday_margin_per_contract: None,
            maintenance_margin_rate: None,
            margin_mode: MarginMode::Cross,
        }
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_commission_rate(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }

    pub fn with_slippage_ticks(mut self, ticks: f64) -> Self {
        self.slippage_ticks = ticks;
        self
    }

    /// Traditional (CME-style) futures post a fixed margin per contract
    /// instead of `notional / leverage`.
    pub fn uses_fixed_contract_margin(&self) -> bool {
        self.asset_class == AssetClass::Futures && self.initial_margin_per_contract.is_some()
    }

    /// Round a price to the market's display precision.
    pub fn round_price(&self, price: f64) -> f64 {
        let scale = 10f64.powi(self.price_precision as i32);
        (price * scale).round() / scale
    }

    /// Round a quantity down to the market's quantity precision.
    pub fn floor_quantity(&self, quantity: f64) -> f64 {
        let scale = 10f64.powi(self.quantity_precision as i32);
        (quantity * scale).floor() / scale
    }
}
