//! Backtest configuration.

use super::EngineError;
use serde::{Deserialize, Serialize};

/// What the risk fraction is taken of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingBasis {
    /// Current equity (compounds).
    Equity,
    /// Initial account size (fixed risk per trade).
    AccountSize,
}

/// Risk-based sizing: `quantity = basis × risk_fraction × weight / |entry − stop|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    pub risk_fraction: f64,
    pub basis: SizingBasis,
}

impl Default for PositionSizing {
    fn default() -> Self {
        Self {
            risk_fraction: 0.01,
            basis: SizingBasis::Equity,
        }
    }
}

/// Which level fills first when a bar's range covers both stop and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntrabarPolicy {
    /// Stop first (conservative).
    WorstCase,
    /// Target first (optimistic).
    BestCase,
    /// Infer the path from OHLC: the extreme nearer the open is visited first.
    OhlcPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    #[serde(default)]
    pub sizing: PositionSizing,
    #[serde(default = "default_policy")]
    pub intrabar_policy: IntrabarPolicy,
    /// Equity / margin ratio below which an open position is force-closed.
    #[serde(default = "default_margin_call_level")]
    pub margin_call_level: f64,
    /// Use intraday per-contract margin where the market defines one.
    #[serde(default)]
    pub is_intraday: bool,
}

fn default_policy() -> IntrabarPolicy {
    IntrabarPolicy::WorstCase
}

fn default_margin_call_level() -> f64 {
    0.5
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            sizing: PositionSizing::default(),
            intrabar_policy: default_policy(),
            margin_call_level: default_margin_call_level(),
            is_intraday: false,
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(self.sizing.risk_fraction > 0.0 && self.sizing.risk_fraction <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "risk_fraction must be in (0, 1], got {}",
                self.sizing.risk_fraction
            )));
        }
        if self.margin_call_level < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "margin_call_level must be non-negative, got {}",
                self.margin_call_level
            )));
        }
        Ok(())
    }
}
