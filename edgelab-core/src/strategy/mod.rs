//! Strategy interface — the collaborator that turns bars into signals.
//!
//! A strategy receives bars keyed by timeframe and returns an ordered list of
//! [`Signal`]s. Indicator computation, config validation and filtering are
//! default methods so simple strategies implement only `name` and
//! `generate_signals`.

pub mod builtin;
pub mod filter;
pub mod signal;

pub use builtin::{create_strategy, MaCrossStrategy, ScriptedStrategy};
pub use filter::{
    FilterChain, FilterConfig, FilterContext, FilterVerdict, HourWindow, Rejection, SignalFilter,
    TimeBlackout,
};
pub use signal::{Signal, SignalKind};

use crate::domain::{Bar, MarketSpec};
use crate::indicators::IndicatorFrame;
use std::collections::BTreeMap;
use thiserror::Error;

/// Label under which the engine passes the simulated series.
pub const BASE_TIMEFRAME: &str = "base";

/// Bars keyed by timeframe label.
pub type Frames = BTreeMap<String, Vec<Bar>>;

/// Numeric strategy parameters, keyed by name. Ordered so sweeps and
/// fingerprints are deterministic.
pub type StrategyParams = BTreeMap<String, f64>;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("strategy name is required")]
    MissingName,

    #[error("missing timeframe '{0}'")]
    MissingTimeframe(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("unknown strategy type: {0}")]
    UnknownStrategy(String),
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Produce signals from multi-timeframe bars. Signals must be in
    /// timestamp order.
    fn generate_signals(&self, frames: &Frames) -> Result<Vec<Signal>, StrategyError>;

    /// Bars plus indicator columns for one timeframe.
    fn get_indicators(&self, bars: &[Bar]) -> IndicatorFrame {
        IndicatorFrame::new(bars.to_vec())
    }

    fn validate_config(&self) -> Result<(), StrategyError> {
        if self.name().trim().is_empty() {
            return Err(StrategyError::MissingName);
        }
        Ok(())
    }

    fn required_timeframes(&self) -> Vec<String> {
        vec![BASE_TIMEFRAME.to_string()]
    }

    fn filters(&self) -> Option<&FilterChain> {
        None
    }
}

/// Run the strategy's filter chain over one signal. No chain passes everything.
pub fn apply_filters(
    strategy: &dyn Strategy,
    signal: &Signal,
    symbol: &str,
    market: &MarketSpec,
) -> Result<(), Rejection> {
    match strategy.filters() {
        Some(chain) => chain.apply(&FilterContext { signal, symbol, market }),
        None => Ok(()),
    }
}

/// Builds strategy instances from parameter sets (used by parameter sweeps).
pub trait StrategyFactory: Send + Sync {
    fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>, StrategyError>;
}

impl<F> StrategyFactory for F
where
    F: Fn(&StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync,
{
    fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> {
        self(params)
    }
}

/// Named parameter with fallback.
pub fn param(params: &StrategyParams, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}

pub fn param_usize(params: &StrategyParams, name: &str, default: usize) -> usize {
    params
        .get(name)
        .copied()
        .map(|v| v.max(0.0) as usize)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unnamed;

    impl Strategy for Unnamed {
        fn name(&self) -> &str {
            " "
        }

        fn generate_signals(&self, _frames: &Frames) -> Result<Vec<Signal>, StrategyError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn default_validate_requires_name() {
        assert_eq!(Unnamed.validate_config(), Err(StrategyError::MissingName));
    }

    #[test]
    fn default_timeframes_is_base() {
        assert_eq!(Unnamed.required_timeframes(), vec![BASE_TIMEFRAME.to_string()]);
    }

    #[test]
    fn closure_is_a_factory() {
        let factory = |params: &StrategyParams| -> Result<Box<dyn Strategy>, StrategyError> {
            MaCrossStrategy::from_params(params).map(|s| Box::new(s) as Box<dyn Strategy>)
        };
        let mut params = StrategyParams::new();
        params.insert("fast".into(), 3.0);
        params.insert("slow".into(), 8.0);
        let strategy = factory.build(&params).unwrap();
        assert_eq!(strategy.name(), "ma_cross");
    }

    #[test]
    fn no_filters_passes_everything() {
        use crate::domain::{AssetClass, Direction};
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let s = Signal::entry(ts, Direction::Long, 10.0, 9.0);
        let market = MarketSpec::new("X", AssetClass::Stock);
        assert!(apply_filters(&Unnamed, &s, "X", &market).is_ok());
    }

    #[test]
    fn param_helpers_fall_back() {
        let mut params = StrategyParams::new();
        params.insert("fast".into(), 5.0);
        assert_eq!(param(&params, "fast", 1.0), 5.0);
        assert_eq!(param(&params, "slow", 20.0), 20.0);
        assert_eq!(param_usize(&params, "fast", 1), 5);
    }
}
