//! Built-in strategies.

use super::{
    param, param_usize, FilterChain, Frames, Signal, Strategy, StrategyError, StrategyParams,
    BASE_TIMEFRAME,
};
use crate::domain::{Bar, Direction};
use crate::indicators::{Indicator, IndicatorFrame, Sma};

// ─── MA crossover ────────────────────────────────────────────────────

/// Stop-and-reverse SMA crossover.
///
/// Fast SMA crossing above slow goes long at the close; crossing below goes
/// short. Each cross first closes the opposite position. The stop sits
/// `stop_pct` away from entry and the target `target_r` stop-distances beyond it.
#[derive(Debug)]
pub struct MaCrossStrategy {
    fast: usize,
    slow: usize,
    stop_pct: f64,
    target_r: f64,
    symbol: String,
    filters: Option<FilterChain>,
}

impl MaCrossStrategy {
    pub fn new(fast: usize, slow: usize, stop_pct: f64, target_r: f64) -> Result<Self, StrategyError> {
        let strategy = Self {
            fast,
            slow,
            stop_pct,
            target_r,
            symbol: String::new(),
            filters: None,
        };
        strategy.check_params()?;
        Ok(strategy)
    }

    /// Parameters: `fast` (10), `slow` (30), `stop_pct` (0.02), `target_r` (2.0).
    pub fn from_params(params: &StrategyParams) -> Result<Self, StrategyError> {
        Self::new(
            param_usize(params, "fast", 10),
            param_usize(params, "slow", 30),
            param(params, "stop_pct", 0.02),
            param(params, "target_r", 2.0),
        )
    }

    pub fn with_filters(mut self, symbol: impl Into<String>, filters: FilterChain) -> Self {
        self.symbol = symbol.into();
        self.filters = Some(filters);
        self
    }

    fn check_params(&self) -> Result<(), StrategyError> {
        let invalid = |name: &str, reason: &str| StrategyError::InvalidParam {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if self.fast == 0 {
            return Err(invalid("fast", "must be >= 1"));
        }
        if self.slow <= self.fast {
            return Err(invalid("slow", "must be greater than fast"));
        }
        if !(self.stop_pct > 0.0 && self.stop_pct < 1.0) {
            return Err(invalid("stop_pct", "must be in (0, 1)"));
        }
        if self.target_r <= 0.0 {
            return Err(invalid("target_r", "must be positive"));
        }
        Ok(())
    }

    fn entry_signal(&self, bar: &Bar, direction: Direction) -> Signal {
        let entry = bar.close;
        let risk = entry * self.stop_pct;
        let sign = direction.sign();
        Signal::entry(bar.timestamp, direction, entry, entry - sign * risk)
            .with_target(entry + sign * self.target_r * risk)
    }
}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn generate_signals(&self, frames: &Frames) -> Result<Vec<Signal>, StrategyError> {
        let bars = frames
            .get(BASE_TIMEFRAME)
            .ok_or_else(|| StrategyError::MissingTimeframe(BASE_TIMEFRAME.to_string()))?;
        let frame = self.get_indicators(bars);
        let fast_name = Sma::new(self.fast).name().to_string();
        let slow_name = Sma::new(self.slow).name().to_string();

        let mut signals = Vec::new();
        for i in 1..bars.len() {
            let (Some(f0), Some(s0), Some(f1), Some(s1)) = (
                frame.get(&fast_name, i - 1),
                frame.get(&slow_name, i - 1),
                frame.get(&fast_name, i),
                frame.get(&slow_name, i),
            ) else {
                continue;
            };
            if f0.is_nan() || s0.is_nan() {
                continue;
            }
            let direction = if f0 <= s0 && f1 > s1 {
                Direction::Long
            } else if f0 >= s0 && f1 < s1 {
                Direction::Short
            } else {
                continue;
            };

            let bar = &bars[i];
            if let Some(chain) = &self.filters {
                if chain.blocks_generation(bar.timestamp, &self.symbol) {
                    continue;
                }
            }
            signals.push(Signal::exit(bar.timestamp, direction.opposite()));
            signals.push(
                self.entry_signal(bar, direction)
                    .with_meta("fast", f1)
                    .with_meta("slow", s1),
            );
        }
        Ok(signals)
    }

    fn get_indicators(&self, bars: &[Bar]) -> IndicatorFrame {
        IndicatorFrame::new(bars.to_vec())
            .with(&Sma::new(self.fast))
            .with(&Sma::new(self.slow))
    }

    fn validate_config(&self) -> Result<(), StrategyError> {
        self.check_params()
    }

    fn filters(&self) -> Option<&FilterChain> {
        self.filters.as_ref()
    }
}

// ─── Scripted ────────────────────────────────────────────────────────

/// Replays a fixed signal list. Used for scenario tests and for strategies
/// whose signals were produced elsewhere.
#[derive(Debug)]
pub struct ScriptedStrategy {
    name: String,
    signals: Vec<Signal>,
    filters: Option<FilterChain>,
}

impl ScriptedStrategy {
    pub fn new(name: impl Into<String>, signals: Vec<Signal>) -> Self {
        Self {
            name: name.into(),
            signals,
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = Some(filters);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signals(&self, _frames: &Frames) -> Result<Vec<Signal>, StrategyError> {
        Ok(self.signals.clone())
    }

    fn filters(&self) -> Option<&FilterChain> {
        self.filters.as_ref()
    }
}

// ─── Factory ─────────────────────────────────────────────────────────

/// Create a built-in strategy by type name.
pub fn create_strategy(
    strategy_type: &str,
    params: &StrategyParams,
) -> Result<Box<dyn Strategy>, StrategyError> {
    match strategy_type {
        "ma_cross" => Ok(Box::new(MaCrossStrategy::from_params(params)?)),
        other => Err(StrategyError::UnknownStrategy(other.to_string())),
    }
}
