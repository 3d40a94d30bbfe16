//! Indicators — pure functions from bar history to a numeric series.
//!
//! Every indicator returns a series the same length as its input, with
//! `f64::NAN` during warmup. No value at bar t may read bars after t.

pub mod sma;

pub use sma::Sma;

use crate::domain::Bar;
use std::collections::HashMap;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of leading NaN values.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Bars plus named indicator columns, as returned by `Strategy::get_indicators`.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    pub bars: Vec<Bar>,
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorFrame {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            series: HashMap::new(),
        }
    }

    /// Compute and attach an indicator column under its own name.
    pub fn with(mut self, indicator: &dyn Indicator) -> Self {
        let values = indicator.compute(&self.bars);
        self.series.insert(indicator.name().to_string(), values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at a bar index; `None` when the column or index is missing.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Create synthetic daily bars from close prices for testing.
///
/// open = previous close, high/low = ±1 around the body.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}
