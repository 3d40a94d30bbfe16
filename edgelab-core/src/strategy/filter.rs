//! Signal filters — veto entry signals given timestamp, symbol and market context.
//!
//! Filters are configured once through [`FilterConfig`] and handed to a
//! strategy as a [`FilterChain`]. There is no process-wide filter state.

use super::signal::Signal;
use crate::domain::MarketSpec;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Everything a filter may look at.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub signal: &'a Signal,
    pub symbol: &'a str,
    pub market: &'a MarketSpec,
}

impl FilterContext<'_> {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.signal.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterVerdict {
    Passed,
    Rejected(String),
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, FilterVerdict::Passed)
    }
}

/// A filter may only see market context, never account state.
pub trait SignalFilter: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &FilterContext<'_>) -> FilterVerdict;

    /// Optional hook: true when the strategy should not even generate signals
    /// at this timestamp. Lets strategies skip work inside blackout windows.
    fn blocks_generation(&self, _timestamp: NaiveDateTime, _symbol: &str) -> bool {
        false
    }
}

/// Rejection from a chain: which filter, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub filter: String,
    pub reason: String,
}

/// Ordered list of filters; the first rejection wins.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn SignalFilter>>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|x| x.name()))
            .finish()
    }
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn SignalFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn apply(&self, ctx: &FilterContext<'_>) -> Result<(), Rejection> {
        for filter in &self.filters {
            if let FilterVerdict::Rejected(reason) = filter.evaluate(ctx) {
                return Err(Rejection {
                    filter: filter.name().to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    pub fn blocks_generation(&self, timestamp: NaiveDateTime, symbol: &str) -> bool {
        self.filters
            .iter()
            .any(|f| f.blocks_generation(timestamp, symbol))
    }
}

/// Blocks signals whose UTC hour falls inside any configured window.
///
/// A window with `start_hour > end_hour` wraps midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlackout {
    pub windows: Vec<HourWindow>,
    /// Also suppress signal generation inside the windows.
    #[serde(default)]
    pub block_generation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourWindow {
    /// Half-open `[start_hour, end_hour)`.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl TimeBlackout {
    fn in_blackout(&self, timestamp: NaiveDateTime) -> Option<&HourWindow> {
        let hour = timestamp.hour();
        self.windows.iter().find(|w| w.contains(hour))
    }
}

impl SignalFilter for TimeBlackout {
    fn name(&self) -> &str {
        "time_blackout"
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> FilterVerdict {
        match self.in_blackout(ctx.timestamp()) {
            Some(w) => FilterVerdict::Rejected(format!(
                "{} inside blackout {:02}:00-{:02}:00 UTC",
                ctx.timestamp(),
                w.start_hour,
                w.end_hour
            )),
            None => FilterVerdict::Passed,
        }
    }

    fn blocks_generation(&self, timestamp: NaiveDateTime, _symbol: &str) -> bool {
        self.block_generation && self.in_blackout(timestamp).is_some()
    }
}

/// Filter configuration, built once and passed by reference to strategy construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub time_blackout: Option<TimeBlackout>,
}

impl FilterConfig {
    pub fn build(&self) -> FilterChain {
        let mut chain = FilterChain::new();
        if let Some(blackout) = &self.time_blackout {
            chain.push(Box::new(blackout.clone()));
        }
        chain
    }
}
