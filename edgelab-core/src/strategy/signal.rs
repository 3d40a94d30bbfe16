//! Signal — one instruction from a strategy to the engine.

use crate::domain::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Open a position at `entry_price` on the signal's bar.
    Entry,
    /// Close the open position at the signal bar's close.
    Exit,
}

/// A strategy instruction keyed to a bar timestamp.
///
/// For `Exit` signals only `timestamp` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub kind: SignalKind,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub max_hold_bars: Option<usize>,
    /// Signal strength in (0, 1]; scales the risked amount.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl Signal {
    pub fn entry(
        timestamp: NaiveDateTime,
        direction: Direction,
        entry_price: f64,
        stop_price: f64,
    ) -> Self {
        Self {
            timestamp,
            kind: SignalKind::Entry,
            direction,
            entry_price,
            stop_price,
            target_price: None,
            max_hold_bars: None,
            weight: default_weight(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn exit(timestamp: NaiveDateTime, direction: Direction) -> Self {
        Self {
            kind: SignalKind::Exit,
            ..Self::entry(timestamp, direction, 0.0, 0.0)
        }
    }

    pub fn with_target(mut self, target_price: f64) -> Self {
        self.target_price = Some(target_price);
        self
    }

    pub fn with_max_hold(mut self, bars: usize) -> Self {
        self.max_hold_bars = Some(bars);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_entry(&self) -> bool {
        self.kind == SignalKind::Entry
    }

    /// Absolute distance between entry and stop.
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }

    /// Stop on the losing side of entry, target (if any) on the winning side.
    pub fn levels_are_consistent(&self) -> bool {
        let sign = self.direction.sign();
        let stop_ok = sign * (self.entry_price - self.stop_price) > 0.0;
        let target_ok = self
            .target_price
            .map_or(true, |t| sign * (t - self.entry_price) > 0.0);
        stop_ok && target_ok
    }
}
