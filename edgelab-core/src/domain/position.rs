use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Move `price` against the trader by `offset` when opening in this direction.
    pub fn adverse_entry(&self, price: f64, offset: f64) -> f64 {
        price + self.sign() * offset
    }

    /// Move `price` against the trader by `offset` when closing this direction.
    pub fn adverse_exit(&self, price: f64, offset: f64) -> f64 {
        price - self.sign() * offset
    }
}

/// An open position held by the backtest engine.
///
/// `entry_price` is the filled price after slippage; `quantity` is always
/// positive and `direction` carries the sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_price: f64,
    pub target_price: Option<f64>,
    pub max_hold_bars: Option<usize>,
    /// Margin reserved at entry.
    pub margin: f64,
    pub entry_commission: f64,
    pub entry_slippage: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    pub fn notional(&self, price: f64) -> f64 {
        price * self.quantity
    }

    pub fn bars_held(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }
}
