//! Trade — a completed round trip emitted when the engine closes a position.

use super::position::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Explicit exit signal from the strategy.
    Signal,
    /// `max_hold_bars` elapsed.
    TimeExit,
    /// Forced close after equity fell below the margin-call level.
    MarginCall,
    /// Still open on the last bar.
    EndOfData,
}

impl ExitReason {
    /// Exits whose price is fixed by the entry-time stop/target levels.
    pub fn is_mechanical(&self) -> bool {
        matches!(self, ExitReason::StopLoss | ExitReason::TakeProfit)
    }
}

/// A completed round trip: entry → exit.
///
/// Prices are fills after slippage. `commission` and `slippage` cover both legs;
/// `pnl` is net of commission (slippage is already inside the fill prices).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,

    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    pub quantity: f64,
    pub stop_price: f64,
    pub target_price: Option<f64>,

    pub gross_pnl: f64,
    pub commission: f64,
    pub slippage: f64,
    pub pnl: f64,

    pub exit_reason: ExitReason,
}

impl Trade {
    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Stop distance as a fraction of entry price (always non-negative).
    pub fn stop_distance_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.entry_price - self.stop_price).abs() / self.entry_price
    }

    /// Target distance as a fraction of entry price, if a target was set.
    pub fn target_distance_pct(&self) -> Option<f64> {
        if self.entry_price == 0.0 {
            return None;
        }
        self.target_price
            .map(|t| (t - self.entry_price).abs() / self.entry_price)
    }

    /// Signed exit offset relative to entry, in the trade's favour.
    pub fn exit_offset_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.direction.sign() * (self.exit_price - self.entry_price) / self.entry_price
    }
}
