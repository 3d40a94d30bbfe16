//! BacktestResult — trade log, equity curve and aggregate counters of one run.

use crate::domain::{Bar, Trade};
use crate::stats;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Signal bookkeeping for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    /// Signals produced by the strategy.
    pub generated: usize,
    /// Vetoed by the strategy's filter chain.
    pub filtered: usize,
    /// Entries refused for margin, size, or inconsistent levels.
    pub rejected: usize,
    /// Entries that arrived while a position was open, or whose timestamp
    /// matched no bar.
    pub ignored: usize,
}

/// Output of one backtest. Read-only for every downstream consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub symbol: String,
    pub trades: Vec<Trade>,
    /// Initial capital at the first bar's timestamp, then one point per bar.
    pub equity_curve: Vec<EquityPoint>,
    pub initial_capital: f64,
    pub final_capital: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    /// Peak-to-trough equity decline in currency (≤ 0).
    pub max_drawdown: f64,
    /// Peak-to-trough equity decline as a fraction (≤ 0).
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    /// Mean P&L of losing trades (≤ 0).
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,

    pub bar_count: usize,
    /// Annualization factor inferred from bar spacing.
    pub periods_per_year: f64,
    pub margin_calls: usize,
    pub signals: SignalStats,
}

impl BacktestResult {
    /// Derive every aggregate from the trade log and equity curve.
    #[allow(clippy::too_many_arguments)]
    pub fn from_run(
        strategy_name: &str,
        symbol: &str,
        trades: Vec<Trade>,
        equity_curve: Vec<EquityPoint>,
        initial_capital: f64,
        bars: &[Bar],
        margin_calls: usize,
        signals: SignalStats,
    ) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let (max_drawdown, max_drawdown_pct) = stats::max_drawdown(&equity);
        let periods_per_year = periods_per_year(bars);
        let total_trades = trades.len();

        Self {
            strategy_name: strategy_name.to_string(),
            symbol: symbol.to_string(),
            initial_capital,
            final_capital: equity.last().copied().unwrap_or(initial_capital),
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            total_pnl: pnls.iter().sum(),
            total_commission: trades.iter().map(|t| t.commission).sum(),
            total_slippage: trades.iter().map(|t| t.slippage).sum(),
            max_drawdown,
            max_drawdown_pct,
            win_rate: if total_trades == 0 {
                0.0
            } else {
                wins.len() as f64 / total_trades as f64
            },
            avg_win: stats::mean(&wins),
            avg_loss: stats::mean(&losses),
            profit_factor: stats::profit_factor(&pnls),
            sharpe_ratio: stats::sharpe(&stats::simple_returns(&equity), periods_per_year),
            bar_count: bars.len(),
            periods_per_year,
            margin_calls,
            signals,
            trades,
            equity_curve,
        }
    }

    pub fn trade_pnls(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.pnl).collect()
    }

    pub fn trade_returns(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.return_pct()).collect()
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.final_capital - self.initial_capital) / self.initial_capital
    }
}

/// Bars per year: 252 trading days × bars per day, where bars per day comes
/// from the median bar spacing (at least one).
pub fn periods_per_year(bars: &[Bar]) -> f64 {
    let mut gaps: Vec<i64> = bars
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
        .filter(|s| *s > 0)
        .collect();
    if gaps.is_empty() {
        return stats::TRADING_DAYS_PER_YEAR;
    }
    gaps.sort_unstable();
    let median = gaps[gaps.len() / 2] as f64;
    let bars_per_day = (86_400.0 / median).max(1.0);
    stats::TRADING_DAYS_PER_YEAR * bars_per_day
}
