//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Two layers:
//! - [`EnhancedMetrics`] summarizes one `BacktestResult` for the quality checks.
//! - [`MetricKind`] + [`evaluate`] score a bare sequence of trade P&Ls, which is
//!   all a Monte Carlo resample has.

use edgelab_core::engine::BacktestResult;
use edgelab_core::stats;
use serde::{Deserialize, Serialize};

/// Upper bound for a coefficient of variation whose mean is ~0.
pub const CV_CAP: f64 = 1_000.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedMetrics {
    pub total_return: f64,
    pub total_pnl: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub win_rate: f64,
    /// Mean net P&L per trade.
    pub expectancy: f64,
    /// Mean P&L in units of initial risk (stop distance × quantity).
    pub avg_r_multiple: f64,
    /// Peak-to-trough equity decline as a fraction (≤ 0).
    pub max_drawdown_pct: f64,
    /// Total P&L / |max drawdown|. 0.0 without a drawdown.
    pub recovery_factor: f64,
    pub trades_per_year: f64,
    pub total_trades: usize,
}

impl EnhancedMetrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let equity = result.equity_values();
        let returns = stats::simple_returns(&equity);
        let pnls = result.trade_pnls();

        let r_multiples: Vec<f64> = result
            .trades
            .iter()
            .filter_map(|t| {
                let risk = (t.entry_price - t.stop_price).abs() * t.quantity;
                (risk > 0.0).then(|| t.pnl / risk)
            })
            .collect();

        let recovery_factor = if result.max_drawdown < 0.0 {
            result.total_pnl / result.max_drawdown.abs()
        } else {
            0.0
        };

        Self {
            total_return: result.total_return(),
            total_pnl: result.total_pnl,
            profit_factor: stats::profit_factor(&pnls),
            sharpe_ratio: stats::sharpe(&returns, result.periods_per_year),
            sortino_ratio: stats::sortino(&returns, result.periods_per_year),
            win_rate: win_rate(&pnls),
            expectancy: stats::mean(&pnls),
            avg_r_multiple: stats::mean(&r_multiples),
            max_drawdown_pct: result.max_drawdown_pct,
            recovery_factor,
            trades_per_year: trades_per_year(result),
            total_trades: result.total_trades,
        }
    }
}

/// Trades per year of simulated history. 0.0 for an empty run.
pub fn trades_per_year(result: &BacktestResult) -> f64 {
    if result.bar_count == 0 || result.periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = result.bar_count as f64 / result.periods_per_year;
    result.total_trades as f64 / years
}

// ─── Per-sequence metrics ───────────────────────────────────────────

/// Metric computed from a sequence of trade P&Ls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    FinalPnl,
    SharpeRatio,
    ProfitFactor,
    /// Max drawdown fraction (≤ 0, so larger is better like the others).
    MaxDrawdown,
    WinRate,
    /// Total P&L / |max drawdown in currency|. 0.0 without a drawdown.
    RecoveryFactor,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::FinalPnl => "final_pnl",
            MetricKind::SharpeRatio => "sharpe_ratio",
            MetricKind::ProfitFactor => "profit_factor",
            MetricKind::MaxDrawdown => "max_drawdown",
            MetricKind::WinRate => "win_rate",
            MetricKind::RecoveryFactor => "recovery_factor",
        }
    }

    pub fn all() -> [MetricKind; 6] {
        [
            MetricKind::FinalPnl,
            MetricKind::SharpeRatio,
            MetricKind::ProfitFactor,
            MetricKind::MaxDrawdown,
            MetricKind::WinRate,
            MetricKind::RecoveryFactor,
        ]
    }

    /// Whether reordering the same trades can change the value.
    pub fn is_order_dependent(&self) -> bool {
        matches!(
            self,
            MetricKind::SharpeRatio | MetricKind::MaxDrawdown | MetricKind::RecoveryFactor
        )
    }
}

/// Metrics scored by the permutation test: the configured ones that depend
/// on trade order, plus drawdown and recovery factor.
pub fn path_metrics(configured: &[MetricKind]) -> Vec<MetricKind> {
    let mut kinds: Vec<MetricKind> = configured
        .iter()
        .copied()
        .filter(MetricKind::is_order_dependent)
        .chain([MetricKind::MaxDrawdown, MetricKind::RecoveryFactor])
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

/// Evaluate one metric over trade P&Ls applied in order to `initial` equity.
///
/// Sharpe is over per-trade equity returns, annualized with
/// `periods_per_year` (trades per year for a trade sequence).
pub fn evaluate(kind: MetricKind, pnls: &[f64], initial: f64, periods_per_year: f64) -> f64 {
    match kind {
        MetricKind::FinalPnl => pnls.iter().sum(),
        MetricKind::SharpeRatio => {
            let equity = stats::equity_from_pnls(initial, pnls);
            stats::sharpe(&stats::simple_returns(&equity), periods_per_year)
        }
        MetricKind::ProfitFactor => stats::profit_factor(pnls),
        MetricKind::MaxDrawdown => stats::max_drawdown(&stats::equity_from_pnls(initial, pnls)).1,
        MetricKind::WinRate => win_rate(pnls),
        MetricKind::RecoveryFactor => {
            let (dd, _) = stats::max_drawdown(&stats::equity_from_pnls(initial, pnls));
            if dd < 0.0 {
                pnls.iter().sum::<f64>() / dd.abs()
            } else {
                0.0
            }
        }
    }
}

/// Evaluate several metrics at once, in the order given.
pub fn evaluate_all(kinds: &[MetricKind], pnls: &[f64], initial: f64, periods_per_year: f64) -> Vec<f64> {
    kinds
        .iter()
        .map(|&k| evaluate(k, pnls, initial, periods_per_year))
        .collect()
}

pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

// ─── Dispersion helpers ─────────────────────────────────────────────

/// |std / mean| with sentinels.
///
/// Fewer than two values or zero dispersion → 0.0. A mean of ~0 with
/// non-zero dispersion → [`CV_CAP`]. Otherwise capped at [`CV_CAP`].
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sd = stats::std_dev(values);
    if sd < 1e-12 {
        return 0.0;
    }
    let m = stats::mean(values);
    if m.abs() < 1e-12 {
        return CV_CAP;
    }
    (sd / m.abs()).min(CV_CAP)
}

/// Linear-interpolated percentile of sorted data (pct in [0, 100]).
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cv_sentinels() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[3.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[2.0, 2.0, 2.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0]), CV_CAP);
    }

    #[test]
    fn cv_known_value() {
        // mean 2, sample std 1
        assert!((coefficient_of_variation(&[1.0, 2.0, 3.0]) - 0.5).abs() < 1e-12);
        // sign of the mean does not matter
        assert!((coefficient_of_variation(&[-1.0, -2.0, -3.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 50.0), 3.0);
        assert_eq!(percentile_sorted(&v, 100.0), 5.0);
        assert!((percentile_sorted(&v, 25.0) - 2.0).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    #[test]
    fn sequence_metrics() {
        let pnls = [100.0, -50.0, 25.0, -25.0];
        assert_eq!(evaluate(MetricKind::FinalPnl, &pnls, 1_000.0, 52.0), 50.0);
        assert_eq!(evaluate(MetricKind::WinRate, &pnls, 1_000.0, 52.0), 0.5);
        assert!((evaluate(MetricKind::ProfitFactor, &pnls, 1_000.0, 52.0) - 125.0 / 75.0).abs() < 1e-12);
        // peak 1100 → trough 1050
        let dd = evaluate(MetricKind::MaxDrawdown, &pnls, 1_000.0, 52.0);
        assert!((dd + 50.0 / 1_100.0).abs() < 1e-12);
        // 50 total over a 50 drawdown
        assert!((evaluate(MetricKind::RecoveryFactor, &pnls, 1_000.0, 52.0) - 1.0).abs() < 1e-12);
        assert_eq!(evaluate(MetricKind::RecoveryFactor, &[10.0, 20.0], 1_000.0, 52.0), 0.0);
    }

    #[test]
    fn path_metrics_drop_order_free_kinds() {
        let kinds = path_metrics(&[MetricKind::FinalPnl, MetricKind::SharpeRatio, MetricKind::ProfitFactor]);
        assert_eq!(
            kinds,
            vec![MetricKind::SharpeRatio, MetricKind::MaxDrawdown, MetricKind::RecoveryFactor]
        );
        assert!(kinds.iter().all(MetricKind::is_order_dependent));
        assert_eq!(path_metrics(&[MetricKind::WinRate]).len(), 2);
    }

    #[test]
    fn empty_sequence_is_all_zero() {
        for kind in MetricKind::all() {
            assert_eq!(evaluate(kind, &[], 1_000.0, 252.0), 0.0, "{}", kind.name());
        }
    }

    #[test]
    fn metric_names_match_serde() {
        for kind in MetricKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
