//! Numeric helpers shared by the engine and the validation layer.
//!
//! Every function returns a 0.0 sentinel for empty or degenerate input.

/// Profit factor cap for runs with profits and no losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Simple returns between consecutive equity values. A non-positive base
/// yields a 0.0 return.
pub fn simple_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Annualized Sharpe: mean / std × sqrt(periods_per_year).
pub fn sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = std_dev(returns);
    if sd < 1e-15 {
        return 0.0;
    }
    mean(returns) / sd * periods_per_year.max(0.0).sqrt()
}

/// Annualized Sortino using downside deviation over all periods.
pub fn sortino(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside == 0.0 {
        return 0.0;
    }
    let downside_std = (downside / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean(returns) / downside_std * periods_per_year.max(0.0).sqrt()
}

/// Gross profit / gross loss, capped at [`PROFIT_FACTOR_CAP`]. 0.0 with no trades.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Peak-to-trough decline as `(currency, fraction)`, both ≤ 0.
pub fn max_drawdown(equity: &[f64]) -> (f64, f64) {
    let Some(&first) = equity.first() else {
        return (0.0, 0.0);
    };
    let mut peak = first;
    let mut worst_abs = 0.0_f64;
    let mut worst_pct = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        worst_abs = worst_abs.min(eq - peak);
        if peak > 0.0 {
            worst_pct = worst_pct.min((eq - peak) / peak);
        }
    }
    (worst_abs, worst_pct)
}

/// Equity path from an initial balance and a sequence of trade P&Ls
/// (initial value first).
pub fn equity_from_pnls(initial: f64, pnls: &[f64]) -> Vec<f64> {
    let mut equity = Vec::with_capacity(pnls.len() + 1);
    let mut running = initial;
    equity.push(running);
    for p in pnls {
        running += p;
        equity.push(running);
    }
    equity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        assert!((std_dev(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn sharpe_constant_is_zero() {
        assert_eq!(sharpe(&[0.01; 10], 252.0), 0.0);
        assert_eq!(sharpe(&[0.01], 252.0), 0.0);
    }

    #[test]
    fn sharpe_sign_follows_mean() {
        assert!(sharpe(&[0.01, 0.02, -0.005, 0.015], 252.0) > 0.0);
        assert!(sharpe(&[-0.01, -0.02, 0.005, -0.015], 252.0) < 0.0);
    }

    #[test]
    fn sortino_no_downside_is_zero() {
        assert_eq!(sortino(&[0.01, 0.02, 0.03], 252.0), 0.0);
        assert!(sortino(&[0.02, -0.01, 0.03], 252.0) > 0.0);
    }

    #[test]
    fn profit_factor_cases() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[10.0, 5.0]), PROFIT_FACTOR_CAP);
        assert_eq!(profit_factor(&[-1.0]), 0.0);
        assert!((profit_factor(&[30.0, -10.0, -5.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn drawdown_known() {
        let (abs, pct) = max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((abs + 30.0).abs() < 1e-12);
        assert!((pct + 0.25).abs() < 1e-12);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), (0.0, 0.0));
        assert_eq!(max_drawdown(&[]), (0.0, 0.0));
    }

    #[test]
    fn equity_path_accumulates() {
        assert_eq!(equity_from_pnls(100.0, &[5.0, -2.0]), vec![100.0, 105.0, 103.0]);
    }

    #[test]
    fn returns_guard_non_positive_base() {
        assert_eq!(simple_returns(&[0.0, 10.0, 20.0]), vec![0.0, 1.0]);
    }
}
