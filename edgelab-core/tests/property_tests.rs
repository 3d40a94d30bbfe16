//! Property tests for economics and engine invariants.
//!
//! Uses proptest to verify:
//! 1. Leverage invariance — leverage changes margin, never P&L
//! 2. Affordability — the max affordable quantity passes the broker gate
//! 3. Margin calls — non-positive equity always triggers
//! 4. Engine accounting — final capital equals initial plus trade P&L
//! 5. Engine leverage invariance — identical trades at 5x and 50x when both fit

use chrono::{Duration, NaiveDate, NaiveDateTime};
use edgelab_core::domain::{AssetClass, Bar, Direction, MarketSpec};
use edgelab_core::economics::{margin_call, pnl, Broker};
use edgelab_core::engine::{BacktestConfig, BacktestEngine};
use edgelab_core::strategy::Signal;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_quantity() -> impl Strategy<Value = f64> {
    (0.01..1000.0_f64).prop_map(|q| (q * 100.0).round() / 100.0)
}

fn arb_leverage() -> impl Strategy<Value = f64> {
    prop_oneof![Just(1.0), Just(5.0), Just(10.0), Just(20.0), Just(50.0), Just(125.0)]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

/// Random-walk closes with a fixed ±1% range around each close.
fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.02..0.02_f64, 20..120).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price *= 1.0 + s;
                price
            })
            .collect()
    })
}

fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

fn bars_from(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(ts(i), c, c * 1.01, c * 0.99, c, 1_000.0))
        .collect()
}

/// Alternating long/short entries every `spacing` bars with a 3% stop and
/// 6% target.
fn periodic_signals(bars: &[Bar], spacing: usize) -> Vec<Signal> {
    bars.iter()
        .enumerate()
        .step_by(spacing)
        .map(|(k, bar)| {
            let direction = if (k / spacing) % 2 == 0 { Direction::Long } else { Direction::Short };
            let sign = direction.sign();
            Signal::entry(bar.timestamp, direction, bar.close, bar.close * (1.0 - sign * 0.03))
                .with_target(bar.close * (1.0 + sign * 0.06))
                .with_max_hold(spacing.saturating_sub(1).max(1))
        })
        .collect()
}

fn engine(leverage: f64, capital: f64, risk_fraction: f64) -> BacktestEngine {
    let spec = MarketSpec::new("PROP", AssetClass::Crypto)
        .with_leverage(leverage)
        .with_commission_rate(0.0005);
    let mut config = BacktestConfig::with_capital(capital);
    config.sizing.risk_fraction = risk_fraction;
    BacktestEngine::new(spec, config).unwrap()
}

// ── 1. Leverage Invariance ───────────────────────────────────────────

proptest! {
    /// Unrealized and realized P&L do not depend on leverage.
    #[test]
    fn pnl_independent_of_leverage(
        entry in arb_price(),
        exit in arb_price(),
        qty in arb_quantity(),
        direction in arb_direction(),
        leverage in arb_leverage(),
    ) {
        let unlevered = MarketSpec::new("X", AssetClass::Crypto);
        let levered = MarketSpec::new("X", AssetClass::Crypto).with_leverage(leverage);
        prop_assert_eq!(
            unlevered.realized_pnl(entry, exit, qty, direction),
            levered.realized_pnl(entry, exit, qty, direction)
        );
        prop_assert_eq!(
            levered.unrealized_pnl(entry, exit, qty, direction),
            pnl(entry, exit, qty, direction)
        );
    }

    /// Margin scales inversely with leverage for non-futures markets.
    #[test]
    fn margin_times_leverage_is_notional(
        entry in arb_price(),
        qty in arb_quantity(),
        leverage in arb_leverage(),
    ) {
        let spec = MarketSpec::new("X", AssetClass::Crypto).with_leverage(leverage);
        let margin = spec.margin(entry, qty, false);
        prop_assert!((margin * leverage - entry * qty).abs() <= 1e-9 * entry * qty);
    }

    /// Long and short P&L on the same move are exact opposites.
    #[test]
    fn long_short_pnl_antisymmetric(entry in arb_price(), exit in arb_price(), qty in arb_quantity()) {
        let long = pnl(entry, exit, qty, Direction::Long);
        let short = pnl(entry, exit, qty, Direction::Short);
        prop_assert!((long + short).abs() < 1e-9);
    }
}

// ── 2. Affordability ─────────────────────────────────────────────────

proptest! {
    /// The max affordable quantity (shaved for float error) always passes
    /// the broker's margin-plus-commission check.
    #[test]
    fn max_affordable_passes_gate(
        entry in arb_price(),
        cash in 100.0..1_000_000.0_f64,
        leverage in arb_leverage(),
    ) {
        let spec = MarketSpec::new("X", AssetClass::Crypto)
            .with_leverage(leverage)
            .with_commission_rate(0.001);
        let qty = spec.max_affordable_quantity(entry, cash, 0.001) * (1.0 - 1e-9);
        let broker = Broker::new(spec, 0.5);
        prop_assert!(broker.can_afford(entry, qty, cash, false).affordable);
        prop_assert!(!broker.can_afford(entry, qty * 1.01, cash, false).affordable);
    }

    /// Adjusted quantity never exceeds the request and is never negative.
    #[test]
    fn adjusted_quantity_bounded(
        entry in arb_price(),
        desired in arb_quantity(),
        cash in 0.0..100_000.0_f64,
    ) {
        let spec = MarketSpec::new("X", AssetClass::Crypto).with_leverage(10.0);
        let adjusted = Broker::new(spec, 0.5).adjust_quantity_for_cash(entry, desired, cash);
        prop_assert!(adjusted >= 0.0);
        prop_assert!(adjusted <= desired);
    }
}

// ── 3. Margin Calls ──────────────────────────────────────────────────

proptest! {
    /// Equity at or below zero triggers whenever margin is in use,
    /// regardless of the configured level.
    #[test]
    fn non_positive_equity_always_calls(
        equity in -10_000.0..=0.0_f64,
        margin in 0.01..10_000.0_f64,
        level in 0.0..2.0_f64,
    ) {
        prop_assert!(margin_call(equity, margin, level));
    }

    /// No margin in use never triggers.
    #[test]
    fn zero_margin_never_calls(equity in -10_000.0..10_000.0_f64, level in 0.0..2.0_f64) {
        prop_assert!(!margin_call(equity, 0.0, level));
    }
}

// ── 4. Engine Accounting ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every position is closed by the end, so final capital reconciles
    /// exactly with the trade log and the curve has one point per bar plus
    /// the initial one.
    #[test]
    fn final_capital_reconciles(closes in arb_closes(), spacing in 3usize..15) {
        let bars = bars_from(&closes);
        let signals = periodic_signals(&bars, spacing);
        let result = engine(10.0, 10_000.0, 0.01).simulate(&signals, &bars, "prop");

        let total: f64 = result.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((result.final_capital - (10_000.0 + total)).abs() < 1e-6);
        prop_assert_eq!(result.equity_curve.len(), bars.len() + 1);
        prop_assert_eq!(result.equity_curve[0].equity, 10_000.0);
        prop_assert!(result.max_drawdown <= 0.0);
        for trade in &result.trades {
            prop_assert!(trade.exit_bar >= trade.entry_bar);
            prop_assert!(trade.commission >= 0.0);
        }
    }

    /// Trades never overlap: each entry comes after the previous exit.
    #[test]
    fn one_position_at_a_time(closes in arb_closes(), spacing in 2usize..10) {
        let bars = bars_from(&closes);
        let signals = periodic_signals(&bars, spacing);
        let result = engine(10.0, 10_000.0, 0.01).simulate(&signals, &bars, "prop");
        for pair in result.trades.windows(2) {
            prop_assert!(pair[1].entry_bar >= pair[0].exit_bar);
        }
    }
}

// ── 5. Engine Leverage Invariance ────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// With risk small enough that every entry fits at both leverages, the
    /// trade log is identical: leverage only moves the margin requirement.
    #[test]
    fn engine_pnl_leverage_invariant(closes in arb_closes(), spacing in 3usize..12) {
        let bars = bars_from(&closes);
        let signals = periodic_signals(&bars, spacing);
        let low = engine(5.0, 1_000_000.0, 0.001).simulate(&signals, &bars, "prop");
        let high = engine(50.0, 1_000_000.0, 0.001).simulate(&signals, &bars, "prop");

        prop_assert_eq!(low.total_trades, high.total_trades);
        for (a, b) in low.trades.iter().zip(&high.trades) {
            prop_assert_eq!(a.quantity, b.quantity);
            prop_assert!((a.pnl - b.pnl).abs() < 1e-9);
        }
    }
}
