//! Criterion benchmarks for EdgeLab hot paths.
//!
//! Benchmarks:
//! 1. Full backtest (signal generation + simulation)
//! 2. Simulation loop alone over pre-generated signals
//! 3. Indicator compute (SMA)
//! 4. Intrabar exit resolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use edgelab_core::domain::{AssetClass, Bar, Direction, MarketSpec};
use edgelab_core::engine::intrabar::resolve_exit;
use edgelab_core::engine::{BacktestConfig, BacktestEngine, IntrabarPolicy};
use edgelab_core::indicators::{Indicator, Sma};
use edgelab_core::strategy::{Frames, MaCrossStrategy, Strategy, BASE_TIMEFRAME};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar::new(
                base + chrono::Duration::days(i as i64),
                close - 0.3,
                close + 1.5,
                close - 1.5,
                close,
                1_000_000.0 + (i % 500_000) as f64,
            )
        })
        .collect()
}

fn make_engine() -> BacktestEngine {
    let spec = MarketSpec::new("BENCH", AssetClass::Crypto)
        .with_leverage(10.0)
        .with_commission_rate(0.0004);
    BacktestEngine::new(spec, BacktestConfig::with_capital(100_000.0)).unwrap()
}

// ── 1. Full Backtest ─────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_run");
    let engine = make_engine();
    let strategy = MaCrossStrategy::new(10, 30, 0.02, 2.0).unwrap();

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        group.bench_with_input(BenchmarkId::new("ma_cross", bar_count), &bar_count, |b, _| {
            b.iter(|| engine.run(black_box(&strategy), black_box(&bars)))
        });
    }

    group.finish();
}

// ── 2. Simulation Loop ───────────────────────────────────────────────

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_loop");
    let engine = make_engine();
    let strategy = MaCrossStrategy::new(10, 30, 0.02, 2.0).unwrap();

    for &bar_count in &[1260, 2520, 10_080] {
        let bars = make_bars(bar_count);
        let mut frames = Frames::new();
        frames.insert(BASE_TIMEFRAME.to_string(), bars.clone());
        let signals = strategy.generate_signals(&frames).unwrap();

        group.bench_with_input(
            BenchmarkId::new("presignaled", bar_count),
            &bar_count,
            |b, _| b.iter(|| engine.simulate(black_box(&signals), black_box(&bars), "bench")),
        );
    }

    group.finish();
}

// ── 3. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_compute");

    for &bar_count in &[252, 2520] {
        let bars = make_bars(bar_count);
        let sma = Sma::new(20);

        group.bench_with_input(BenchmarkId::new("sma_20", bar_count), &bar_count, |b, _| {
            b.iter(|| sma.compute(black_box(&bars)))
        });
    }

    group.finish();
}

// ── 4. Intrabar Resolution ───────────────────────────────────────────

fn bench_intrabar(c: &mut Criterion) {
    let mut group = c.benchmark_group("intrabar_exit");
    let bars = make_bars(1_000);

    for policy in [IntrabarPolicy::WorstCase, IntrabarPolicy::OhlcPath] {
        group.bench_function(format!("{policy:?}"), |b| {
            b.iter(|| {
                bars.iter()
                    .filter_map(|bar| {
                        resolve_exit(
                            Direction::Long,
                            black_box(bar.close - 1.0),
                            Some(black_box(bar.close + 1.0)),
                            bar,
                            policy,
                        )
                    })
                    .count()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_backtest,
    bench_simulate,
    bench_indicators,
    bench_intrabar,
);
criterion_main!(benches);
