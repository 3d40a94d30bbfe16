//! Monte Carlo suite — permutation, bootstrap and randomized-entry null tests.
//!
//! Each test builds a null distribution of the configured metrics and scores
//! the observed values against it. The permutation test scores the
//! order-dependent metrics instead (see [`crate::metrics::path_metrics`]):
//!
//! - p-value: share of null values ≥ observed (one-sided, ties count).
//! - percentile: rank of the observed value in the null (ties count half).
//! - score: 100 × Φ(z) of the observed value against the null's mean and std,
//!   50 when the null has no dispersion.
//!
//! Tests run only when the suitability map marks them suitable; the rest are
//! reported with `skipped: true` and excluded from the combined score.
//!
//! Iterations run on the rayon pool. Iteration `i` of test `t` draws from
//! `RngHierarchy::rng_for(t, i)`, so results are identical at any thread count.

pub mod bootstrap;
pub mod permutation;
pub mod randomized_entry;

use crate::config::McConfig;
use crate::metrics::{evaluate_all, trades_per_year, MetricKind};
use crate::progress::{CancelToken, ProgressEvent, ProgressFn};
use crate::suitability::{SuitabilityMap, TestKind};
use edgelab_core::domain::Bar;
use edgelab_core::engine::{BacktestEngine, BacktestResult};
use edgelab_core::rng::RngHierarchy;
use edgelab_core::stats;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Relative tolerance under which a null value counts as equal to the observed.
const TIE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum McError {
    #[error("monte carlo {test} test cancelled")]
    Cancelled { test: &'static str },

    #[error("invalid monte carlo config: {0}")]
    InvalidConfig(String),
}

// ─── Result types ────────────────────────────────────────────────────

/// Outcome of one test. Per-metric maps are keyed by [`MetricKind`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct McTestResult {
    pub p_values: BTreeMap<MetricKind, f64>,
    pub observed: BTreeMap<MetricKind, f64>,
    /// Percentile (0–100) of the observed value within the null.
    pub percentiles: BTreeMap<MetricKind, f64>,
    pub null_mean: BTreeMap<MetricKind, f64>,
    pub null_std: BTreeMap<MetricKind, f64>,
    /// Mean of the per-metric scores (0–100).
    pub score: f64,
    /// Mean of the per-metric percentiles (0–100).
    pub percentile: f64,
    pub iterations: usize,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

impl McTestResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Whether strictly more than half of the p-values are ≤ `max_p_value`.
    /// Skipped or empty results never pass.
    pub fn majority_pass(&self, max_p_value: f64) -> bool {
        if self.skipped || self.p_values.is_empty() {
            return false;
        }
        let passing = self.p_values.values().filter(|&&p| p <= max_p_value).count();
        2 * passing > self.p_values.len()
    }
}

/// Priority-weighted aggregate over the tests that ran.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedScore {
    pub score: f64,
    pub percentile: f64,
    pub tests_used: Vec<TestKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSuiteResult {
    pub permutation: McTestResult,
    pub bootstrap: McTestResult,
    pub randomized_entry: McTestResult,
    pub combined: CombinedScore,
}

impl MonteCarloSuiteResult {
    pub fn get(&self, kind: TestKind) -> &McTestResult {
        match kind {
            TestKind::Permutation => &self.permutation,
            TestKind::Bootstrap => &self.bootstrap,
            TestKind::RandomizedEntry => &self.randomized_entry,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TestKind, &McTestResult)> {
        TestKind::all().into_iter().map(move |k| (k, self.get(k)))
    }
}

// ─── Suite ───────────────────────────────────────────────────────────

/// What every test needs from the observed run.
pub(crate) struct Observed<'a> {
    pub result: &'a BacktestResult,
    pub pnls: Vec<f64>,
    pub initial: f64,
    /// Annualization for per-trade Sharpe.
    pub periods_per_year: f64,
    pub values: Vec<f64>,
}

pub struct MonteCarloSuite {
    config: McConfig,
    progress: Option<ProgressFn>,
    cancel: Option<CancelToken>,
}

impl std::fmt::Debug for MonteCarloSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonteCarloSuite")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl MonteCarloSuite {
    pub fn new(config: McConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &McConfig {
        &self.config
    }

    /// Run every suitable test and combine the ones that ran.
    pub fn run_conditional(
        &self,
        result: &BacktestResult,
        bars: &[Bar],
        engine: &BacktestEngine,
        suitability: &SuitabilityMap,
    ) -> Result<MonteCarloSuiteResult, McError> {
        if self.config.iterations == 0 {
            return Err(McError::InvalidConfig("iterations must be >= 1".into()));
        }
        if self.config.metrics.is_empty() {
            return Err(McError::InvalidConfig("at least one metric is required".into()));
        }

        let observed = self.observe(result);
        let run = |kind: TestKind| -> Result<McTestResult, McError> {
            match suitability.get(&kind) {
                Some(s) if s.suitable => {
                    let outcome = match kind {
                        TestKind::Permutation => self.permutation_test(&observed),
                        TestKind::Bootstrap => self.bootstrap_test(&observed),
                        TestKind::RandomizedEntry => self.randomized_entry_test(&observed, bars, engine),
                    }?;
                    info!(
                        test = kind.name(),
                        score = outcome.score,
                        percentile = outcome.percentile,
                        iterations = outcome.iterations,
                        "monte carlo test complete"
                    );
                    Ok(outcome)
                }
                Some(s) => {
                    warn!(test = kind.name(), reason = %s.reason, "monte carlo test skipped");
                    Ok(McTestResult::skipped(s.reason.clone()))
                }
                None => Ok(McTestResult::skipped("no suitability assessment")),
            }
        };

        let permutation = run(TestKind::Permutation)?;
        let bootstrap = run(TestKind::Bootstrap)?;
        let randomized_entry = run(TestKind::RandomizedEntry)?;

        let mut suite = MonteCarloSuiteResult {
            permutation,
            bootstrap,
            randomized_entry,
            combined: CombinedScore::default(),
        };
        suite.combined = combine(&suite, suitability);
        info!(
            score = suite.combined.score,
            percentile = suite.combined.percentile,
            tests = suite.combined.tests_used.len(),
            "monte carlo suite complete"
        );
        Ok(suite)
    }

    pub(crate) fn observe<'a>(&self, result: &'a BacktestResult) -> Observed<'a> {
        let pnls = result.trade_pnls();
        let initial = result.initial_capital;
        let periods_per_year = trades_per_year(result).max(1.0);
        let values = evaluate_all(&self.config.metrics, &pnls, initial, periods_per_year);
        Observed {
            result,
            pnls,
            initial,
            periods_per_year,
            values,
        }
    }

    /// Run `iterations` independent draws in parallel, collected in index
    /// order. Each draw returns one value per configured metric.
    pub(crate) fn run_iterations<F>(&self, test: TestKind, draw: F) -> Result<Vec<Vec<f64>>, McError>
    where
        F: Fn(&mut StdRng) -> Vec<f64> + Sync,
    {
        let total = self.config.iterations;
        let rng = RngHierarchy::new(self.config.seed);
        let completed = AtomicUsize::new(0);

        let samples: Vec<Option<Vec<f64>>> = (0..total)
            .into_par_iter()
            .map(|i| {
                if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                    return None;
                }
                let mut stream = rng.rng_for(test.name(), i as u64);
                let values = draw(&mut stream);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(cb) = &self.progress {
                    cb(&ProgressEvent {
                        test: test.name(),
                        completed: done,
                        total,
                    });
                }
                Some(values)
            })
            .collect();

        samples
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(McError::Cancelled { test: test.name() })
    }

    /// Score observed values against per-iteration null samples. `observed`
    /// and every sample hold one value per entry of `metrics`, in order.
    pub(crate) fn summarize(&self, metrics: &[MetricKind], observed: &[f64], samples: &[Vec<f64>]) -> McTestResult {
        let mut out = McTestResult {
            iterations: samples.len(),
            ..McTestResult::default()
        };
        let mut scores = Vec::with_capacity(metrics.len());
        let mut percentiles = Vec::with_capacity(metrics.len());

        for (m, &kind) in metrics.iter().enumerate() {
            let obs = observed[m];
            let null: Vec<f64> = samples.iter().map(|s| s[m]).collect();
            let stat = null_statistics(obs, &null);
            debug!(
                metric = kind.name(),
                observed = obs,
                p_value = stat.p_value,
                percentile = stat.percentile,
                null_mean = stat.mean,
                null_std = stat.std,
                "metric scored"
            );
            out.observed.insert(kind, obs);
            out.p_values.insert(kind, stat.p_value);
            out.percentiles.insert(kind, stat.percentile);
            out.null_mean.insert(kind, stat.mean);
            out.null_std.insert(kind, stat.std);
            scores.push(stat.score);
            percentiles.push(stat.percentile);
        }
        out.score = stats::mean(&scores);
        out.percentile = stats::mean(&percentiles);
        out
    }
}

// ─── Scoring ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullStatistics {
    pub p_value: f64,
    pub percentile: f64,
    pub score: f64,
    pub mean: f64,
    pub std: f64,
}

/// p-value, percentile and z-score of `observed` within a null sample.
pub fn null_statistics(observed: f64, null: &[f64]) -> NullStatistics {
    if null.is_empty() {
        return NullStatistics {
            p_value: 1.0,
            percentile: 0.0,
            score: 0.0,
            mean: 0.0,
            std: 0.0,
        };
    }
    let tol = TIE_TOLERANCE * observed.abs().max(1.0);
    let n = null.len() as f64;
    let at_or_above = null.iter().filter(|&&v| v >= observed - tol).count();
    let below = null.iter().filter(|&&v| v < observed - tol).count();
    let ties = null.iter().filter(|&&v| (v - observed).abs() <= tol).count();

    let mean = stats::mean(null);
    let std = stats::std_dev(null);
    let score = if std < 1e-12 {
        50.0
    } else {
        match Normal::new(0.0, 1.0) {
            Ok(normal) => 100.0 * normal.cdf((observed - mean) / std),
            Err(_) => 50.0,
        }
    };

    NullStatistics {
        p_value: at_or_above as f64 / n,
        percentile: 100.0 * (below as f64 + 0.5 * ties as f64) / n,
        score,
        mean,
        std,
    }
}

/// Priority-weighted mean of score and percentile over non-skipped tests.
///
/// Zero when no test ran. Equal weights if every test that ran carries zero
/// priority.
pub fn combine(results: &MonteCarloSuiteResult, suitability: &SuitabilityMap) -> CombinedScore {
    let ran: Vec<(TestKind, &McTestResult, f64)> = results
        .iter()
        .filter(|(_, r)| !r.skipped)
        .map(|(k, r)| {
            let priority = suitability
                .get(&k)
                .filter(|s| s.suitable)
                .map_or(0.0, |s| s.priority);
            (k, r, priority)
        })
        .collect();
    if ran.is_empty() {
        return CombinedScore::default();
    }

    let total_weight: f64 = ran.iter().map(|(_, _, w)| w).sum();
    let weight = |w: f64| {
        if total_weight > 0.0 {
            w / total_weight
        } else {
            1.0 / ran.len() as f64
        }
    };

    CombinedScore {
        score: ran.iter().map(|(_, r, w)| r.score * weight(*w)).sum(),
        percentile: ran.iter().map(|(_, r, w)| r.percentile * weight(*w)).sum(),
        tests_used: ran.iter().map(|(k, _, _)| *k).collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use edgelab_core::domain::{Bar, Direction, ExitReason, Trade};
    use edgelab_core::engine::{BacktestResult, EquityPoint, SignalStats};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i as i64)
    }

    /// A result whose trades realize exactly `pnls`, one trade per two bars.
    pub fn result_with_pnls(pnls: &[f64]) -> BacktestResult {
        let n_bars = pnls.len() * 2 + 1;
        let bars: Vec<Bar> = (0..n_bars)
            .map(|i| Bar::new(ts(i), 100.0, 101.0, 99.0, 100.0, 1_000.0))
            .collect();
        let trades: Vec<Trade> = pnls
            .iter()
            .enumerate()
            .map(|(k, &pnl)| Trade {
                direction: Direction::Long,
                entry_bar: 2 * k,
                entry_time: ts(2 * k),
                entry_price: 100.0,
                exit_bar: 2 * k + 1,
                exit_time: ts(2 * k + 1),
                exit_price: 100.0 + pnl / 10.0,
                quantity: 10.0,
                stop_price: 98.0,
                target_price: None,
                gross_pnl: pnl,
                commission: 0.0,
                slippage: 0.0,
                pnl,
                exit_reason: ExitReason::Signal,
            })
            .collect();
        let mut equity = 10_000.0;
        let mut curve = vec![EquityPoint { timestamp: ts(0), equity }];
        for (i, bar) in bars.iter().enumerate() {
            if i % 2 == 1 {
                equity += pnls[i / 2];
            }
            curve.push(EquityPoint { timestamp: bar.timestamp, equity });
        }
        BacktestResult::from_run("fixture", "TEST", trades, curve, 10_000.0, &bars, 0, SignalStats::default())
    }
}
