//! Training validator — the pass/fail verdict for one strategy on one market.
//!
//! Pipeline, run front to back with no early exit:
//! 1. backtest and enhanced metrics
//! 2. quality checks (profit factor, Sharpe, trade count)
//! 3. suitability assessment
//! 4. Monte Carlo suite, restricted to suitable tests
//! 5. optional parameter sensitivity
//! 6. aggregate verdict
//!
//! Every check lands in `criteria_checks`; every failed one also appends a
//! `"<check>: <observed> <op> <threshold>"` line to `failure_reasons`.

use edgelab_core::domain::{Bar, MarketSpec};
use edgelab_core::engine::{BacktestEngine, BacktestResult, EngineError};
use edgelab_core::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, RunId, ValidationConfig, ValidationCriteria};
use crate::metrics::EnhancedMetrics;
use crate::monte_carlo::{McError, MonteCarloSuite, MonteCarloSuiteResult};
use crate::progress::{CancelToken, ProgressFn};
use crate::sensitivity::{SensitivityAnalyzer, SensitivityReport, SensitivityRequest};
use crate::suitability::{StrategyProfile, SuitabilityAssessor, SuitabilityMap, TestKind};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),

    #[error("monte carlo failed: {0}")]
    MonteCarlo(#[from] McError),

    #[error("sensitivity analysis failed: {0:#}")]
    Sensitivity(anyhow::Error),
}

// ─── Result ──────────────────────────────────────────────────────────

/// Terminal artifact of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingValidationResult {
    pub passed: bool,
    pub backtest_result: BacktestResult,
    pub enhanced_metrics: EnhancedMetrics,
    pub strategy_profile: StrategyProfile,
    pub test_suitability: SuitabilityMap,
    pub monte_carlo_results: MonteCarloSuiteResult,
    pub sensitivity_results: Option<SensitivityReport>,
    pub criteria_checks: BTreeMap<String, bool>,
    /// Failed checks in evaluation order.
    pub failure_reasons: Vec<String>,
    pub run_id: RunId,
}

/// Outcome of the per-test significance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndividualTests {
    pub suitable: usize,
    pub passed: usize,
    /// `None` when no test was suitable.
    pub required: Option<usize>,
}

impl IndividualTests {
    pub fn pass(&self) -> bool {
        self.required.is_some_and(|required| self.passed >= required)
    }
}

/// Passes needed out of `suitable` tests: 3 ⇒ 2, 2 ⇒ 1, 1 ⇒ 1, none ⇒ impossible.
pub fn required_passes(suitable: usize) -> Option<usize> {
    match suitable {
        0 => None,
        1 | 2 => Some(1),
        n => Some(n / 2 + 1),
    }
}

/// Count suitable tests and how many of them showed a significant majority.
/// A suitable test that was skipped anyway (too few trades to resample)
/// counts as not passing.
pub fn individual_tests_pass(
    mc: &MonteCarloSuiteResult,
    suitability: &SuitabilityMap,
    max_p_value: f64,
) -> IndividualTests {
    let suitable: Vec<TestKind> = TestKind::all()
        .into_iter()
        .filter(|kind| suitability.get(kind).is_some_and(|s| s.suitable))
        .collect();
    let passed = suitable
        .iter()
        .filter(|kind| mc.get(**kind).majority_pass(max_p_value))
        .count();
    IndividualTests {
        suitable: suitable.len(),
        passed,
        required: required_passes(suitable.len()),
    }
}

// ─── Check ledger ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Checks {
    results: BTreeMap<String, bool>,
    failures: Vec<String>,
}

impl Checks {
    fn record(&mut self, name: &str, ok: bool, reason: impl FnOnce() -> String) -> bool {
        self.results.insert(name.to_string(), ok);
        if !ok {
            let reason = format!("{name}: {}", reason());
            warn!(check = name, %reason, "check failed");
            self.failures.push(reason);
        }
        ok
    }

    fn at_least(&mut self, name: &str, observed: f64, threshold: f64) -> bool {
        self.record(name, observed >= threshold, || format!("{observed:.4} < {threshold}"))
    }

    fn at_most(&mut self, name: &str, observed: f64, threshold: f64) -> bool {
        self.record(name, observed <= threshold, || format!("{observed:.4} > {threshold}"))
    }
}

// ─── Validator ───────────────────────────────────────────────────────

pub struct TrainingValidator {
    engine: BacktestEngine,
    config: ValidationConfig,
    progress: Option<ProgressFn>,
    cancel: Option<CancelToken>,
}

impl std::fmt::Debug for TrainingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingValidator")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl TrainingValidator {
    /// Validator for one market. The engine is built from `config.backtest`.
    pub fn new(spec: MarketSpec, config: ValidationConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let engine = BacktestEngine::new(spec, config.backtest.clone())?;
        Ok(Self {
            engine,
            config,
            progress: None,
            cancel: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn engine(&self) -> &BacktestEngine {
        &self.engine
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(
        &self,
        strategy: &dyn Strategy,
        bars: &[Bar],
        sensitivity: Option<&SensitivityRequest<'_>>,
    ) -> Result<TrainingValidationResult, ValidationError> {
        let run_id = self.config.run_id(self.engine.spec())?;
        let criteria = &self.config.criteria;
        info!(run_id = %run_id, strategy = strategy.name(), symbol = %self.engine.spec().symbol, "validation started");

        let backtest_result = self.engine.run(strategy, bars)?;
        let enhanced_metrics = EnhancedMetrics::compute(&backtest_result);

        let mut checks = Checks::default();
        let quality = quality_checks(&mut checks, &enhanced_metrics, criteria);

        let assessor = SuitabilityAssessor::new(self.config.suitability.clone(), self.config.monte_carlo.seed);
        let strategy_profile = assessor.assess_strategy(&backtest_result);
        let test_suitability = assessor.get_test_suitability(&strategy_profile);

        let mut suite = MonteCarloSuite::new(self.config.monte_carlo.clone());
        if let Some(progress) = &self.progress {
            suite = suite.with_progress(progress.clone());
        }
        if let Some(cancel) = &self.cancel {
            suite = suite.with_cancel(cancel.clone());
        }
        let monte_carlo_results = suite.run_conditional(&backtest_result, bars, &self.engine, &test_suitability)?;
        let mc_ok = mc_checks(&mut checks, &monte_carlo_results, &test_suitability, criteria);

        let mut passed = quality && mc_ok;

        let sensitivity_results = match sensitivity {
            Some(request) => {
                let report = SensitivityAnalyzer::new(&self.engine, request.factory)
                    .run(bars, &request.base_params, &request.grid, request.metric)
                    .map_err(ValidationError::Sensitivity)?;
                let stable = sensitivity_checks(&mut checks, &report, criteria);
                if criteria.sensitivity_mandatory {
                    passed &= stable;
                }
                Some(report)
            }
            None => None,
        };

        info!(
            run_id = %run_id,
            passed,
            failures = checks.failures.len(),
            mc_score = monte_carlo_results.combined.score,
            "validation verdict"
        );

        Ok(TrainingValidationResult {
            passed,
            backtest_result,
            enhanced_metrics,
            strategy_profile,
            test_suitability,
            monte_carlo_results,
            sensitivity_results,
            criteria_checks: checks.results,
            failure_reasons: checks.failures,
            run_id,
        })
    }
}

/// Thresholds read from the enhanced metrics, which is what the verdict
/// reports.
fn quality_checks(checks: &mut Checks, metrics: &EnhancedMetrics, criteria: &ValidationCriteria) -> bool {
    // evaluate all three so every failure is reported
    let pf = checks.at_least("min_profit_factor", metrics.profit_factor, criteria.min_profit_factor);
    let sharpe = checks.at_least("min_sharpe", metrics.sharpe_ratio, criteria.min_sharpe);
    let trades = checks.record("min_trades", metrics.total_trades >= criteria.min_trades, || {
        format!("{} < {}", metrics.total_trades, criteria.min_trades)
    });
    pf && sharpe && trades
}

fn mc_checks(
    checks: &mut Checks,
    mc: &MonteCarloSuiteResult,
    suitability: &SuitabilityMap,
    criteria: &ValidationCriteria,
) -> bool {
    let score = checks.at_least("mc_score", mc.combined.score, criteria.min_mc_score);
    let percentile = checks.at_least("mc_percentile", mc.combined.percentile, criteria.min_mc_percentile);

    let individual = individual_tests_pass(mc, suitability, criteria.max_p_value);
    let individual_ok = checks.record("mc_individual_tests", individual.pass(), || match individual.required {
        Some(required) => format!(
            "{} of {} suitable tests significant < {required} required",
            individual.passed, individual.suitable
        ),
        None => "0 suitable tests < 1 required".to_string(),
    });
    score && percentile && individual_ok
}

fn sensitivity_checks(checks: &mut Checks, report: &SensitivityReport, criteria: &ValidationCriteria) -> bool {
    let mut all_ok = true;
    for (param, s) in &report.per_param {
        all_ok &= checks.at_most(&format!("sensitivity_{param}_cv"), s.cv, criteria.max_sensitivity_cv);
    }
    let worst = report.per_param.values().map(|s| s.cv).fold(0.0, f64::max);
    checks.record("sensitivity_cv", all_ok, || {
        format!("{worst:.4} > {}", criteria.max_sensitivity_cv)
    })
}
