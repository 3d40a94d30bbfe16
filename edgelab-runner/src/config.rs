//! Serializable validation configuration.
//!
//! One TOML document drives a validation run:
//!
//! ```toml
//! [criteria]
//! min_profit_factor = 1.3
//! min_trades = 40
//!
//! [monte_carlo]
//! iterations = 2000
//! seed = 7
//! metrics = ["final_pnl", "sharpe_ratio", "profit_factor"]
//!
//! [suitability]
//! min_trades_bootstrap = 30
//!
//! [backtest]
//! initial_capital = 25000.0
//! ```
//!
//! Every section and field is optional; omitted values take the defaults below.

use crate::metrics::MetricKind;
use edgelab_core::domain::MarketSpec;
use edgelab_core::engine::BacktestConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Unique identifier for a validation run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Criteria ────────────────────────────────────────────────────────

/// Pass/fail thresholds. Supplied by the caller, never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationCriteria {
    pub min_profit_factor: f64,
    pub min_sharpe: f64,
    pub min_trades: usize,
    /// Combined Monte Carlo score (0–100).
    pub min_mc_score: f64,
    /// Combined Monte Carlo percentile (0–100).
    pub min_mc_percentile: f64,
    /// A metric passes its test when its p-value is at most this.
    pub max_p_value: f64,
    pub max_sensitivity_cv: f64,
    /// Whether a failed sensitivity check fails the whole run.
    pub sensitivity_mandatory: bool,
}

impl Default for ValidationCriteria {
    fn default() -> Self {
        Self {
            min_profit_factor: 1.2,
            min_sharpe: 0.5,
            min_trades: 30,
            min_mc_score: 60.0,
            min_mc_percentile: 60.0,
            max_p_value: 0.05,
            max_sensitivity_cv: 0.3,
            sensitivity_mandatory: false,
        }
    }
}

// ─── Monte Carlo ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// Resamples per test.
    pub iterations: usize,
    /// Master seed; every iteration derives its own sub-stream from it.
    pub seed: u64,
    /// Metrics each test computes p-values for.
    pub metrics: Vec<MetricKind>,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: 42,
            metrics: vec![
                MetricKind::FinalPnl,
                MetricKind::SharpeRatio,
                MetricKind::ProfitFactor,
            ],
        }
    }
}

// ─── Suitability ─────────────────────────────────────────────────────

/// Thresholds for deciding which Monte Carlo tests are meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConfig {
    pub min_trades_permutation: usize,
    pub min_trades_bootstrap: usize,
    /// Below this per-trade return CV, returns are treated as constant.
    pub min_return_cv: f64,
    /// Above this share of trades exiting at a repeated offset, reordering
    /// trades cannot change outcomes.
    pub max_exit_uniformity: f64,
    pub min_bars_randomized: usize,
    /// Pilot-permutation final-equity CV below which permutation weight is halved.
    pub min_final_equity_cv: f64,
    /// Pilot-permutation max-drawdown CV below which permutation is unsuitable.
    pub min_path_cv: f64,
    /// Pilot replays stop trading once equity falls to this fraction of the
    /// initial capital.
    pub ruin_fraction: f64,
    pub pilot_permutations: usize,
    /// How many of the most frequent exit offsets count towards uniformity.
    pub uniformity_patterns: usize,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            min_trades_permutation: 20,
            min_trades_bootstrap: 20,
            min_return_cv: 0.05,
            max_exit_uniformity: 0.8,
            min_bars_randomized: 100,
            min_final_equity_cv: 0.01,
            min_path_cv: 0.01,
            ruin_fraction: 0.5,
            pilot_permutations: 20,
            uniformity_patterns: 2,
        }
    }
}

// ─── Run config ──────────────────────────────────────────────────────

/// Everything needed to reproduce one validation run, apart from the
/// strategy, market and bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub criteria: ValidationCriteria,
    pub monte_carlo: McConfig,
    pub suitability: SuitabilityConfig,
    pub backtest: BacktestConfig,
}

impl ValidationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk. A missing file is a configuration error, not retried.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.criteria;
        if !(0.0..=1.0).contains(&c.max_p_value) {
            return Err(ConfigError::Invalid(format!(
                "max_p_value must be in [0, 1], got {}",
                c.max_p_value
            )));
        }
        if !(0.0..=100.0).contains(&c.min_mc_score) || !(0.0..=100.0).contains(&c.min_mc_percentile) {
            return Err(ConfigError::Invalid(
                "min_mc_score and min_mc_percentile must be in [0, 100]".into(),
            ));
        }
        if c.max_sensitivity_cv < 0.0 {
            return Err(ConfigError::Invalid("max_sensitivity_cv must be non-negative".into()));
        }
        if self.monte_carlo.iterations == 0 {
            return Err(ConfigError::Invalid("monte_carlo.iterations must be >= 1".into()));
        }
        if self.monte_carlo.metrics.is_empty() {
            return Err(ConfigError::Invalid("monte_carlo.metrics must not be empty".into()));
        }
        let s = &self.suitability;
        if !(0.0..=1.0).contains(&s.max_exit_uniformity) {
            return Err(ConfigError::Invalid("max_exit_uniformity must be in [0, 1]".into()));
        }
        if s.uniformity_patterns == 0 {
            return Err(ConfigError::Invalid("uniformity_patterns must be >= 1".into()));
        }
        if s.pilot_permutations < 2 {
            return Err(ConfigError::Invalid("pilot_permutations must be >= 2".into()));
        }
        if !(0.0..1.0).contains(&s.ruin_fraction) {
            return Err(ConfigError::Invalid("ruin_fraction must be in [0, 1)".into()));
        }
        self.backtest
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Deterministic fingerprint of this config and the market it runs on.
    ///
    /// Two runs with identical config and market share a RunId.
    pub fn run_id(&self, spec: &MarketSpec) -> Result<RunId, ConfigError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(self)?);
        hasher.update(&serde_json::to_vec(spec)?);
        Ok(hasher.finalize().to_hex().to_string())
    }
}
