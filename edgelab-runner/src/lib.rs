//! EdgeLab Runner — robustness validation on top of `edgelab-core`.
//!
//! This crate provides:
//! - Enhanced performance metrics derived from a backtest
//! - Suitability assessment deciding which Monte Carlo tests are meaningful
//! - The conditional Monte Carlo suite (permutation, bootstrap, randomized entry)
//! - Parameter sensitivity sweeps
//! - The training validator that turns all of the above into a verdict
//! - TOML validation config, CSV bar loading, progress and cancellation

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod monte_carlo;
pub mod progress;
pub mod sensitivity;
pub mod suitability;
pub mod validator;

pub use config::{ConfigError, McConfig, RunId, SuitabilityConfig, ValidationConfig, ValidationCriteria};
pub use data_loader::{load_bars_csv, read_bars_csv, LoadError};
pub use metrics::{EnhancedMetrics, MetricKind};
pub use monte_carlo::{CombinedScore, McError, McTestResult, MonteCarloSuite, MonteCarloSuiteResult};
pub use progress::{CancelToken, ProgressEvent, ProgressFn};
pub use sensitivity::{
    GridPoint, ParamGrid, ParamSensitivity, SensitivityAnalyzer, SensitivityError, SensitivityReport,
    SensitivityRequest, SweepMetric,
};
pub use suitability::{
    StrategyProfile, StrategyType, SuitabilityAssessor, SuitabilityMap, TestKind, TestSuitability,
};
pub use validator::{TrainingValidationResult, TrainingValidator, ValidationError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ValidationConfig>();
        assert_sync::<ValidationConfig>();
        assert_send::<McConfig>();
        assert_sync::<McConfig>();
    }

    #[test]
    fn monte_carlo_suite_is_send_sync() {
        assert_send::<MonteCarloSuite>();
        assert_sync::<MonteCarloSuite>();
        assert_send::<MonteCarloSuiteResult>();
        assert_sync::<MonteCarloSuiteResult>();
    }

    #[test]
    fn validator_is_send_sync() {
        assert_send::<TrainingValidator>();
        assert_sync::<TrainingValidator>();
        assert_send::<TrainingValidationResult>();
        assert_sync::<TrainingValidationResult>();
    }

    #[test]
    fn analyzers_are_send_sync() {
        assert_send::<SuitabilityAssessor>();
        assert_sync::<SuitabilityAssessor>();
        assert_send::<SensitivityAnalyzer<'static>>();
        assert_sync::<SensitivityAnalyzer<'static>>();
        assert_send::<CancelToken>();
        assert_sync::<CancelToken>();
    }
}
