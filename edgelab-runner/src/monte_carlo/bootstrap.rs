//! Bootstrap test — resample trade P&Ls with replacement under a zero-edge null.
//!
//! P&Ls are demeaned before resampling, so the null keeps the observed
//! dispersion but has no average edge. Each resample draws as many trades as
//! were realized.

use super::{McError, McTestResult, MonteCarloSuite, Observed};
use crate::metrics::evaluate_all;
use crate::suitability::TestKind;
use edgelab_core::stats;
use rand::Rng;

impl MonteCarloSuite {
    pub(crate) fn bootstrap_test(&self, observed: &Observed<'_>) -> Result<McTestResult, McError> {
        let n = observed.pnls.len();
        if n < 2 {
            return Ok(McTestResult::skipped("fewer than two trades to resample"));
        }
        let mean = stats::mean(&observed.pnls);
        let centered: Vec<f64> = observed.pnls.iter().map(|p| p - mean).collect();
        let metrics = &self.config().metrics;

        let samples = self.run_iterations(TestKind::Bootstrap, |rng| {
            let resampled: Vec<f64> = (0..n).map(|_| centered[rng.gen_range(0..n)]).collect();
            evaluate_all(metrics, &resampled, observed.initial, observed.periods_per_year)
        })?;
        Ok(self.summarize(metrics, &observed.values, &samples))
    }
}
