//! Permutation test — reorder realized trade P&Ls.
//!
//! Final P&L, profit factor and win rate are the same under every shuffle, so
//! this test scores only the metrics that depend on trade order: any such
//! configured metric, plus max drawdown and recovery factor. A strategy whose
//! realized order keeps losses apart draws down less than its shuffles.

use super::{McError, McTestResult, MonteCarloSuite, Observed};
use crate::metrics::{evaluate_all, path_metrics};
use crate::suitability::TestKind;
use rand::seq::SliceRandom;

impl MonteCarloSuite {
    pub(crate) fn permutation_test(&self, observed: &Observed<'_>) -> Result<McTestResult, McError> {
        if observed.pnls.len() < 2 {
            return Ok(McTestResult::skipped("fewer than two trades to reorder"));
        }
        let metrics = path_metrics(&self.config().metrics);
        let values = evaluate_all(&metrics, &observed.pnls, observed.initial, observed.periods_per_year);
        let samples = self.run_iterations(TestKind::Permutation, |rng| {
            let mut shuffled = observed.pnls.clone();
            shuffled.shuffle(rng);
            evaluate_all(&metrics, &shuffled, observed.initial, observed.periods_per_year)
        })?;
        Ok(self.summarize(&metrics, &values, &samples))
    }
}
