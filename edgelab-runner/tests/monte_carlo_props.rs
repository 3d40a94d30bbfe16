//! Property tests for null-distribution scoring and suitability.
//!
//! Properties:
//! 1. p-value and percentile stay in range and agree with each other
//! 2. Raising the observed value never raises its p-value
//! 3. Combined score is bounded by the scores of the tests that ran
//! 4. Fewer trades than either minimum makes both resampling tests unsuitable

use edgelab_runner::monte_carlo::{combine, null_statistics};
use edgelab_runner::{
    McTestResult, MonteCarloSuiteResult, StrategyProfile, StrategyType, SuitabilityAssessor,
    SuitabilityConfig, TestKind,
};
use proptest::prelude::*;

fn arb_null() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0..1_000.0f64, 1..200)
}

fn ran(score: f64, percentile: f64) -> McTestResult {
    McTestResult {
        score,
        percentile,
        iterations: 10,
        ..McTestResult::default()
    }
}

// ── 1. Ranges ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn statistics_in_range(null in arb_null(), observed in -1_500.0..1_500.0f64) {
        let s = null_statistics(observed, &null);
        prop_assert!((0.0..=1.0).contains(&s.p_value));
        prop_assert!((0.0..=100.0).contains(&s.percentile));
        prop_assert!((0.0..=100.0).contains(&s.score));
        // share strictly below plus share at-or-above is everything
        let below = null.iter().filter(|&&v| v < observed - 1e-9 * observed.abs().max(1.0)).count();
        prop_assert!((s.p_value - (null.len() - below) as f64 / null.len() as f64).abs() < 1e-12);
    }
}

// ── 2. Monotonicity ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn higher_observed_never_less_significant(
        null in arb_null(),
        low in -1_500.0..1_500.0f64,
        bump in 0.0..500.0f64,
    ) {
        let a = null_statistics(low, &null);
        let b = null_statistics(low + bump, &null);
        prop_assert!(b.p_value <= a.p_value + 1e-12);
        prop_assert!(b.score >= a.score - 1e-9);
    }
}

// ── 3. Combination ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn combined_between_min_and_max(
        scores in prop::array::uniform3(0.0..100.0f64),
        skips in prop::array::uniform3(any::<bool>()),
        n_trades in 30usize..200,
    ) {
        let assessor = SuitabilityAssessor::new(SuitabilityConfig::default(), 1);
        let profile = StrategyProfile {
            strategy_type: StrategyType::PathDependent,
            return_cv: 1.5,
            mean_return: 0.01,
            return_std: 0.015,
            exit_uniformity: 0.1,
            n_trades,
            n_bars: 2_000,
            avg_bars_held: 5.0,
            final_equity_cv: 0.2,
            path_cv: 0.2,
        };
        let suitability = assessor.get_test_suitability(&profile);
        prop_assert!(suitability.values().all(|s| s.suitable));

        let pick = |i: usize| if skips[i] { McTestResult::skipped("off") } else { ran(scores[i], scores[i]) };
        let results = MonteCarloSuiteResult {
            permutation: pick(0),
            bootstrap: pick(1),
            randomized_entry: pick(2),
            combined: Default::default(),
        };
        let combined = combine(&results, &suitability);

        let used: Vec<f64> = (0..3).filter(|&i| !skips[i]).map(|i| scores[i]).collect();
        prop_assert_eq!(combined.tests_used.len(), used.len());
        if used.is_empty() {
            prop_assert_eq!(combined.score, 0.0);
        } else {
            let lo = used.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = used.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(combined.score >= lo - 1e-9 && combined.score <= hi + 1e-9);
        }
    }
}

// ── 4. Suitability Floors ────────────────────────────────────────────

proptest! {
    #[test]
    fn too_few_trades_blocks_resampling(n_trades in 0usize..20, return_cv in 0.0..3.0f64) {
        let assessor = SuitabilityAssessor::new(SuitabilityConfig::default(), 1);
        let profile = StrategyProfile {
            strategy_type: StrategyType::PathDependent,
            return_cv,
            mean_return: 0.0,
            return_std: 0.0,
            exit_uniformity: 0.0,
            n_trades,
            n_bars: 500,
            avg_bars_held: 3.0,
            final_equity_cv: 0.0,
            path_cv: 0.0,
        };
        let map = assessor.get_test_suitability(&profile);
        prop_assert!(!map[&TestKind::Permutation].suitable);
        prop_assert!(!map[&TestKind::Bootstrap].suitable);
        prop_assert!(map[&TestKind::Permutation].alternatives.iter().all(|a| a != "permutation"));
    }
}
