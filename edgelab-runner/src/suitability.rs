//! Suitability assessment — which Monte Carlo tests are meaningful for a
//! strategy's trade-return profile.
//!
//! A strategy whose exits are fixed by stop/target levels produces nearly
//! identical trade returns; permuting them changes nothing and bootstrapping
//! them adds no information. Randomized entry still works because it
//! re-simulates those exits on new entries, so it is the broad fallback.
//!
//! Permutation needs a path that trade order can move: the pilot shuffles
//! must spread max drawdown by at least `min_path_cv`.
//!
//! Insufficient data never errors: the affected test is marked unsuitable
//! with a reason and skipped downstream.

use crate::config::SuitabilityConfig;
use crate::metrics::coefficient_of_variation;
use edgelab_core::engine::BacktestResult;
use edgelab_core::rng::RngHierarchy;
use edgelab_core::stats;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Bucket width for exit offsets: one basis point of entry price.
const EXIT_BUCKET_WIDTH: f64 = 1e-4;

/// Base aggregation weights.
const PERMUTATION_WEIGHT: f64 = 0.2;
const BOOTSTRAP_WEIGHT: f64 = 0.3;
const RANDOMIZED_ENTRY_WEIGHT: f64 = 0.5;

// ─── Types ───────────────────────────────────────────────────────────

/// Monte Carlo test identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Permutation,
    Bootstrap,
    RandomizedEntry,
}

impl TestKind {
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Permutation => "permutation",
            TestKind::Bootstrap => "bootstrap",
            TestKind::RandomizedEntry => "randomized_entry",
        }
    }

    pub fn all() -> [TestKind; 3] {
        [TestKind::Permutation, TestKind::Bootstrap, TestKind::RandomizedEntry]
    }
}

/// Coarse shape of a strategy's trade returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    /// Fewer than two trades.
    InsufficientSample,
    /// Per-trade returns effectively constant.
    ConstantReturn,
    /// Exits concentrated on a few fixed offsets.
    Mechanical,
    /// Outcomes depend on the price path after entry.
    PathDependent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub strategy_type: StrategyType,
    /// CV of per-trade returns.
    pub return_cv: f64,
    pub mean_return: f64,
    pub return_std: f64,
    /// Share of trades exiting at one of the most frequent offsets.
    pub exit_uniformity: f64,
    pub n_trades: usize,
    pub n_bars: usize,
    pub avg_bars_held: f64,
    /// CV of final equity across pilot permutations. Non-zero only when some
    /// order hits the ruin floor.
    pub final_equity_cv: f64,
    /// CV of max drawdown across pilot permutations.
    pub path_cv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuitability {
    pub suitable: bool,
    pub reason: String,
    /// Other suitable tests, most broadly applicable first.
    pub alternatives: Vec<String>,
    /// Aggregation weight in [0, 1]; 0 when unsuitable.
    pub priority: f64,
}

pub type SuitabilityMap = BTreeMap<TestKind, TestSuitability>;

/// Number of suitable tests in a map.
pub fn suitable_count(map: &SuitabilityMap) -> usize {
    map.values().filter(|s| s.suitable).count()
}

// ─── Assessor ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SuitabilityAssessor {
    config: SuitabilityConfig,
    rng: RngHierarchy,
}

impl SuitabilityAssessor {
    pub fn new(config: SuitabilityConfig, seed: u64) -> Self {
        Self {
            config,
            rng: RngHierarchy::new(seed),
        }
    }

    pub fn config(&self) -> &SuitabilityConfig {
        &self.config
    }

    pub fn assess_strategy(&self, result: &BacktestResult) -> StrategyProfile {
        let returns = result.trade_returns();
        let n_trades = returns.len();
        let return_cv = coefficient_of_variation(&returns);
        let exit_uniformity = self.exit_uniformity(result);
        let avg_bars_held = if n_trades == 0 {
            0.0
        } else {
            result.trades.iter().map(|t| t.bars_held() as f64).sum::<f64>() / n_trades as f64
        };

        let strategy_type = if n_trades < 2 {
            StrategyType::InsufficientSample
        } else if return_cv < self.config.min_return_cv {
            StrategyType::ConstantReturn
        } else if exit_uniformity > self.config.max_exit_uniformity {
            StrategyType::Mechanical
        } else {
            StrategyType::PathDependent
        };

        let (final_equity_cv, path_cv) = self.pilot_path_cv(&result.trade_pnls(), result.initial_capital);
        let profile = StrategyProfile {
            strategy_type,
            return_cv,
            mean_return: stats::mean(&returns),
            return_std: stats::std_dev(&returns),
            exit_uniformity,
            n_trades,
            n_bars: result.bar_count,
            avg_bars_held,
            final_equity_cv,
            path_cv,
        };
        debug!(
            strategy_type = ?profile.strategy_type,
            return_cv = profile.return_cv,
            exit_uniformity = profile.exit_uniformity,
            final_equity_cv = profile.final_equity_cv,
            path_cv = profile.path_cv,
            n_trades,
            "strategy profile"
        );
        profile
    }

    pub fn get_test_suitability(&self, profile: &StrategyProfile) -> SuitabilityMap {
        let c = &self.config;

        let permutation = if profile.n_trades < c.min_trades_permutation {
            Err(format!(
                "{} trades < {} required for a permutation distribution",
                profile.n_trades, c.min_trades_permutation
            ))
        } else if profile.exit_uniformity > c.max_exit_uniformity {
            Err(format!(
                "exit uniformity {:.2} > {:.2}: exits are mechanical, reordering cannot change outcomes",
                profile.exit_uniformity, c.max_exit_uniformity
            ))
        } else if profile.path_cv < c.min_path_cv {
            Err(format!(
                "drawdown CV {:.4} < {:.4} across pilot shuffles: trade order does not move the equity path",
                profile.path_cv, c.min_path_cv
            ))
        } else {
            Ok("enough trades with path-dependent exits".to_string())
        };

        let bootstrap = if profile.n_trades < c.min_trades_bootstrap {
            Err(format!(
                "{} trades < {} required for resampling",
                profile.n_trades, c.min_trades_bootstrap
            ))
        } else if profile.return_cv < c.min_return_cv {
            Err(format!(
                "return CV {:.4} < {:.4}: returns effectively constant",
                profile.return_cv, c.min_return_cv
            ))
        } else {
            Ok("enough trades with varied returns".to_string())
        };

        let randomized = if profile.n_trades == 0 {
            Err("no trades to take exit rules from".to_string())
        } else if profile.n_bars < c.min_bars_randomized {
            Err(format!(
                "{} bars < {} required to place random entries",
                profile.n_bars, c.min_bars_randomized
            ))
        } else if (profile.n_bars as f64) < 2.0 * profile.avg_bars_held {
            Err(format!(
                "{} bars < twice the average holding period {:.1}",
                profile.n_bars, profile.avg_bars_held
            ))
        } else {
            Ok("enough bar history for random entries".to_string())
        };

        let outcomes = [
            (TestKind::Permutation, permutation, self.permutation_priority(profile)),
            (TestKind::Bootstrap, bootstrap, self.bootstrap_priority(profile)),
            (TestKind::RandomizedEntry, randomized, self.randomized_priority(profile)),
        ];

        // Alternatives list randomized_entry first: it is the broadest fallback.
        let suitable_order: Vec<TestKind> = [TestKind::RandomizedEntry, TestKind::Bootstrap, TestKind::Permutation]
            .into_iter()
            .filter(|kind| outcomes.iter().any(|(k, o, _)| k == kind && o.is_ok()))
            .collect();

        outcomes
            .into_iter()
            .map(|(kind, outcome, priority)| {
                let alternatives = suitable_order
                    .iter()
                    .filter(|k| **k != kind)
                    .map(|k| k.name().to_string())
                    .collect();
                let entry = match outcome {
                    Ok(reason) => TestSuitability {
                        suitable: true,
                        reason,
                        alternatives,
                        priority: priority.clamp(0.0, 1.0),
                    },
                    Err(reason) => {
                        debug!(test = kind.name(), %reason, "test unsuitable");
                        TestSuitability {
                            suitable: false,
                            reason,
                            alternatives,
                            priority: 0.0,
                        }
                    }
                };
                (kind, entry)
            })
            .collect()
    }

    fn permutation_priority(&self, profile: &StrategyProfile) -> f64 {
        if profile.final_equity_cv < self.config.min_final_equity_cv {
            PERMUTATION_WEIGHT * 0.5
        } else {
            PERMUTATION_WEIGHT
        }
    }

    /// Grows with sample size: +0.1 per multiple of the minimum, up to +0.2.
    fn bootstrap_priority(&self, profile: &StrategyProfile) -> f64 {
        let min = self.config.min_trades_bootstrap.max(1) as f64;
        let extra = ((profile.n_trades as f64 / min - 1.0) * 0.1).clamp(0.0, 0.2);
        BOOTSTRAP_WEIGHT + extra
    }

    /// Grows with exit uniformity: the more mechanical, the more this test
    /// carries the decision.
    fn randomized_priority(&self, profile: &StrategyProfile) -> f64 {
        RANDOMIZED_ENTRY_WEIGHT + 0.3 * profile.exit_uniformity
    }

    /// Share of trades in the `uniformity_patterns` most frequent exit-offset
    /// buckets.
    fn exit_uniformity(&self, result: &BacktestResult) -> f64 {
        if result.trades.is_empty() {
            return 0.0;
        }
        let mut buckets: HashMap<i64, usize> = HashMap::new();
        for trade in &result.trades {
            let bucket = (trade.exit_offset_pct() / EXIT_BUCKET_WIDTH).round() as i64;
            *buckets.entry(bucket).or_insert(0) += 1;
        }
        let mut counts: Vec<usize> = buckets.into_values().collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        let top: usize = counts.iter().take(self.config.uniformity_patterns).sum();
        top as f64 / result.trades.len() as f64
    }

    /// Shuffle trade P&Ls a few times and replay each order from `initial`.
    /// Returns the CV of final equity and the CV of max drawdown across
    /// the shuffles.
    fn pilot_path_cv(&self, pnls: &[f64], initial: f64) -> (f64, f64) {
        if pnls.len() < 2 || self.config.pilot_permutations < 2 {
            return (0.0, 0.0);
        }
        let floor = initial * self.config.ruin_fraction;
        let (finals, drawdowns): (Vec<f64>, Vec<f64>) = (0..self.config.pilot_permutations as u64)
            .map(|i| {
                let mut rng = self.rng.rng_for("pilot_permutation", i);
                let mut shuffled = pnls.to_vec();
                shuffled.shuffle(&mut rng);
                replay_to_floor(&shuffled, initial, floor)
            })
            .unzip();
        (coefficient_of_variation(&finals), coefficient_of_variation(&drawdowns))
    }
}

/// Apply P&Ls in order, stopping once equity is at or below `floor`.
/// Returns final equity and max drawdown fraction (≤ 0).
fn replay_to_floor(pnls: &[f64], initial: f64, floor: f64) -> (f64, f64) {
    let mut equity = vec![initial];
    let mut current = initial;
    for p in pnls {
        if current <= floor {
            break;
        }
        current += p;
        equity.push(current);
    }
    (current, stats::max_drawdown(&equity).1)
}
