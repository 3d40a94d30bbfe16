//! Randomized-entry test — same exit mechanics, random entry bars.
//!
//! Every realized trade is replayed from a uniformly drawn entry bar with its
//! direction, its stop and target distances (as fractions of entry), and, for
//! trades that did not exit on a level, its holding period. Each replay runs
//! through the engine on its own, on the OHLC bars from its entry onwards, so
//! intrabar stop/target resolution matches the original run and random
//! entries never collide with each other. Every null sequence therefore has
//! as many trades as the observed run.

use super::{McError, McTestResult, MonteCarloSuite, Observed};
use crate::metrics::evaluate_all;
use crate::suitability::TestKind;
use edgelab_core::domain::{Bar, Trade};
use edgelab_core::engine::BacktestEngine;
use edgelab_core::strategy::Signal;
use rand::Rng;
use tracing::debug;

/// Entry bars drawn per trade before a replay is counted as flat.
const MAX_ENTRY_DRAWS: usize = 16;

impl MonteCarloSuite {
    pub(crate) fn randomized_entry_test(
        &self,
        observed: &Observed<'_>,
        bars: &[Bar],
        engine: &BacktestEngine,
    ) -> Result<McTestResult, McError> {
        if observed.result.trades.is_empty() {
            return Ok(McTestResult::skipped("no trades to take exit rules from"));
        }
        if bars.len() < 2 {
            return Ok(McTestResult::skipped("fewer than two bars"));
        }
        let metrics = &self.config().metrics;
        let trades = &observed.result.trades;

        let samples = self.run_iterations(TestKind::RandomizedEntry, |rng| {
            let pnls: Vec<f64> = replay_trades(trades, bars, engine, rng)
                .into_iter()
                .map(|t| t.map_or(0.0, |t| t.pnl))
                .collect();
            evaluate_all(metrics, &pnls, observed.initial, observed.periods_per_year)
        })?;
        Ok(self.summarize(metrics, &observed.values, &samples))
    }
}

/// Replay each trade from a random entry bar, one slot per input trade in
/// order. A slot is `None` when the engine rejected every drawn entry.
///
/// Each replay starts from the engine's initial capital, so sizing does not
/// compound across the null sequence.
pub fn replay_trades<R: Rng>(
    trades: &[Trade],
    bars: &[Bar],
    engine: &BacktestEngine,
    rng: &mut R,
) -> Vec<Option<Trade>> {
    if bars.len() < 2 {
        return vec![None; trades.len()];
    }
    trades
        .iter()
        .map(|trade| {
            let replayed = (0..MAX_ENTRY_DRAWS).find_map(|_| {
                let entry_bar = rng.gen_range(0..bars.len() - 1);
                let signal = replay_signal(trade, &bars[entry_bar]);
                let window = &bars[entry_bar..];
                engine
                    .simulate(std::slice::from_ref(&signal), window, TestKind::RandomizedEntry.name())
                    .trades
                    .into_iter()
                    .next()
            });
            if replayed.is_none() {
                debug!(entry_bar = trade.entry_bar, "no random entry accepted, replay counted flat");
            }
            replayed
        })
        .collect()
}

/// Entry signal at `bar`'s close carrying `trade`'s exit rules.
pub fn replay_signal(trade: &Trade, bar: &Bar) -> Signal {
    let entry = bar.close;
    let sign = trade.direction.sign();
    let stop = entry * (1.0 - sign * trade.stop_distance_pct());
    let mut signal = Signal::entry(bar.timestamp, trade.direction, entry, stop);
    if let Some(distance) = trade.target_distance_pct() {
        signal = signal.with_target(entry * (1.0 + sign * distance));
    }
    if !trade.exit_reason.is_mechanical() {
        signal = signal.with_max_hold(trade.bars_held().max(1));
    }
    signal
}
