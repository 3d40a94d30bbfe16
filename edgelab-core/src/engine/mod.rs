//! Backtesting engine — sequential bar-by-bar simulation of a strategy's signals.
//!
//! Per bar, in order:
//!
//! 1. Exits for the open position (from the bar after entry): gap or intrabar
//!    stop/target, then `max_hold_bars`, then an explicit exit signal.
//! 2. Mark to market at the close; force-close on a margin call.
//! 3. When flat, open the bar's entry signal if margin plus commission fits in cash.
//! 4. Record one equity point.
//!
//! A position still open after the last bar closes at the last close.

pub mod config;
pub mod cost_model;
pub mod intrabar;
pub mod result;

pub use config::{BacktestConfig, IntrabarPolicy, PositionSizing, SizingBasis};
pub use cost_model::CostModel;
pub use result::{periods_per_year, BacktestResult, EquityPoint, SignalStats};

use crate::domain::{validate_series, Bar, BarError, Direction, ExitReason, MarketSpec, Position, Trade};
use crate::economics::{pnl, Broker};
use crate::strategy::{
    apply_filters, Frames, Signal, SignalKind, Strategy, StrategyError, BASE_TIMEFRAME,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid bar data: {0}")]
    Data(#[from] BarError),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("invalid backtest config: {0}")]
    InvalidConfig(String),
}

/// Backtest engine for one market.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    broker: Broker,
    config: BacktestConfig,
    costs: CostModel,
}

impl BacktestEngine {
    pub fn new(spec: MarketSpec, config: BacktestConfig) -> Result<Self, EngineError> {
        config.validate()?;
        if !(spec.leverage > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "leverage for {} must be positive, got {}",
                spec.symbol, spec.leverage
            )));
        }
        let costs = CostModel::from_spec(&spec);
        Ok(Self {
            broker: Broker::new(spec, config.margin_call_level),
            config,
            costs,
        })
    }

    pub fn spec(&self) -> &MarketSpec {
        self.broker.spec()
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run a strategy over a single series, supplied as the base timeframe.
    pub fn run(&self, strategy: &dyn Strategy, bars: &[Bar]) -> Result<BacktestResult, EngineError> {
        let mut frames = Frames::new();
        frames.insert(BASE_TIMEFRAME.to_string(), bars.to_vec());
        self.run_frames(strategy, &frames)
    }

    /// Run a strategy over multi-timeframe data. Trades simulate on the base
    /// timeframe; the others are only visible to the strategy.
    pub fn run_frames(
        &self,
        strategy: &dyn Strategy,
        frames: &Frames,
    ) -> Result<BacktestResult, EngineError> {
        strategy.validate_config()?;
        for tf in strategy.required_timeframes() {
            if !frames.contains_key(&tf) {
                return Err(StrategyError::MissingTimeframe(tf).into());
            }
        }
        for bars in frames.values() {
            validate_series(bars)?;
        }
        let bars = frames
            .get(BASE_TIMEFRAME)
            .ok_or_else(|| StrategyError::MissingTimeframe(BASE_TIMEFRAME.to_string()))?;

        let signals = strategy.generate_signals(frames)?;
        let generated = signals.len();
        let spec = self.spec();
        let mut filtered = 0;
        let accepted: Vec<Signal> = signals
            .into_iter()
            .filter(|signal| {
                if !signal.is_entry() {
                    return true;
                }
                match apply_filters(strategy, signal, &spec.symbol, spec) {
                    Ok(()) => true,
                    Err(rejection) => {
                        debug!(
                            timestamp = %signal.timestamp,
                            filter = %rejection.filter,
                            reason = %rejection.reason,
                            "signal filtered"
                        );
                        filtered += 1;
                        false
                    }
                }
            })
            .collect();

        let mut result = self.simulate(&accepted, bars, strategy.name());
        result.signals.generated = generated;
        result.signals.filtered = filtered;

        info!(
            strategy = strategy.name(),
            symbol = %spec.symbol,
            bars = result.bar_count,
            trades = result.total_trades,
            total_pnl = result.total_pnl,
            final_capital = result.final_capital,
            "backtest complete"
        );
        Ok(result)
    }

    /// Simulate a prepared signal list over validated bars.
    ///
    /// Signals are matched to bars by exact timestamp. Only the first entry
    /// per bar is considered.
    pub fn simulate(&self, signals: &[Signal], bars: &[Bar], strategy_name: &str) -> BacktestResult {
        let spec = self.spec();
        let initial = self.config.initial_capital;
        let mut stats = SignalStats {
            generated: signals.len(),
            ..SignalStats::default()
        };
        if bars.is_empty() {
            return BacktestResult::from_run(strategy_name, &spec.symbol, Vec::new(), Vec::new(), initial, bars, 0, stats);
        }

        let n = bars.len();
        let mut entries: Vec<Option<&Signal>> = vec![None; n];
        let mut exits: Vec<[bool; 2]> = vec![[false; 2]; n];
        for signal in signals {
            let Ok(i) = bars.binary_search_by(|b| b.timestamp.cmp(&signal.timestamp)) else {
                stats.ignored += 1;
                continue;
            };
            match signal.kind {
                SignalKind::Entry if entries[i].is_none() => entries[i] = Some(signal),
                SignalKind::Entry => stats.ignored += 1,
                SignalKind::Exit => exits[i][side(signal.direction)] = true,
            }
        }

        let mut cash = initial;
        let mut position: Option<Position> = None;
        let mut trades = Vec::new();
        let mut margin_calls = 0;
        let mut curve = Vec::with_capacity(n + 1);
        curve.push(EquityPoint {
            timestamp: bars[0].timestamp,
            equity: initial,
        });

        for (i, bar) in bars.iter().enumerate() {
            // 1. Exits
            if let Some(pos) = position.take() {
                match self.exit_for(&pos, i, bar, &exits[i]) {
                    Some((price, reason)) => {
                        cash += self.close(pos, i, bar, price, reason, &mut trades);
                    }
                    None => position = Some(pos),
                }
            }

            // 2. Margin call at the close
            if let Some(pos) = position.take() {
                let equity = cash + pnl(pos.entry_price, bar.close, pos.quantity, pos.direction);
                if self.broker.margin_call(equity, pos.margin) {
                    warn!(
                        bar = i,
                        timestamp = %bar.timestamp,
                        equity,
                        margin = pos.margin,
                        "margin call, closing position"
                    );
                    margin_calls += 1;
                    cash += self.close(pos, i, bar, bar.close, ExitReason::MarginCall, &mut trades);
                } else {
                    position = Some(pos);
                }
            }

            // 3. Entry
            if let Some(signal) = entries[i] {
                if position.is_some() {
                    stats.ignored += 1;
                } else {
                    match self.open(signal, i, bar, cash) {
                        Ok(pos) => {
                            cash -= pos.entry_commission;
                            position = Some(pos);
                        }
                        Err(reason) => {
                            debug!(bar = i, timestamp = %bar.timestamp, %reason, "entry rejected");
                            stats.rejected += 1;
                        }
                    }
                }
            }

            // 4. Equity
            let unrealized = position
                .as_ref()
                .map_or(0.0, |p| pnl(p.entry_price, bar.close, p.quantity, p.direction));
            curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: cash + unrealized,
            });
        }

        if let Some(pos) = position.take() {
            let last = n - 1;
            let bar = &bars[last];
            cash += self.close(pos, last, bar, bar.close, ExitReason::EndOfData, &mut trades);
            if let Some(point) = curve.last_mut() {
                point.equity = cash;
            }
        }

        BacktestResult::from_run(strategy_name, &spec.symbol, trades, curve, initial, bars, margin_calls, stats)
    }

    fn exit_for(
        &self,
        pos: &Position,
        bar_index: usize,
        bar: &Bar,
        exit_flags: &[bool; 2],
    ) -> Option<(f64, ExitReason)> {
        if bar_index <= pos.entry_bar {
            return None;
        }
        if let Some(hit) = intrabar::resolve_exit(
            pos.direction,
            pos.stop_price,
            pos.target_price,
            bar,
            self.config.intrabar_policy,
        ) {
            return Some(hit);
        }
        if let Some(max_hold) = pos.max_hold_bars {
            if pos.bars_held(bar_index) >= max_hold {
                return Some((bar.close, ExitReason::TimeExit));
            }
        }
        if exit_flags[side(pos.direction)] {
            return Some((bar.close, ExitReason::Signal));
        }
        None
    }

    /// Size, cost and margin-check an entry. Rejected entries are never
    /// partially filled.
    fn open(&self, signal: &Signal, bar_index: usize, bar: &Bar, cash: f64) -> Result<Position, String> {
        if !signal.levels_are_consistent() {
            return Err(format!(
                "stop {} / target {:?} on wrong side of entry {}",
                signal.stop_price, signal.target_price, signal.entry_price
            ));
        }
        if !(signal.weight > 0.0) {
            return Err(format!("non-positive weight {}", signal.weight));
        }
        let spec = self.spec();
        let basis = match self.config.sizing.basis {
            SizingBasis::Equity => cash,
            SizingBasis::AccountSize => self.config.initial_capital,
        };
        let risk = basis * self.config.sizing.risk_fraction * signal.weight.min(1.0);
        let quantity = spec.floor_quantity(risk / signal.stop_distance());
        if !(quantity >= spec.min_trade_size) || quantity <= 0.0 {
            return Err(format!("size {quantity} below minimum {}", spec.min_trade_size));
        }

        let (entry_price, entry_slippage) =
            self.costs.entry_fill(signal.direction, signal.entry_price, quantity);
        let affordability = self
            .broker
            .can_afford(entry_price, quantity, cash, self.config.is_intraday);
        if !affordability.affordable {
            return Err(format!(
                "margin plus commission {:.2} exceeds cash {:.2}",
                affordability.required, cash
            ));
        }

        Ok(Position {
            direction: signal.direction,
            entry_bar: bar_index,
            entry_time: bar.timestamp,
            entry_price,
            quantity,
            stop_price: signal.stop_price,
            target_price: signal.target_price,
            max_hold_bars: signal.max_hold_bars,
            margin: spec.margin(entry_price, quantity, self.config.is_intraday),
            entry_commission: self.costs.commission(entry_price, quantity),
            entry_slippage,
        })
    }

    /// Close a position at a raw price. Pushes the trade and returns the cash
    /// delta (gross P&L less exit commission; entry commission was paid at entry).
    fn close(
        &self,
        pos: Position,
        bar_index: usize,
        bar: &Bar,
        raw_price: f64,
        reason: ExitReason,
        trades: &mut Vec<Trade>,
    ) -> f64 {
        let (exit_price, exit_slippage) = self.costs.exit_fill(pos.direction, raw_price, pos.quantity);
        let exit_commission = self.costs.commission(exit_price, pos.quantity);
        let gross_pnl = pnl(pos.entry_price, exit_price, pos.quantity, pos.direction);
        let commission = pos.entry_commission + exit_commission;

        let trade = Trade {
            direction: pos.direction,
            entry_bar: pos.entry_bar,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_bar: bar_index,
            exit_time: bar.timestamp,
            exit_price,
            quantity: pos.quantity,
            stop_price: pos.stop_price,
            target_price: pos.target_price,
            gross_pnl,
            commission,
            slippage: pos.entry_slippage + exit_slippage,
            pnl: gross_pnl - commission,
            exit_reason: reason,
        };
        debug!(
            entry_bar = trade.entry_bar,
            exit_bar = trade.exit_bar,
            direction = ?trade.direction,
            reason = ?trade.exit_reason,
            pnl = trade.pnl,
            "trade closed"
        );
        trades.push(trade);
        gross_pnl - exit_commission
    }
}

fn side(direction: Direction) -> usize {
    match direction {
        Direction::Long => 0,
        Direction::Short => 1,
    }
}
