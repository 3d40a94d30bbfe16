//! EdgeLab Core — market economics, backtest engine, strategy interfaces.
//!
//! This crate holds everything a single backtest needs:
//! - Domain types (bars, market specs, positions, trades)
//! - Leverage-aware margin, P&L and position-sizing arithmetic
//! - Market profile resolution from TOML
//! - Strategy trait, signals and signal filters
//! - Bar-by-bar backtest engine with intrabar stop/target resolution
//! - Deterministic RNG hierarchy for resampling tests

pub mod domain;
pub mod economics;
pub mod engine;
pub mod indicators;
pub mod profiles;
pub mod rng;
pub mod stats;
pub mod strategy;
