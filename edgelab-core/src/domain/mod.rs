//! Domain types for EdgeLab

pub mod bar;
pub mod market;
pub mod position;
pub mod trade;

pub use bar::{validate_series, Bar, BarError};
pub use market::{AssetClass, MarginMode, MarketSpec, MarketType};
pub use position::{Direction, Position};
pub use trade::{ExitReason, Trade};

/// Symbol type alias
pub type Symbol = String;
