//! Market profile store — `MarketSpec` fields keyed by symbol.
//!
//! A profile file is TOML with two sections:
//!
//! ```toml
//! [asset_class_defaults.crypto]
//! exchange = "binance"
//! commission_rate = 0.0004
//!
//! [markets.BTCUSDT]
//! asset_class = "crypto"
//! leverage = 10.0
//! ```
//!
//! Asset-class defaults are merged underneath each symbol's own table.

use crate::domain::{AssetClass, MarketSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("market profile file not found: {0}")]
    NotFound(String),

    #[error("failed to read market profiles: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse market profiles: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("symbol '{0}' not found in market profiles and asset class cannot be inferred")]
    UnknownSymbol(String),

    #[error("no asset_class_defaults for inferred asset class '{class}' of symbol '{symbol}'")]
    MissingDefaults { symbol: String, class: &'static str },

    #[error("invalid profile for '{symbol}': {source}")]
    InvalidProfile {
        symbol: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Parsed profile file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketProfiles {
    #[serde(default)]
    pub asset_class_defaults: BTreeMap<String, toml::Table>,
    #[serde(default)]
    pub markets: BTreeMap<String, toml::Table>,
}

impl MarketProfiles {
    /// Load from disk. A missing file is a configuration error, not retried.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Err(ProfileError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(text)?)
    }

    /// Resolve a symbol into a full `MarketSpec`.
    ///
    /// Known symbols get their asset-class defaults merged underneath.
    /// Unknown symbols fall back to the defaults of their inferred asset class.
    pub fn resolve(&self, symbol: &str) -> Result<MarketSpec, ProfileError> {
        let (profile, class_name) = match self.markets.get(symbol) {
            Some(profile) => {
                let class_name = profile
                    .get("asset_class")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or_else(|| infer_asset_class(symbol).map(|c| c.as_str().to_string()));
                (profile.clone(), class_name)
            }
            None => {
                let class = infer_asset_class(symbol)
                    .ok_or_else(|| ProfileError::UnknownSymbol(symbol.to_string()))?;
                if !self.asset_class_defaults.contains_key(class.as_str()) {
                    return Err(ProfileError::MissingDefaults {
                        symbol: symbol.to_string(),
                        class: class.as_str(),
                    });
                }
                warn!(symbol, asset_class = class.as_str(), "symbol not in profiles, using asset-class defaults");
                (toml::Table::new(), Some(class.as_str().to_string()))
            }
        };

        let mut merged = class_name
            .as_deref()
            .and_then(|c| self.asset_class_defaults.get(c))
            .cloned()
            .unwrap_or_default();
        merged.extend(profile);
        merged.insert("symbol".into(), toml::Value::String(symbol.to_string()));
        if let Some(class) = class_name {
            merged
                .entry("asset_class".to_string())
                .or_insert(toml::Value::String(class));
        }

        debug!(symbol, fields = merged.len(), "resolved market profile");
        toml::Value::Table(merged)
            .try_into()
            .map_err(|source| ProfileError::InvalidProfile {
                symbol: symbol.to_string(),
                source,
            })
    }
}

/// Guess an asset class from the symbol's shape.
///
/// Six-letter pairs containing USD are forex; anything mentioning BTC, ETH or
/// USDT is crypto.
pub fn infer_asset_class(symbol: &str) -> Option<AssetClass> {
    let upper = symbol.to_ascii_uppercase();
    if ["BTC", "ETH", "USDT"].iter().any(|tag| upper.contains(tag)) {
        return Some(AssetClass::Crypto);
    }
    if upper.len() == 6 && upper.contains("USD") {
        return Some(AssetClass::Forex);
    }
    None
}
