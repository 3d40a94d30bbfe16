//! Bar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar at a single timestamp.
///
/// Intrabar stop/target resolution reads `high` and `low`, so every series fed
/// to the engine must carry full OHLCV rather than closes alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    /// True when `price` lies within the bar's traded range.
    pub fn touches(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("void bar at index {index} ({timestamp})")]
    Void { index: usize, timestamp: NaiveDateTime },

    #[error("inconsistent OHLC at index {index} ({timestamp})")]
    Insane { index: usize, timestamp: NaiveDateTime },

    #[error("non-chronological bars at index {index}: {timestamp} does not follow {previous}")]
    NonChronological {
        index: usize,
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },
}

/// Reject a series the engine cannot simulate: empty, void or inconsistent
/// bars, and timestamps that are not strictly increasing.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty);
    }
    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(BarError::Void { index, timestamp: bar.timestamp });
        }
        if !bar.is_sane() {
            return Err(BarError::Insane { index, timestamp: bar.timestamp });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonChronological {
                    index,
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar::new(ts(2), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn touches_is_inclusive() {
        let bar = sample_bar();
        assert!(bar.touches(98.0));
        assert!(bar.touches(105.0));
        assert!(!bar.touches(105.01));
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_series(&[]), Err(BarError::Empty));
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.timestamp = ts(1);
        let err = validate_series(&[a, b]).unwrap_err();
        assert!(matches!(err, BarError::NonChronological { index: 1, .. }));
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let a = sample_bar();
        let b = sample_bar();
        assert!(validate_series(&[a, b]).is_err());
    }

    #[test]
    fn validate_accepts_clean_series() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.timestamp = ts(3);
        assert!(validate_series(&[a, b]).is_ok());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
