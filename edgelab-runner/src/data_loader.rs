//! Bar loading from CSV.
//!
//! Required columns: `timestamp,open,high,low,close,volume` (any order, extra
//! columns ignored). Loaded series are validated before they are returned, so
//! everything downstream can assume chronological, sane bars.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use edgelab_core::domain::{validate_series, Bar, BarError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {0}")]
    NotFound(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("unparseable timestamp '{value}' on row {row}")]
    Timestamp { row: usize, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid bar series: {0}")]
    Bars(#[from] BarError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load and validate bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let bars = read_bars_csv(file)?;
    info!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

/// Read and validate bars from any CSV source.
pub fn read_bars_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(column)) {
            return Err(LoadError::MissingColumn(column.to_string()));
        }
    }
    let lowered: csv::StringRecord = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    rdr.set_headers(lowered);

    let mut bars = Vec::new();
    for (i, rec) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = rec?;
        // header is line 1
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            row: i + 2,
            value: row.timestamp.clone(),
        })?;
        bars.push(Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume));
    }
    validate_series(&bars)?;
    Ok(bars)
}

/// `%Y-%m-%d %H:%M:%S`, RFC 3339 (converted to UTC) or a bare `%Y-%m-%d` date.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
