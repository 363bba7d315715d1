//! CSV price data adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv` with a `timestamp,open,high,low,close,volume`
//! header. The timestamp column may also be called `date`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::error::AlphaError;
use crate::domain::ohlcv::{parse_timestamp, Bar, PriceSeries};
use crate::ports::price_data_port::PriceDataPort;

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "date", alias = "Date", alias = "Timestamp")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl PriceDataPort for CsvPriceAdapter {
    fn load_prices(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<PriceSeries, AlphaError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| AlphaError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, row) in rdr.deserialize::<PriceRow>().enumerate() {
            let row = row.map_err(|e| AlphaError::Data {
                reason: format!("{}: row {}: {}", path.display(), line + 1, e),
            })?;
            let timestamp =
                parse_timestamp(&row.timestamp).ok_or_else(|| AlphaError::Data {
                    reason: format!(
                        "{}: row {}: unrecognised timestamp '{}'",
                        path.display(),
                        line + 1,
                        row.timestamp
                    ),
                })?;

            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded prices");

        PriceSeries::new(symbol, bars).map_err(|e| AlphaError::Data {
            reason: format!("{}: {}", path.display(), e),
        })
    }
}
