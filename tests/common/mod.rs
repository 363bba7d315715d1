#![allow(dead_code)]

use alphatester::domain::error::AlphaError;
use alphatester::domain::ohlcv::{parse_timestamp, Bar, PriceSeries};
use alphatester::ports::price_data_port::PriceDataPort;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const DAY: i64 = 86_400;
/// 2024-01-01T00:00:00Z
pub const START: i64 = 1_704_067_200;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<Bar>>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn load_prices(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<PriceSeries, AlphaError> {
        let bars = self.data.get(symbol).ok_or_else(|| AlphaError::Data {
            reason: format!("no data for {}", symbol),
        })?;
        let bars = bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.timestamp >= s))
            .filter(|b| end.is_none_or(|e| b.timestamp <= e))
            .cloned()
            .collect();
        PriceSeries::new(symbol, bars)
    }
}

pub fn ts(date: &str) -> DateTime<Utc> {
    parse_timestamp(date).unwrap()
}

pub fn day(i: usize) -> DateTime<Utc> {
    DateTime::from_timestamp(START + i as i64 * DAY, 0).unwrap()
}

/// A bar that opens and closes at the same price.
pub fn make_bar(i: usize, close: f64) -> Bar {
    Bar {
        timestamp: day(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new("BTC-USD", make_bars(closes)).unwrap()
}

/// A trending series with a slow oscillation on top, so every strategy
/// family trades a few times.
pub fn wavy_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            100.0 + 0.15 * x + 10.0 * (x / 6.0).sin()
        })
        .collect()
}

pub fn wavy_series(count: usize) -> PriceSeries {
    make_series(&wavy_closes(count))
}

pub fn price_csv(closes: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for (i, &c) in closes.iter().enumerate() {
        out.push_str(&format!(
            "{},{},{},{},{},1000\n",
            day(i).format("%Y-%m-%d"),
            c,
            c + 1.0,
            c - 1.0,
            c
        ));
    }
    out
}
