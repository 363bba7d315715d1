//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

/// Mean and population standard deviation of the closes in `window`.
pub(crate) fn mean_and_stddev(window: &[Bar]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean: f64 = window.iter().map(|b| b.close).sum::<f64>() / n;
    let variance: f64 = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn calculate_stddev(bars: &[Bar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if period == 0 || i + 1 < period {
                IndicatorPoint::undefined(bar.timestamp)
            } else {
                let (_, stddev) = mean_and_stddev(&bars[i + 1 - period..=i]);
                IndicatorPoint::simple(bar.timestamp, stddev)
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
