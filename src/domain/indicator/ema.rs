//! Exponential moving average of close.
//!
//! Seeded with the SMA of the first `n` closes at index `n-1`, then
//! `ema = close * a + ema_prev * (1 - a)` with `a = 2 / (n + 1)`.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema(period);
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::undefined(b.timestamp))
        .collect();

    if period == 0 || bars.len() < period {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = bars[..period].iter().map(|b| b.close).sum::<f64>() / period as f64;
    values[period - 1] = IndicatorPoint::simple(bars[period - 1].timestamp, seed);

    let mut ema = seed;
    for (i, bar) in bars.iter().enumerate().skip(period) {
        ema = bar.close * alpha + ema * (1.0 - alpha);
        values[i] = IndicatorPoint::simple(bar.timestamp, ema);
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
