//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values, aligned 1:1 with bars
//!
//! Points inside the warm-up window have `valid == false` and carry NaN,
//! never zero.

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stddev;

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::error::AlphaError;
use crate::domain::ohlcv::PriceSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    pub fn simple(timestamp: DateTime<Utc>, value: f64) -> Self {
        IndicatorPoint {
            timestamp,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }

    pub fn undefined(timestamp: DateTime<Utc>) -> Self {
        IndicatorPoint {
            timestamp,
            valid: false,
            value: IndicatorValue::Simple(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Stddev(usize),
    /// The multiplier is keyed by its bit pattern so the type stays `Eq + Hash + Ord`.
    Bollinger { period: usize, num_std_bits: u64 },
}

impl IndicatorType {
    pub fn bollinger(period: usize, num_std: f64) -> Self {
        IndicatorType::Bollinger {
            period,
            num_std_bits: num_std.to_bits(),
        }
    }

    /// Band multiplier for Bollinger keys, `None` for every other indicator.
    pub fn num_std(&self) -> Option<f64> {
        match self {
            IndicatorType::Bollinger { num_std_bits, .. } => Some(f64::from_bits(*num_std_bits)),
            _ => None,
        }
    }

    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Rsi(p)
            | IndicatorType::Stddev(p) => *p,
            IndicatorType::Bollinger { period, .. } => *period,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Bollinger { period, num_std_bits } => {
                write!(f, "BOLLINGER({},{})", period, f64::from_bits(*num_std_bits))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scalar value at `index`, or `None` inside the warm-up window.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        let point = self.values.get(index)?;
        match point.value {
            IndicatorValue::Simple(v) if point.valid => Some(v),
            _ => None,
        }
    }

    /// `(upper, middle, lower)` at `index`, or `None` inside the warm-up window.
    pub fn bands_at(&self, index: usize) -> Option<(f64, f64, f64)> {
        let point = self.values.get(index)?;
        match point.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } if point.valid => Some((upper, middle, lower)),
            _ => None,
        }
    }

    /// Number of leading undefined points.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }
}

/// Compute one indicator over a price series.
///
/// Fails with `InvalidParameter` when the period is zero or longer than the
/// series, or when a Bollinger multiplier is not a positive finite number.
pub fn compute(
    indicator_type: IndicatorType,
    prices: &PriceSeries,
) -> Result<IndicatorSeries, AlphaError> {
    let period = indicator_type.period();
    if period == 0 {
        return Err(AlphaError::invalid(
            indicator_type.to_string(),
            "period must be at least 1",
        ));
    }
    if period > prices.len() {
        return Err(AlphaError::invalid(
            indicator_type.to_string(),
            format!(
                "period {} exceeds series length {}",
                period,
                prices.len()
            ),
        ));
    }

    let bars = prices.bars();
    let series = match indicator_type {
        IndicatorType::Sma(p) => sma::calculate_sma(bars, p),
        IndicatorType::Ema(p) => ema::calculate_ema(bars, p),
        IndicatorType::Rsi(p) => rsi::calculate_rsi(bars, p),
        IndicatorType::Stddev(p) => stddev::calculate_stddev(bars, p),
        IndicatorType::Bollinger { period, num_std_bits } => {
            let num_std = f64::from_bits(num_std_bits);
            if !num_std.is_finite() || num_std <= 0.0 {
                return Err(AlphaError::invalid(
                    indicator_type.to_string(),
                    "standard deviation multiplier must be positive",
                ));
            }
            bollinger::calculate_bollinger(bars, period, num_std)
        }
    };
    Ok(series)
}
