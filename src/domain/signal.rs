//! Strategy evaluation: turns prices and indicators into a target position per
//! bar.
//!
//! Evaluation is a single forward pass. Strategies with hysteresis (mean
//! reversion, Bollinger, RSI) carry the previous bar's position inside the
//! pass; nothing is kept between calls.
//!
//! Crossing rules follow the usual convention: `a` crosses above `b` at `t`
//! when `a[t-1] <= b[t-1] && a[t] > b[t]`, and below when
//! `a[t-1] >= b[t-1] && a[t] < b[t]`. A cross needs both bars defined.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::error::AlphaError;
use crate::domain::indicator::stddev::mean_and_stddev;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::IndicatorSet;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::{MovingAverage, StrategyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TargetPosition {
    Short,
    #[default]
    Flat,
    Long,
}

impl TargetPosition {
    pub fn value(&self) -> i8 {
        match self {
            TargetPosition::Short => -1,
            TargetPosition::Flat => 0,
            TargetPosition::Long => 1,
        }
    }

    pub fn from_sign(x: f64) -> Self {
        if x > 0.0 {
            TargetPosition::Long
        } else if x < 0.0 {
            TargetPosition::Short
        } else {
            TargetPosition::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalPoint {
    pub timestamp: DateTime<Utc>,
    pub position: TargetPosition,
}

/// One target position per bar of the price series it was evaluated on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSeries {
    pub points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> Vec<i8> {
        self.points.iter().map(|p| p.position.value()).collect()
    }

    fn from_positions(prices: &PriceSeries, positions: Vec<TargetPosition>) -> Self {
        SignalSeries {
            points: prices
                .timestamps()
                .zip(positions)
                .map(|(timestamp, position)| SignalPoint {
                    timestamp,
                    position,
                })
                .collect(),
        }
    }
}

pub fn evaluate(
    config: &StrategyConfig,
    prices: &PriceSeries,
    indicators: &IndicatorSet,
) -> Result<SignalSeries, AlphaError> {
    config.validate()?;
    for ty in config.required_indicators() {
        indicators.require(&ty)?;
    }
    indicators.check_alignment(prices)?;

    let positions = match *config {
        StrategyConfig::MeanReversion {
            lookback,
            zscore_threshold,
        } => mean_reversion(prices, indicators, lookback, zscore_threshold)?,
        StrategyConfig::Momentum { lookback } => momentum(prices, lookback)?,
        StrategyConfig::Rsi {
            period,
            overbought,
            oversold,
        } => rsi(indicators, period, overbought, oversold)?,
        StrategyConfig::Bollinger { period, num_std } => {
            bollinger(prices, indicators, IndicatorType::bollinger(period, num_std))?
        }
        StrategyConfig::MovingAverageCrossover { fast, slow, margin } => {
            crossover(indicators, fast, slow, margin)?
        }
    };

    Ok(SignalSeries::from_positions(prices, positions))
}

fn mean_reversion(
    prices: &PriceSeries,
    indicators: &IndicatorSet,
    lookback: usize,
    threshold: f64,
) -> Result<Vec<TargetPosition>, AlphaError> {
    let sma = indicators.require(&IndicatorType::Sma(lookback))?;
    let stddev = indicators.require(&IndicatorType::Stddev(lookback))?;

    let bars = prices.bars();
    let mut current = TargetPosition::Flat;
    let mut out = Vec::with_capacity(prices.len());
    for (i, bar) in bars.iter().enumerate() {
        if sma.simple_at(i).is_none() || stddev.simple_at(i).is_none() {
            out.push(TargetPosition::Flat);
            continue;
        }
        // Mean and deviation from one window, so a flat window gives z = 0
        // even when the closes are not exactly representable.
        let (mean, sd) = mean_and_stddev(&bars[i + 1 - lookback..=i]);
        let noise = lookback as f64 * f64::EPSILON * mean.abs();
        let z = if sd <= noise { 0.0 } else { (bar.close - mean) / sd };
        if z > threshold {
            current = TargetPosition::Short;
        } else if z < -threshold {
            current = TargetPosition::Long;
        } else if z.abs() < 0.5 * threshold {
            current = TargetPosition::Flat;
        }
        out.push(current);
    }
    Ok(out)
}

fn momentum(prices: &PriceSeries, lookback: usize) -> Result<Vec<TargetPosition>, AlphaError> {
    if lookback > prices.len() {
        return Err(AlphaError::invalid(
            "lookback",
            format!(
                "lookback {} exceeds series length {}",
                lookback,
                prices.len()
            ),
        ));
    }
    let bars = prices.bars();
    Ok((0..bars.len())
        .map(|i| {
            if i < lookback {
                TargetPosition::Flat
            } else {
                TargetPosition::from_sign(bars[i].close - bars[i - lookback].close)
            }
        })
        .collect())
}

fn rsi(
    indicators: &IndicatorSet,
    period: usize,
    overbought: f64,
    oversold: f64,
) -> Result<Vec<TargetPosition>, AlphaError> {
    let series = indicators.require(&IndicatorType::Rsi(period))?;

    let mut current = TargetPosition::Flat;
    let mut out = Vec::with_capacity(series.len());
    for i in 0..series.len() {
        let prev = i.checked_sub(1).and_then(|j| series.simple_at(j));
        if let (Some(prev), Some(cur)) = (prev, series.simple_at(i)) {
            if prev <= oversold && cur > oversold {
                current = TargetPosition::Long;
            } else if prev >= overbought && cur < overbought {
                current = TargetPosition::Short;
            }
        }
        out.push(current);
    }
    Ok(out)
}

fn bollinger(
    prices: &PriceSeries,
    indicators: &IndicatorSet,
    key: IndicatorType,
) -> Result<Vec<TargetPosition>, AlphaError> {
    let bands = indicators.require(&key)?;
    let bars = prices.bars();

    let mut current = TargetPosition::Flat;
    let mut out = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        let prev = i.checked_sub(1).and_then(|j| bands.bands_at(j));
        let (Some((prev_upper, prev_middle, prev_lower)), Some((upper, middle, lower))) =
            (prev, bands.bands_at(i))
        else {
            out.push(current);
            continue;
        };
        let prev_close = bars[i - 1].close;
        let close = bars[i].close;

        if prev_close >= prev_lower && close < lower {
            current = TargetPosition::Long;
        } else if prev_close <= prev_upper && close > upper {
            current = TargetPosition::Short;
        } else if current == TargetPosition::Long && prev_close < prev_middle && close >= middle
        {
            current = TargetPosition::Flat;
        } else if current == TargetPosition::Short
            && prev_close > prev_middle
            && close <= middle
        {
            current = TargetPosition::Flat;
        }
        out.push(current);
    }
    Ok(out)
}

fn crossover(
    indicators: &IndicatorSet,
    fast: MovingAverage,
    slow: MovingAverage,
    margin: f64,
) -> Result<Vec<TargetPosition>, AlphaError> {
    let fast = indicators.require(&fast.indicator())?;
    let slow = indicators.require(&slow.indicator())?;

    Ok((0..fast.len())
        .map(|i| match (fast.simple_at(i), slow.simple_at(i)) {
            (Some(f), Some(s)) if f > s * (1.0 + margin) => TargetPosition::Long,
            (Some(f), Some(s)) if f < s * (1.0 - margin) => TargetPosition::Short,
            _ => TargetPosition::Flat,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_helpers::compute_all;
    use crate::domain::ohlcv::Bar;

    fn make_series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: DateTime::from_timestamp(1_704_067_200 + i as i64 * 86_400, 0)
                    .unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn run(config: StrategyConfig, closes: &[f64]) -> Vec<i8> {
        let prices = make_series(closes);
        let indicators = compute_all(&prices, &config.required_indicators()).unwrap();
        evaluate(&config, &prices, &indicators).unwrap().positions()
    }

    #[test]
    fn momentum_on_rising_prices_is_long_after_first_bar() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let positions = run(StrategyConfig::Momentum { lookback: 1 }, &closes);
        assert_eq!(positions[0], 0);
        assert!(positions[1..].iter().all(|&p| p == 1));
    }

    #[test]
    fn momentum_sign_and_ties() {
        let positions = run(
            StrategyConfig::Momentum { lookback: 2 },
            &[10.0, 11.0, 10.0, 9.0, 9.0, 12.0],
        );
        assert_eq!(positions, vec![0, 0, 0, -1, -1, 1]);
    }

    #[test]
    fn momentum_rejects_lookback_past_series_end() {
        let prices = make_series(&[1.0, 2.0]);
        let result = evaluate(
            &StrategyConfig::Momentum { lookback: 3 },
            &prices,
            &IndicatorSet::new(),
        );
        assert!(matches!(result, Err(AlphaError::InvalidParameter { .. })));
    }

    #[test]
    fn mean_reversion_enters_and_flattens_with_hysteresis() {
        // lookback 3, threshold 1.0
        let closes = [100.0, 100.0, 100.0, 100.0, 110.0, 104.0, 102.0, 90.0];
        let positions = run(
            StrategyConfig::MeanReversion {
                lookback: 3,
                zscore_threshold: 1.0,
            },
            &closes,
        );
        // warm-up
        assert_eq!(&positions[..2], &[0, 0]);
        // flat series: stddev 0 gives z = 0
        assert_eq!(positions[2], 0);
        assert_eq!(positions[3], 0);
        // spike above the mean: z = 6.67 / 4.71 = 1.41
        assert_eq!(positions[4], -1);
        // window [100,110,104]: z = (104 - 104.67) / 4.11, inside the half band
        assert_eq!(positions[5], 0);
        // z = -0.98 sits between the bands, stays flat
        assert_eq!(positions[6], 0);
        // sharp drop below the lower threshold
        assert_eq!(positions[7], 1);
    }

    #[test]
    fn mean_reversion_holds_between_bands() {
        let closes = [100.0, 100.0, 110.0, 112.0, 111.0];
        let positions = run(
            StrategyConfig::MeanReversion {
                lookback: 3,
                zscore_threshold: 1.2,
            },
            &closes,
        );
        // bar 2: z = 1.41 > 1.2
        assert_eq!(positions[2], -1);
        // bar 3: z = 0.89, inside [0.6, 1.2] so the short is held
        assert_eq!(positions[3], -1);
        // bar 4: z = 0
        assert_eq!(positions[4], 0);
    }

    #[test]
    fn mean_reversion_flat_inexact_prices_stay_flat() {
        for price in [0.1, 0.3, 1e-5, 123.456] {
            let positions = run(
                StrategyConfig::MeanReversion {
                    lookback: 3,
                    zscore_threshold: 0.5,
                },
                &[price; 30],
            );
            assert!(positions.iter().all(|&p| p == 0), "{}: {:?}", price, positions);
        }
    }

    #[test]
    fn rsi_enters_on_confirmed_crosses() {
        let mut closes: Vec<f64> = (0..8).map(|i| 100.0 - i as f64 * 2.0).collect();
        closes.extend([95.0, 96.0, 97.0]);
        let positions = run(
            StrategyConfig::Rsi {
                period: 3,
                overbought: 70.0,
                oversold: 30.0,
            },
            &closes,
        );
        // RSI stays at 0 through the slide, so no cross yet
        assert!(positions[..8].iter().all(|&p| p == 0));
        // rebound lifts RSI back above 30
        assert_eq!(positions[8], 1);
        assert_eq!(positions[10], 1);
    }

    #[test]
    fn rsi_needs_two_defined_values() {
        let positions = run(
            StrategyConfig::Rsi {
                period: 3,
                overbought: 70.0,
                oversold: 30.0,
            },
            &[100.0, 99.0, 98.0, 97.0],
        );
        assert_eq!(positions, vec![0, 0, 0, 0]);
    }

    #[test]
    fn bollinger_long_on_lower_break_then_flat_on_middle() {
        let closes = [100.0, 101.0, 100.0, 101.0, 90.0, 95.0, 96.0];
        let positions = run(
            StrategyConfig::Bollinger {
                period: 3,
                num_std: 1.0,
            },
            &closes,
        );
        assert_eq!(&positions[..4], &[0, 0, 0, 0]);
        assert_eq!(positions[4], 1);
        // still below the middle band
        assert_eq!(positions[5], 1);
        assert_eq!(positions[6], 0);
    }

    #[test]
    fn bollinger_short_on_upper_break() {
        let closes = [100.0, 101.0, 100.0, 101.0, 112.0];
        let positions = run(
            StrategyConfig::Bollinger {
                period: 3,
                num_std: 1.0,
            },
            &closes,
        );
        assert_eq!(positions[4], -1);
    }

    #[test]
    fn crossover_respects_margin() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let config = StrategyConfig::MovingAverageCrossover {
            fast: MovingAverage::sma(2),
            slow: MovingAverage::sma(4),
            margin: 0.0,
        };
        let positions = run(config, &closes);
        assert_eq!(&positions[..3], &[0, 0, 0]);
        assert!(positions[3..].iter().all(|&p| p == 1));

        let wide = StrategyConfig::MovingAverageCrossover {
            fast: MovingAverage::sma(2),
            slow: MovingAverage::sma(4),
            margin: 0.5,
        };
        assert!(run(wide, &closes).iter().all(|&p| p == 0));
    }

    #[test]
    fn missing_indicator_is_invalid_parameter() {
        let prices = make_series(&[1.0, 2.0, 3.0]);
        let result = evaluate(
            &StrategyConfig::Rsi {
                period: 2,
                overbought: 70.0,
                oversold: 30.0,
            },
            &prices,
            &IndicatorSet::new(),
        );
        assert!(matches!(result, Err(AlphaError::InvalidParameter { .. })));
    }

    #[test]
    fn misaligned_indicator_is_rejected() {
        let prices = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let other = make_series(&[1.0, 2.0, 3.0]);
        let config = StrategyConfig::MovingAverageCrossover {
            fast: MovingAverage::sma(1),
            slow: MovingAverage::sma(2),
            margin: 0.0,
        };
        let indicators = compute_all(&other, &config.required_indicators()).unwrap();
        assert!(matches!(
            evaluate(&config, &prices, &indicators),
            Err(AlphaError::MisalignedSeries { .. })
        ));
    }

    #[test]
    fn signals_align_with_prices() {
        let prices = make_series(&[5.0, 4.0, 6.0]);
        let signals = evaluate(
            &StrategyConfig::Momentum { lookback: 1 },
            &prices,
            &IndicatorSet::new(),
        )
        .unwrap();
        assert_eq!(signals.len(), 3);
        for (p, ts) in signals.points.iter().zip(prices.timestamps()) {
            assert_eq!(p.timestamp, ts);
        }
    }
}
