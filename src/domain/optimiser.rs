//! Random parameter search over one strategy family.
//!
//! Each trial draws a fresh parameter set from the configured ranges
//! (integers uniform and inclusive, floats uniform and rounded to two
//! decimals) and runs it through the full pipeline. Crossover moving
//! average types are drawn too unless the space pins them. Draws that produce
//! an invalid strategy, or a run that fails, are skipped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::error::AlphaError;
use super::execution::ExecutionConfig;
use super::metrics::MetricsConfig;
use super::ohlcv::PriceSeries;
use super::pipeline::{run_backtest, BacktestResult};
use super::strategy::{MovingAverage, MovingAverageKind, StrategyConfig, StrategyKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Int,
    Float,
}

/// Searchable parameters for each strategy family.
pub fn parameter_names(kind: StrategyKind) -> &'static [&'static str] {
    match kind {
        StrategyKind::MeanReversion => &["lookback", "zscore_threshold"],
        StrategyKind::Momentum => &["lookback"],
        StrategyKind::Rsi => &["period", "overbought", "oversold"],
        StrategyKind::Bollinger => &["period", "num_std"],
        StrategyKind::MovingAverageCrossover => &["fast", "slow", "margin"],
    }
}

fn param_kind(name: &str) -> ParamKind {
    match name {
        "lookback" | "period" | "fast" | "slow" => ParamKind::Int,
        _ => ParamKind::Float,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64) -> Self {
        ParameterRange { min, max }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub kind: StrategyKind,
    pub ranges: BTreeMap<String, ParameterRange>,
    /// Moving average types for crossover draws. `None` draws SMA or EMA with
    /// equal odds on every trial.
    pub fast_kind: Option<MovingAverageKind>,
    pub slow_kind: Option<MovingAverageKind>,
}

impl SearchSpace {
    pub fn new(kind: StrategyKind) -> Self {
        SearchSpace {
            kind,
            ranges: BTreeMap::new(),
            fast_kind: None,
            slow_kind: None,
        }
    }

    pub fn with_range(mut self, name: &str, min: f64, max: f64) -> Self {
        self.ranges
            .insert(name.to_string(), ParameterRange::new(min, max));
        self
    }

    pub fn validate(&self) -> Result<(), AlphaError> {
        for &name in parameter_names(self.kind) {
            let range = self.ranges.get(name).ok_or_else(|| {
                AlphaError::invalid(name, format!("no search range for {}", self.kind))
            })?;
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(AlphaError::invalid(name, "range bounds must be finite"));
            }
            if range.min > range.max {
                return Err(AlphaError::invalid(
                    name,
                    format!("range min {} exceeds max {}", range.min, range.max),
                ));
            }
            if param_kind(name) == ParamKind::Int {
                if range.min < 0.0 {
                    return Err(AlphaError::invalid(name, "range must be non-negative"));
                }
                if range.min.ceil() > range.max.floor() {
                    return Err(AlphaError::invalid(name, "range contains no integer"));
                }
            }
        }
        Ok(())
    }

    fn draw_int<R: Rng>(&self, name: &str, rng: &mut R) -> usize {
        match self.ranges.get(name) {
            Some(r) => rng.gen_range(r.min.ceil() as u64..=r.max.floor() as u64) as usize,
            None => 0,
        }
    }

    fn draw_float<R: Rng>(&self, name: &str, rng: &mut R) -> f64 {
        match self.ranges.get(name) {
            Some(r) => {
                let x = rng.gen_range(r.min..=r.max);
                (x * 100.0).round() / 100.0
            }
            None => 0.0,
        }
    }

    fn draw_average_kind<R: Rng>(
        pinned: Option<MovingAverageKind>,
        rng: &mut R,
    ) -> MovingAverageKind {
        match pinned {
            Some(kind) => kind,
            None if rng.gen_bool(0.5) => MovingAverageKind::Ema,
            None => MovingAverageKind::Sma,
        }
    }

    /// Draw one parameter set. The result may still fail
    /// `StrategyConfig::validate` (for example `fast >= slow`).
    pub fn draw<R: Rng>(&self, rng: &mut R) -> StrategyConfig {
        match self.kind {
            StrategyKind::MeanReversion => StrategyConfig::MeanReversion {
                lookback: self.draw_int("lookback", rng),
                zscore_threshold: self.draw_float("zscore_threshold", rng),
            },
            StrategyKind::Momentum => StrategyConfig::Momentum {
                lookback: self.draw_int("lookback", rng),
            },
            StrategyKind::Rsi => StrategyConfig::Rsi {
                period: self.draw_int("period", rng),
                overbought: self.draw_float("overbought", rng),
                oversold: self.draw_float("oversold", rng),
            },
            StrategyKind::Bollinger => StrategyConfig::Bollinger {
                period: self.draw_int("period", rng),
                num_std: self.draw_float("num_std", rng),
            },
            StrategyKind::MovingAverageCrossover => StrategyConfig::MovingAverageCrossover {
                fast: MovingAverage {
                    kind: Self::draw_average_kind(self.fast_kind, rng),
                    period: self.draw_int("fast", rng),
                },
                slow: MovingAverage {
                    kind: Self::draw_average_kind(self.slow_kind, rng),
                    period: self.draw_int("slow", rng),
                },
                margin: self.draw_float("margin", rng),
            },
        }
    }
}

/// Draw `trials` parameter sets from a generator seeded with `seed`.
pub fn sample(
    space: &SearchSpace,
    trials: usize,
    seed: u64,
) -> Result<Vec<StrategyConfig>, AlphaError> {
    space.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..trials).map(|_| space.draw(&mut rng)).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Successful runs, best `profit_pct` first.
    pub results: Vec<BacktestResult>,
    pub skipped: usize,
}

pub fn random_search(
    prices: &PriceSeries,
    space: &SearchSpace,
    trials: usize,
    seed: u64,
    execution: &ExecutionConfig,
    metrics_config: &MetricsConfig,
) -> Result<SearchOutcome, AlphaError> {
    execution.validate()?;
    metrics_config.validate()?;
    let candidates = sample(space, trials, seed)?;

    let mut results = Vec::with_capacity(candidates.len());
    let mut skipped = 0usize;
    for (trial, strategy) in candidates.iter().enumerate() {
        match run_backtest(prices, strategy, execution, metrics_config) {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(trial, %strategy, error = %e, "skipping trial");
                skipped += 1;
            }
        }
    }

    results.sort_by(|a, b| b.metrics.profit_pct.total_cmp(&a.metrics.profit_pct));
    info!(
        kind = %space.kind,
        trials,
        completed = results.len(),
        skipped,
        "random search complete"
    );
    Ok(SearchOutcome { results, skipped })
}
