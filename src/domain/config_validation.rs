//! Reading and validating run settings from configuration.
//!
//! Every failure names the section and key it came from. Keys that are absent
//! fall back to their documented defaults; keys that are present but do not
//! parse are always an error.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::domain::error::AlphaError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::metrics::MetricsConfig;
use crate::domain::ohlcv::parse_timestamp;
use crate::domain::optimiser::{parameter_names, SearchSpace};
use crate::domain::strategy::{MovingAverage, MovingAverageKind, StrategyConfig, StrategyKind};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TRIALS: usize = 100;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub path: PathBuf,
    pub symbol: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimiseSettings {
    pub space: SearchSpace,
    pub trials: usize,
    pub seed: u64,
}

fn missing(section: &str, key: &str) -> AlphaError {
    AlphaError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AlphaError {
    AlphaError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Re-home a domain `InvalidParameter` under the config section it came from.
fn in_section(section: &str, err: AlphaError) -> AlphaError {
    match err {
        AlphaError::InvalidParameter { name, reason } => invalid(section, &name, reason),
        other => other,
    }
}

fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, AlphaError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(missing(section, key)),
    }
}

fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, AlphaError> {
    if !config.has_key(section, key) {
        return Ok(default);
    }
    config
        .get_double(section, key)
        .ok_or_else(|| invalid(section, key, "expected a number"))
}

fn required_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, AlphaError> {
    if !config.has_key(section, key) {
        return Err(missing(section, key));
    }
    optional_f64(config, section, key, 0.0)
}

fn optional_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, AlphaError> {
    if !config.has_key(section, key) {
        return Ok(default);
    }
    let value = config
        .get_int(section, key)
        .ok_or_else(|| invalid(section, key, "expected an integer"))?;
    usize::try_from(value).map_err(|_| invalid(section, key, "must be non-negative"))
}

fn optional_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, AlphaError> {
    if !config.has_key(section, key) {
        return Ok(default);
    }
    config
        .get_bool(section, key)
        .ok_or_else(|| invalid(section, key, "expected true or false"))
}

fn optional_timestamp(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<DateTime<Utc>>, AlphaError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s).map(Some).ok_or_else(|| {
            invalid(
                section,
                key,
                "expected YYYY-MM-DD, RFC 3339, or epoch seconds",
            )
        }),
    }
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, AlphaError> {
    let path = config
        .get_string("data", "path")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let symbol = required_string(config, "data", "symbol")?;
    let start = optional_timestamp(config, "data", "start")?;
    let end = optional_timestamp(config, "data", "end")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid("data", "start", "start must not be after end"));
        }
    }
    Ok(DataConfig {
        path: PathBuf::from(path),
        symbol,
        start,
        end,
    })
}

pub fn build_execution_config(config: &dyn ConfigPort) -> Result<ExecutionConfig, AlphaError> {
    let d = ExecutionConfig::default();
    let exec = ExecutionConfig {
        initial_equity: optional_f64(config, "execution", "initial_equity", d.initial_equity)?,
        fee_bps: optional_f64(config, "execution", "fee_bps", d.fee_bps)?,
        slippage_bps: optional_f64(config, "execution", "slippage_bps", d.slippage_bps)?,
        position_fraction: optional_f64(
            config,
            "execution",
            "position_fraction",
            d.position_fraction,
        )?,
        allow_shorting: optional_bool(config, "execution", "allow_shorting", d.allow_shorting)?,
    };
    exec.validate().map_err(|e| in_section("execution", e))?;
    Ok(exec)
}

pub fn build_metrics_config(config: &dyn ConfigPort) -> Result<MetricsConfig, AlphaError> {
    let d = MetricsConfig::default();
    let metrics = MetricsConfig {
        annualization_factor: optional_f64(
            config,
            "metrics",
            "annualization_factor",
            d.annualization_factor,
        )?,
        risk_free_rate: optional_f64(config, "metrics", "risk_free_rate", d.risk_free_rate)?,
    };
    metrics.validate().map_err(|e| in_section("metrics", e))?;
    Ok(metrics)
}

fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, AlphaError> {
    let kind = required_string(config, "strategy", "kind")?;
    kind.parse()
        .map_err(|_| invalid("strategy", "kind", format!("unknown strategy '{}'", kind)))
}

fn moving_average_kind(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<MovingAverageKind, AlphaError> {
    match config.get_string("strategy", key) {
        None => Ok(MovingAverageKind::Sma),
        Some(s) => s
            .parse()
            .map_err(|_| invalid("strategy", key, "expected sma or ema")),
    }
}

/// Average type for a search: `sma`/`ema` pin it, `any` or no value leaves
/// it to be drawn per trial.
fn search_average_kind(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<MovingAverageKind>, AlphaError> {
    match config.get_string("strategy", key) {
        None => Ok(None),
        Some(s) if s.trim().eq_ignore_ascii_case("any") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| invalid("strategy", key, "expected sma, ema or any")),
    }
}

/// Read `[strategy]`. Parameters not given take the conventional defaults
/// (lookback 20, RSI 14/70/30, Bollinger 20/2, crossover 10/30).
pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, AlphaError> {
    const S: &str = "strategy";
    let strategy = match strategy_kind(config)? {
        StrategyKind::MeanReversion => StrategyConfig::MeanReversion {
            lookback: optional_usize(config, S, "lookback", 20)?,
            zscore_threshold: optional_f64(config, S, "zscore_threshold", 2.0)?,
        },
        StrategyKind::Momentum => StrategyConfig::Momentum {
            lookback: optional_usize(config, S, "lookback", 10)?,
        },
        StrategyKind::Rsi => StrategyConfig::Rsi {
            period: optional_usize(config, S, "period", 14)?,
            overbought: optional_f64(config, S, "overbought", 70.0)?,
            oversold: optional_f64(config, S, "oversold", 30.0)?,
        },
        StrategyKind::Bollinger => StrategyConfig::Bollinger {
            period: optional_usize(config, S, "period", 20)?,
            num_std: optional_f64(config, S, "num_std", 2.0)?,
        },
        StrategyKind::MovingAverageCrossover => StrategyConfig::MovingAverageCrossover {
            fast: MovingAverage {
                kind: moving_average_kind(config, "fast_type")?,
                period: optional_usize(config, S, "fast", 10)?,
            },
            slow: MovingAverage {
                kind: moving_average_kind(config, "slow_type")?,
                period: optional_usize(config, S, "slow", 30)?,
            },
            margin: optional_f64(config, S, "margin", 0.0)?,
        },
    };
    strategy.validate().map_err(|e| in_section(S, e))?;
    Ok(strategy)
}

pub fn load_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, AlphaError> {
    Ok(RunSettings {
        data: build_data_config(config)?,
        strategy: build_strategy_config(config)?,
        execution: build_execution_config(config)?,
        metrics: build_metrics_config(config)?,
    })
}

/// Read `[optimise]`: `trials`, `seed`, and a `<param>_min`/`<param>_max`
/// pair for every searchable parameter of `[strategy] kind`.
pub fn build_optimise_settings(config: &dyn ConfigPort) -> Result<OptimiseSettings, AlphaError> {
    const O: &str = "optimise";
    let kind = strategy_kind(config)?;
    let trials = optional_usize(config, O, "trials", DEFAULT_TRIALS)?;
    if trials == 0 {
        return Err(invalid(O, "trials", "must be at least 1"));
    }
    let seed = optional_usize(config, O, "seed", DEFAULT_SEED as usize)? as u64;

    let mut space = SearchSpace::new(kind);
    space.fast_kind = search_average_kind(config, "fast_type")?;
    space.slow_kind = search_average_kind(config, "slow_type")?;
    for &name in parameter_names(kind) {
        let min = required_f64(config, O, &format!("{}_min", name))?;
        let max = required_f64(config, O, &format!("{}_max", name))?;
        space = space.with_range(name, min, max);
    }
    Ok(OptimiseSettings {
        space,
        trials,
        seed,
    })
}
