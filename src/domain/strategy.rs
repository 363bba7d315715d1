//! Strategy configuration: one variant per supported strategy.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AlphaError;
use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageKind {
    Sma,
    Ema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MovingAverage {
    pub kind: MovingAverageKind,
    pub period: usize,
}

impl MovingAverage {
    pub fn sma(period: usize) -> Self {
        MovingAverage {
            kind: MovingAverageKind::Sma,
            period,
        }
    }

    pub fn ema(period: usize) -> Self {
        MovingAverage {
            kind: MovingAverageKind::Ema,
            period,
        }
    }

    pub fn indicator(&self) -> IndicatorType {
        match self.kind {
            MovingAverageKind::Sma => IndicatorType::Sma(self.period),
            MovingAverageKind::Ema => IndicatorType::Ema(self.period),
        }
    }
}

impl fmt::Display for MovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.indicator())
    }
}

impl FromStr for MovingAverage {
    type Err = AlphaError;

    /// Parses the display form, `SMA(20)` or `EMA(5)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AlphaError::invalid("moving_average", format!("cannot parse '{}'", s));
        let (kind, rest) = s.trim().split_once('(').ok_or_else(bad)?;
        let period = rest
            .strip_suffix(')')
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(bad)?;
        Ok(MovingAverage {
            kind: kind.parse()?,
            period,
        })
    }
}

impl FromStr for MovingAverageKind {
    type Err = AlphaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(MovingAverageKind::Sma),
            "ema" => Ok(MovingAverageKind::Ema),
            other => Err(AlphaError::invalid(
                "moving_average",
                format!("unknown moving average kind '{}'", other),
            )),
        }
    }
}

/// Which strategy family a config belongs to, independent of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    MeanReversion,
    Momentum,
    Rsi,
    Bollinger,
    MovingAverageCrossover,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::Momentum => "momentum",
            StrategyKind::Rsi => "rsi",
            StrategyKind::Bollinger => "bollinger",
            StrategyKind::MovingAverageCrossover => "ma_crossover",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = AlphaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean_reversion" => Ok(StrategyKind::MeanReversion),
            "momentum" => Ok(StrategyKind::Momentum),
            "rsi" => Ok(StrategyKind::Rsi),
            "bollinger" => Ok(StrategyKind::Bollinger),
            "ma_crossover" => Ok(StrategyKind::MovingAverageCrossover),
            other => Err(AlphaError::invalid(
                "strategy",
                format!("unknown strategy kind '{}'", other),
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Number(f64),
    MovingAverage(MovingAverage),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(x) => write!(f, "{}", x),
            ParamValue::MovingAverage(ma) => write!(f, "{}", ma),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    MeanReversion {
        lookback: usize,
        zscore_threshold: f64,
    },
    Momentum {
        lookback: usize,
    },
    Rsi {
        period: usize,
        overbought: f64,
        oversold: f64,
    },
    Bollinger {
        period: usize,
        num_std: f64,
    },
    MovingAverageCrossover {
        fast: MovingAverage,
        slow: MovingAverage,
        margin: f64,
    },
}

fn require_period(name: &str, value: usize) -> Result<(), AlphaError> {
    if value == 0 {
        return Err(AlphaError::invalid(name, "must be at least 1"));
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> Result<(), AlphaError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AlphaError::invalid(name, "must be a positive number"));
    }
    Ok(())
}

impl StrategyConfig {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyConfig::MeanReversion { .. } => StrategyKind::MeanReversion,
            StrategyConfig::Momentum { .. } => StrategyKind::Momentum,
            StrategyConfig::Rsi { .. } => StrategyKind::Rsi,
            StrategyConfig::Bollinger { .. } => StrategyKind::Bollinger,
            StrategyConfig::MovingAverageCrossover { .. } => StrategyKind::MovingAverageCrossover,
        }
    }

    pub fn validate(&self) -> Result<(), AlphaError> {
        match *self {
            StrategyConfig::MeanReversion {
                lookback,
                zscore_threshold,
            } => {
                require_period("lookback", lookback)?;
                require_positive("zscore_threshold", zscore_threshold)
            }
            StrategyConfig::Momentum { lookback } => require_period("lookback", lookback),
            StrategyConfig::Rsi {
                period,
                overbought,
                oversold,
            } => {
                require_period("period", period)?;
                if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
                    return Err(AlphaError::invalid(
                        "oversold/overbought",
                        "levels must lie within 0..=100",
                    ));
                }
                if oversold >= overbought {
                    return Err(AlphaError::invalid(
                        "oversold",
                        "oversold level must be below the overbought level",
                    ));
                }
                Ok(())
            }
            StrategyConfig::Bollinger { period, num_std } => {
                require_period("period", period)?;
                require_positive("num_std", num_std)
            }
            StrategyConfig::MovingAverageCrossover { fast, slow, margin } => {
                require_period("fast", fast.period)?;
                require_period("slow", slow.period)?;
                if fast.period >= slow.period {
                    return Err(AlphaError::invalid(
                        "fast",
                        "fast period must be shorter than slow period",
                    ));
                }
                if !margin.is_finite() || margin < 0.0 {
                    return Err(AlphaError::invalid("margin", "must be non-negative"));
                }
                Ok(())
            }
        }
    }

    /// Indicators the evaluator reads for this strategy.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match *self {
            StrategyConfig::MeanReversion { lookback, .. } => {
                vec![IndicatorType::Sma(lookback), IndicatorType::Stddev(lookback)]
            }
            StrategyConfig::Momentum { .. } => vec![],
            StrategyConfig::Rsi { period, .. } => vec![IndicatorType::Rsi(period)],
            StrategyConfig::Bollinger { period, num_std } => {
                vec![IndicatorType::bollinger(period, num_std)]
            }
            StrategyConfig::MovingAverageCrossover { fast, slow, .. } => {
                vec![fast.indicator(), slow.indicator()]
            }
        }
    }

    /// Parameter names and values, in declaration order.
    pub fn params(&self) -> Vec<(&'static str, ParamValue)> {
        use ParamValue::{MovingAverage as Ma, Number};
        match *self {
            StrategyConfig::MeanReversion {
                lookback,
                zscore_threshold,
            } => vec![
                ("lookback", Number(lookback as f64)),
                ("zscore_threshold", Number(zscore_threshold)),
            ],
            StrategyConfig::Momentum { lookback } => vec![("lookback", Number(lookback as f64))],
            StrategyConfig::Rsi {
                period,
                overbought,
                oversold,
            } => vec![
                ("period", Number(period as f64)),
                ("overbought", Number(overbought)),
                ("oversold", Number(oversold)),
            ],
            StrategyConfig::Bollinger { period, num_std } => vec![
                ("period", Number(period as f64)),
                ("num_std", Number(num_std)),
            ],
            StrategyConfig::MovingAverageCrossover { fast, slow, margin } => vec![
                ("fast", Ma(fast)),
                ("slow", Ma(slow)),
                ("margin", Number(margin)),
            ],
        }
    }

    /// Rebuilds a config from `name = value` text pairs, as written by
    /// `params`. Every parameter of `kind` must be present; the result is
    /// validated.
    pub fn from_params(kind: StrategyKind, params: &[(String, String)]) -> Result<Self, AlphaError> {
        fn get<T: FromStr>(params: &[(String, String)], name: &str) -> Result<T, AlphaError> {
            let (_, raw) = params
                .iter()
                .find(|(k, _)| k == name)
                .ok_or_else(|| AlphaError::invalid(name, "missing parameter"))?;
            raw.trim()
                .parse()
                .map_err(|_| AlphaError::invalid(name, format!("cannot parse '{}'", raw)))
        }

        let config = match kind {
            StrategyKind::MeanReversion => StrategyConfig::MeanReversion {
                lookback: get(params, "lookback")?,
                zscore_threshold: get(params, "zscore_threshold")?,
            },
            StrategyKind::Momentum => StrategyConfig::Momentum {
                lookback: get(params, "lookback")?,
            },
            StrategyKind::Rsi => StrategyConfig::Rsi {
                period: get(params, "period")?,
                overbought: get(params, "overbought")?,
                oversold: get(params, "oversold")?,
            },
            StrategyKind::Bollinger => StrategyConfig::Bollinger {
                period: get(params, "period")?,
                num_std: get(params, "num_std")?,
            },
            StrategyKind::MovingAverageCrossover => StrategyConfig::MovingAverageCrossover {
                fast: get(params, "fast")?,
                slow: get(params, "slow")?,
                margin: get(params, "margin")?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}({})", self.kind(), params.join(", "))
    }
}
