//! End-to-end backtest runs: indicators, signals, simulation, metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::backtest::{self, Simulation};
use super::error::AlphaError;
use super::execution::ExecutionConfig;
use super::indicator_helpers::compute_all;
use super::metrics::{MetricsConfig, MetricsReport};
use super::ohlcv::PriceSeries;
use super::portfolio::EquityPoint;
use super::position::Trade;
use super::signal::{self, SignalSeries};
use super::strategy::StrategyConfig;

/// Everything needed to reproduce a run, captured when it started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub symbol: String,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub metrics_config: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub run_id: Uuid,
    pub signal_series: SignalSeries,
    pub equity_curve: Vec<EquityPoint>,
    pub trade_list: Vec<Trade>,
    pub metrics: MetricsReport,
    pub config_snapshot: ConfigSnapshot,
}

/// The persisted view of a run: its configuration, data window and metrics,
/// without the per-bar series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub symbol: String,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub bars: usize,
    pub metrics: MetricsReport,
}

impl BacktestResult {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            symbol: self.config_snapshot.symbol.clone(),
            strategy: self.config_snapshot.strategy,
            execution: self.config_snapshot.execution.clone(),
            start: self.equity_curve.first().map(|p| p.timestamp),
            end: self.equity_curve.last().map(|p| p.timestamp),
            bars: self.equity_curve.len(),
            metrics: self.metrics.clone(),
        }
    }
}

pub fn run_backtest(
    prices: &PriceSeries,
    strategy: &StrategyConfig,
    execution: &ExecutionConfig,
    metrics_config: &MetricsConfig,
) -> Result<BacktestResult, AlphaError> {
    strategy.validate()?;
    execution.validate()?;
    metrics_config.validate()?;
    if prices.is_empty() {
        return Err(AlphaError::InsufficientData {
            reason: format!("no bars for {}", prices.symbol()),
        });
    }

    let run_id = Uuid::new_v4();
    debug!(%run_id, symbol = prices.symbol(), %strategy, bars = prices.len(), "starting backtest");

    let indicators = compute_all(prices, &strategy.required_indicators())?;
    let signal_series = signal::evaluate(strategy, prices, &indicators)?;
    let Simulation {
        equity_curve,
        trades,
        ..
    } = backtest::run(prices, &signal_series, execution)?;
    let metrics = MetricsReport::compute(&equity_curve, &trades, metrics_config)?;

    info!(
        %run_id,
        %strategy,
        profit_pct = metrics.profit_pct,
        trades = metrics.total_trades,
        "backtest complete"
    );

    Ok(BacktestResult {
        run_id,
        signal_series,
        equity_curve,
        trade_list: trades,
        metrics,
        config_snapshot: ConfigSnapshot {
            symbol: prices.symbol().to_string(),
            strategy: *strategy,
            execution: execution.clone(),
            metrics_config: metrics_config.clone(),
        },
    })
}

/// Run each strategy over the same prices, one scoped thread per strategy.
///
/// Results come back in the order of `strategies`; a failing strategy does
/// not affect the others.
pub fn compare(
    prices: &PriceSeries,
    strategies: &[StrategyConfig],
    execution: &ExecutionConfig,
    metrics_config: &MetricsConfig,
) -> Vec<Result<BacktestResult, AlphaError>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = strategies
            .iter()
            .map(|strategy| {
                scope.spawn(move || run_backtest(prices, strategy, execution, metrics_config))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}
