//! Single-asset backtest event loop.
//!
//! The signal computed from bar `t`'s close is acted on at bar `t+1`'s open,
//! so bar 0 is always flat and the last bar's signal is never traded. Equity
//! is marked at every close; any position still open after the last bar is
//! closed at that bar's close and the final equity point reflects it.

use serde::Serialize;
use tracing::{debug, warn};

use super::error::AlphaError;
use super::execution::ExecutionConfig;
use super::ohlcv::PriceSeries;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{Direction, Trade};
use super::signal::{SignalSeries, TargetPosition};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    /// Entries refused because equity was not positive, counted once per
    /// change of the wanted direction.
    pub skipped_entries: usize,
}

impl Simulation {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }
}

fn target_direction(target: TargetPosition, allow_shorting: bool) -> Option<Direction> {
    match target {
        TargetPosition::Long => Some(Direction::Long),
        TargetPosition::Short if allow_shorting => Some(Direction::Short),
        TargetPosition::Short | TargetPosition::Flat => None,
    }
}

fn check_signal_alignment(prices: &PriceSeries, signals: &SignalSeries) -> Result<(), AlphaError> {
    if signals.len() != prices.len() {
        return Err(AlphaError::misaligned(format!(
            "signal series has {} points but the price series has {} bars",
            signals.len(),
            prices.len()
        )));
    }
    if let Some(i) = signals
        .points
        .iter()
        .zip(prices.timestamps())
        .position(|(s, ts)| s.timestamp != ts)
    {
        return Err(AlphaError::misaligned(format!(
            "signal timestamp at index {} does not match the price series",
            i
        )));
    }
    Ok(())
}

pub fn run(
    prices: &PriceSeries,
    signals: &SignalSeries,
    config: &ExecutionConfig,
) -> Result<Simulation, AlphaError> {
    config.validate()?;
    check_signal_alignment(prices, signals)?;

    let bars = prices.bars();
    let mut portfolio = Portfolio::new(config.initial_equity);
    let mut refused: Option<Direction> = None;
    let mut skipped_entries = 0;

    for (t, bar) in bars.iter().enumerate() {
        if t > 0 {
            let wanted = target_direction(signals.points[t - 1].position, config.allow_shorting);
            if wanted != portfolio.direction() {
                if let Some(trade) = portfolio.close(bar.open, bar.timestamp, config) {
                    debug!(
                        direction = ?trade.direction,
                        entry = trade.entry_price,
                        exit = trade.exit_price,
                        pnl = trade.pnl,
                        "closed position"
                    );
                }
                if let Some(direction) = wanted {
                    if portfolio.open(direction, bar.open, bar.timestamp, config) {
                        debug!(?direction, price = bar.open, time = %bar.timestamp, "opened position");
                        refused = None;
                    } else if refused != Some(direction) {
                        warn!(
                            equity = portfolio.cash,
                            time = %bar.timestamp,
                            "skipping entry: equity is not positive"
                        );
                        refused = Some(direction);
                        skipped_entries += 1;
                    }
                }
            }
            if wanted.is_none() {
                refused = None;
            }
        }

        if t + 1 == bars.len() {
            if let Some(trade) = portfolio.close(bar.close, bar.timestamp, config) {
                debug!(pnl = trade.pnl, "closed position at end of data");
            }
        }
        let equity = portfolio.equity(bar.close);
        portfolio.record_equity(bar.timestamp, equity);
    }

    Ok(Simulation {
        equity_curve: portfolio.equity_curve,
        trades: portfolio.trades,
        skipped_entries,
    })
}
