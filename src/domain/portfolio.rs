//! Cash, the single open position, and the equity curve.
//!
//! Short sales credit their proceeds to cash, so equity is always
//! `cash + signed_quantity * price` regardless of direction.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::execution::ExecutionConfig;
use super::position::{Direction, OpenPosition, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_equity: f64,
    pub position: Option<OpenPosition>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_equity: f64) -> Self {
        Portfolio {
            cash: initial_equity,
            initial_equity,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.position.as_ref().map(|p| p.direction)
    }

    pub fn equity(&self, price: f64) -> f64 {
        match &self.position {
            Some(pos) => self.cash + pos.signed_quantity() * price,
            None => self.cash,
        }
    }

    /// Open a position at quoted `price`, sized from current cash.
    ///
    /// Returns `false` without touching state when there is no positive
    /// equity to allocate or a position is already open.
    pub fn open(
        &mut self,
        direction: Direction,
        price: f64,
        time: DateTime<Utc>,
        config: &ExecutionConfig,
    ) -> bool {
        if self.position.is_some() || self.cash <= 0.0 {
            return false;
        }
        let fill = config.entry_fill(direction, price);
        let notional = config.entry_notional(self.cash);
        let fee = config.fee(notional);
        let quantity = notional / fill;

        self.cash -= direction.sign() * notional + fee;
        self.position = Some(OpenPosition {
            direction,
            quantity,
            entry_time: time,
            entry_price: fill,
            entry_fee: fee,
        });
        true
    }

    /// Close the open position at quoted `price`, booking the trade.
    pub fn close(
        &mut self,
        price: f64,
        time: DateTime<Utc>,
        config: &ExecutionConfig,
    ) -> Option<&Trade> {
        let pos = self.position.take()?;
        let fill = config.exit_fill(pos.direction, price);
        let notional = pos.quantity * fill;
        let exit_fee = config.fee(notional);

        self.cash += pos.direction.sign() * notional - exit_fee;

        let fees = pos.entry_fee + exit_fee;
        self.trades.push(Trade {
            entry_time: pos.entry_time,
            exit_time: time,
            entry_price: pos.entry_price,
            exit_price: fill,
            direction: pos.direction,
            quantity: pos.quantity,
            fees,
            pnl: pos.unrealized_pnl(fill) - fees,
        });
        self.trades.last()
    }

    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }
}
