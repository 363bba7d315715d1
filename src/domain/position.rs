//! Open positions and closed trades.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    /// Units held, always positive; `direction` carries the sign.
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub entry_fee: f64,
}

impl OpenPosition {
    pub fn signed_quantity(&self) -> f64 {
        self.direction.sign() * self.quantity
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.signed_quantity() * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub direction: Direction,
    pub quantity: f64,
    /// Entry plus exit fee.
    pub fees: f64,
    pub pnl: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// PnL as a percentage of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.quantity * self.entry_price;
        if notional == 0.0 {
            0.0
        } else {
            self.pnl / notional * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ts(day: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200 + day * 86_400, 0).unwrap()
    }

    #[test]
    fn short_unrealized_pnl_gains_when_price_falls() {
        let pos = OpenPosition {
            direction: Direction::Short,
            quantity: 2.0,
            entry_time: ts(0),
            entry_price: 100.0,
            entry_fee: 0.0,
        };
        assert_relative_eq!(pos.signed_quantity(), -2.0);
        assert_relative_eq!(pos.unrealized_pnl(90.0), 20.0);
        assert_relative_eq!(pos.unrealized_pnl(110.0), -20.0);
    }

    #[test]
    fn trade_return_pct() {
        let trade = Trade {
            entry_time: ts(0),
            exit_time: ts(3),
            entry_price: 50.0,
            exit_price: 55.0,
            direction: Direction::Long,
            quantity: 10.0,
            fees: 0.0,
            pnl: 50.0,
        };
        assert!(trade.is_win());
        assert_relative_eq!(trade.return_pct(), 10.0);
    }

    #[test]
    fn zero_quantity_trade_has_zero_return() {
        let trade = Trade {
            entry_time: ts(0),
            exit_time: ts(1),
            entry_price: 50.0,
            exit_price: 55.0,
            direction: Direction::Long,
            quantity: 0.0,
            fees: 0.0,
            pnl: 0.0,
        };
        assert_eq!(trade.return_pct(), 0.0);
        assert!(!trade.is_win());
    }
}
