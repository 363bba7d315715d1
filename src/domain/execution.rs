//! Execution costs and fill pricing.
//!
//! Fees and slippage are quoted in basis points of notional. Slippage always
//! moves the fill against the trader: buys fill above the quoted price, sells
//! below it.

use serde::Serialize;

use super::error::AlphaError;
use super::position::Direction;

const BPS: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionConfig {
    pub initial_equity: f64,
    pub fee_bps: f64,
    pub slippage_bps: f64,
    /// Share of current equity committed at each entry, in (0, 1].
    pub position_fraction: f64,
    pub allow_shorting: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            initial_equity: 10_000.0,
            fee_bps: 0.0,
            slippage_bps: 0.0,
            position_fraction: 1.0,
            allow_shorting: true,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), AlphaError> {
        if !self.initial_equity.is_finite() || self.initial_equity <= 0.0 {
            return Err(AlphaError::invalid(
                "initial_equity",
                "must be a positive number",
            ));
        }
        if !self.fee_bps.is_finite() || self.fee_bps < 0.0 {
            return Err(AlphaError::invalid("fee_bps", "must be non-negative"));
        }
        if !self.slippage_bps.is_finite() || !(0.0..BPS).contains(&self.slippage_bps) {
            return Err(AlphaError::invalid(
                "slippage_bps",
                "must be non-negative and below 10000",
            ));
        }
        if !(self.position_fraction > 0.0 && self.position_fraction <= 1.0) {
            return Err(AlphaError::invalid(
                "position_fraction",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_bps / BPS
    }

    /// Fee charged on a trade of `notional` value.
    pub fn fee(&self, notional: f64) -> f64 {
        notional.abs() * self.fee_rate()
    }

    /// Fill price for opening a position in `direction` at `price`.
    pub fn entry_fill(&self, direction: Direction, price: f64) -> f64 {
        match direction {
            Direction::Long => buy_fill(price, self.slippage_bps),
            Direction::Short => sell_fill(price, self.slippage_bps),
        }
    }

    /// Fill price for closing a position in `direction` at `price`.
    pub fn exit_fill(&self, direction: Direction, price: f64) -> f64 {
        match direction {
            Direction::Long => sell_fill(price, self.slippage_bps),
            Direction::Short => buy_fill(price, self.slippage_bps),
        }
    }

    /// Notional to commit from `equity` so that notional plus entry fee
    /// stays within the allocated fraction.
    pub fn entry_notional(&self, equity: f64) -> f64 {
        equity * self.position_fraction / (1.0 + self.fee_rate())
    }
}

pub fn buy_fill(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 + slippage_bps / BPS)
}

pub fn sell_fill(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 - slippage_bps / BPS)
}
