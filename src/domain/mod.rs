//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod strategy;
pub mod signal;
pub mod execution;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod pipeline;
pub mod optimiser;
pub mod stability;
pub mod config_validation;
pub mod error;
