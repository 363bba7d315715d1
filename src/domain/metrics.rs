//! Performance metrics computed from an equity curve and its trades.
//!
//! Degenerate statistics are reported as `None` or zero, never as errors:
//! a Sharpe ratio over a flat curve is `None`, a win rate with no trades is 0.

use serde::Serialize;

use super::error::AlphaError;
use super::portfolio::EquityPoint;
use super::position::Trade;

/// Crypto markets trade every calendar day.
pub const DEFAULT_ANNUALIZATION_FACTOR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsConfig {
    /// Bars per year, used to scale per-bar ratios.
    pub annualization_factor: f64,
    /// Annual risk-free rate as a fraction (0.05 = 5%).
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            annualization_factor: DEFAULT_ANNUALIZATION_FACTOR,
            risk_free_rate: 0.0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), AlphaError> {
        if !self.annualization_factor.is_finite() || self.annualization_factor <= 0.0 {
            return Err(AlphaError::invalid(
                "annualization_factor",
                "must be a positive number",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AlphaError::invalid("risk_free_rate", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub final_equity: f64,
    pub profit_pct: f64,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    /// Largest peak-to-trough decline, as a non-positive percentage.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub largest_win_pct: f64,
    pub largest_loss_pct: f64,
    pub avg_trade_size_pct: f64,
    pub profit_factor: Option<f64>,
}

impl MetricsReport {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        config: &MetricsConfig,
    ) -> Result<Self, AlphaError> {
        config.validate()?;
        let (first, last) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (first.equity, last.equity),
            _ => {
                return Err(AlphaError::InsufficientData {
                    reason: "equity curve is empty".into(),
                });
            }
        };

        let profit_pct = if first != 0.0 {
            (last / first - 1.0) * 100.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let (sharpe, sortino) = compute_risk_adjusted(equity_curve, config);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win_pct = 0.0_f64;
        let mut largest_loss_pct = 0.0_f64;
        let mut abs_return_sum = 0.0_f64;

        for trade in trades {
            let ret = trade.return_pct();
            abs_return_sum += ret.abs();
            if trade.pnl > 0.0 {
                trades_won += 1;
                gross_win += trade.pnl;
                largest_win_pct = largest_win_pct.max(ret);
            } else if trade.pnl < 0.0 {
                trades_lost += 1;
                gross_loss += -trade.pnl;
                largest_loss_pct = largest_loss_pct.min(ret);
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_trade_size_pct = if total_trades > 0 {
            abs_return_sum / total_trades as f64
        } else {
            0.0
        };
        let profit_factor = (gross_loss > 0.0).then(|| gross_win / gross_loss);

        Ok(MetricsReport {
            final_equity: last,
            profit_pct,
            sharpe,
            sortino,
            max_drawdown,
            max_drawdown_duration,
            win_rate,
            total_trades,
            trades_won,
            trades_lost,
            largest_win_pct,
            largest_loss_pct,
            avg_trade_size_pct,
            profit_factor,
        })
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            duration = 0;
            continue;
        }
        duration += 1;
        max_duration = max_duration.max(duration);
        if peak > 0.0 {
            let dd = (point.equity - peak) / peak * 100.0;
            max_dd = max_dd.min(dd);
        }
    }

    (max_dd, max_duration)
}

fn bar_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev != 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    config: &MetricsConfig,
) -> (Option<f64>, Option<f64>) {
    let returns = bar_returns(equity_curve);
    if returns.is_empty() {
        return (None, None);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let bar_rf = config.risk_free_rate / config.annualization_factor;
    let excess = mean - bar_rf;
    let scale = config.annualization_factor.sqrt();

    let sharpe = (stddev > 0.0).then(|| excess / stddev * scale);

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < bar_rf)
        .map(|&r| (r - bar_rf).powi(2))
        .sum::<f64>()
        / n;
    let downside = downside_variance.sqrt();
    let sortino = (downside > 0.0).then(|| excess / downside * scale);

    (sharpe, sortino)
}
