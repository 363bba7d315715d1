//! Property tests over randomly generated price paths.

mod common;

use alphatester::domain::execution::ExecutionConfig;
use alphatester::domain::metrics::MetricsConfig;
use alphatester::domain::pipeline::run_backtest;
use alphatester::domain::strategy::{MovingAverage, StrategyConfig};
use approx::relative_eq;
use common::*;
use proptest::prelude::*;

/// Random walk of multiplicative steps, always positive.
fn price_path(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (
        10.0..1000.0f64,
        prop::collection::vec(-0.08..0.08f64, min_len..120),
    )
        .prop_map(|(start, steps)| {
            let mut price = start;
            steps
                .into_iter()
                .map(|s| {
                    price *= 1.0 + s;
                    price
                })
                .collect()
        })
}

fn strategy_config() -> impl Strategy<Value = StrategyConfig> {
    prop_oneof![
        (1usize..6).prop_map(|lookback| StrategyConfig::Momentum { lookback }),
        (2usize..10, 0.5..2.5f64).prop_map(|(lookback, zscore_threshold)| {
            StrategyConfig::MeanReversion {
                lookback,
                zscore_threshold,
            }
        }),
        (2usize..10).prop_map(|period| StrategyConfig::Rsi {
            period,
            overbought: 70.0,
            oversold: 30.0,
        }),
        (2usize..10, 1.0..3.0f64).prop_map(|(period, num_std)| StrategyConfig::Bollinger {
            period,
            num_std,
        }),
        (2usize..5, 6usize..12).prop_map(|(fast, slow)| {
            StrategyConfig::MovingAverageCrossover {
                fast: MovingAverage::ema(fast),
                slow: MovingAverage::sma(slow),
                margin: 0.0,
            }
        }),
    ]
}

proptest! {
    #[test]
    fn zero_fee_pnl_sums_to_equity_change(
        closes in price_path(12),
        strategy in strategy_config(),
        allow_shorting in any::<bool>(),
        position_fraction in 0.1..=1.0f64,
    ) {
        let execution = ExecutionConfig {
            allow_shorting,
            position_fraction,
            ..ExecutionConfig::default()
        };
        let result = run_backtest(
            &make_series(&closes),
            &strategy,
            &execution,
            &MetricsConfig::default(),
        )
        .unwrap();
        let total_pnl: f64 = result.trade_list.iter().map(|t| t.pnl).sum();
        let change = result.metrics.final_equity - execution.initial_equity;
        prop_assert!(
            relative_eq!(total_pnl, change, epsilon = 1e-6, max_relative = 1e-9),
            "sum of pnl {} vs equity change {}",
            total_pnl,
            change
        );
    }

    #[test]
    fn identical_inputs_give_identical_curves(
        closes in price_path(12),
        strategy in strategy_config(),
        fee_bps in 0.0..50.0f64,
    ) {
        let prices = make_series(&closes);
        let execution = ExecutionConfig {
            fee_bps,
            slippage_bps: fee_bps / 2.0,
            ..ExecutionConfig::default()
        };
        let a = run_backtest(&prices, &strategy, &execution, &MetricsConfig::default()).unwrap();
        let b = run_backtest(&prices, &strategy, &execution, &MetricsConfig::default()).unwrap();
        prop_assert_eq!(a.equity_curve, b.equity_curve);
        prop_assert_eq!(a.trade_list, b.trade_list);
        prop_assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn metrics_stay_in_range(
        closes in price_path(12),
        strategy in strategy_config(),
        fee_bps in 0.0..50.0f64,
    ) {
        let execution = ExecutionConfig {
            fee_bps,
            ..ExecutionConfig::default()
        };
        let result = run_backtest(
            &make_series(&closes),
            &strategy,
            &execution,
            &MetricsConfig::default(),
        )
        .unwrap();
        let m = &result.metrics;
        prop_assert!(m.max_drawdown <= 0.0);
        prop_assert!((0.0..=1.0).contains(&m.win_rate));
        prop_assert!(m.trades_won + m.trades_lost <= m.total_trades);
        prop_assert_eq!(m.total_trades, result.trade_list.len());
        prop_assert!(m.max_drawdown_duration < result.equity_curve.len());
    }

    #[test]
    fn rising_prices_keep_momentum_long(
        start in 1.0..500.0f64,
        steps in prop::collection::vec(0.01..5.0f64, 2..60),
    ) {
        let mut price = start;
        let mut closes = vec![price];
        for step in steps {
            price += step;
            closes.push(price);
        }
        let result = run_backtest(
            &make_series(&closes),
            &StrategyConfig::Momentum { lookback: 1 },
            &ExecutionConfig::default(),
            &MetricsConfig::default(),
        )
        .unwrap();
        let positions = result.signal_series.positions();
        prop_assert_eq!(positions[0], 0);
        prop_assert!(positions[1..].iter().all(|&p| p == 1));
    }
}
