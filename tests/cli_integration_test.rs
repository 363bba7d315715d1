//! CLI integration tests.
//!
//! Tests cover:
//! - Config loading into run settings (defaults, overrides, failures)
//! - `backtest`, `validate`, and `optimise` against INI and CSV files on disk
//! - Exit codes for each error class

mod common;

use alphatester::adapters::file_config_adapter::FileConfigAdapter;
use alphatester::cli::{self, Cli};
use alphatester::domain::config_validation::{build_optimise_settings, load_run_settings};
use alphatester::domain::error::AlphaError;
use alphatester::domain::strategy::{StrategyConfig, StrategyKind};
use clap::Parser;
use common::*;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

/// A temp directory holding `BTC-USD.csv` and a `run.ini` pointing at it.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(strategy_and_extras: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("BTC-USD.csv"), price_csv(&wavy_closes(90))).unwrap();
        let ini = format!(
            "[data]\npath = {}\nsymbol = BTC-USD\n\n[execution]\nfee_bps = 10\n\n{}",
            dir.path().display(),
            strategy_and_extras
        );
        fs::write(dir.path().join("run.ini"), ini).unwrap();
        Workspace { dir }
    }

    fn config(&self) -> String {
        self.dir.path().join("run.ini").display().to_string()
    }

    fn out(&self) -> String {
        self.dir.path().join("out").display().to_string()
    }

    fn run(&self, args: &[&str]) -> ExitCode {
        let mut argv = vec!["alphatester"];
        argv.extend_from_slice(args);
        cli::run(Cli::parse_from(argv))
    }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

const MOMENTUM: &str = "[strategy]\nkind = momentum\nlookback = 3\n";

mod config_loading {
    use super::*;

    #[test]
    fn run_settings_from_ini() {
        let ini = r#"
[data]
path = ./prices
symbol = SOL-USD
start = 2024-01-01
end = 2024-03-31

[execution]
initial_equity = 5000
fee_bps = 7.5
allow_shorting = false

[metrics]
annualization_factor = 252

[strategy]
kind = bollinger
period = 15
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let settings = load_run_settings(&adapter).unwrap();
        assert_eq!(settings.data.symbol, "SOL-USD");
        assert_eq!(settings.data.start, Some(ts("2024-01-01")));
        assert_eq!(settings.data.end, Some(ts("2024-03-31")));
        assert_eq!(settings.execution.initial_equity, 5000.0);
        assert_eq!(settings.execution.fee_bps, 7.5);
        assert!(!settings.execution.allow_shorting);
        assert_eq!(settings.execution.position_fraction, 1.0);
        assert_eq!(settings.metrics.annualization_factor, 252.0);
        assert_eq!(
            settings.strategy,
            StrategyConfig::Bollinger {
                period: 15,
                num_std: 2.0
            }
        );
    }

    #[test]
    fn missing_strategy_kind() {
        let adapter = FileConfigAdapter::from_string("[data]\nsymbol = BTC-USD\n").unwrap();
        let err = load_run_settings(&adapter).unwrap_err();
        assert!(matches!(err, AlphaError::ConfigMissing { ref key, .. } if key == "kind"));
    }

    #[test]
    fn bad_bool_is_config_invalid() {
        let ini = "[data]\nsymbol = X\n[strategy]\nkind = momentum\n[execution]\nallow_shorting = sometimes\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = load_run_settings(&adapter).unwrap_err();
        assert!(matches!(err, AlphaError::ConfigInvalid { ref key, .. } if key == "allow_shorting"));
    }

    #[test]
    fn optimise_ranges_from_ini() {
        let ini = r#"
[strategy]
kind = ma_crossover
slow_type = ema

[optimise]
trials = 12
seed = 7
fast_min = 2
fast_max = 8
slow_min = 10
slow_max = 40
margin_min = 0
margin_max = 0.01
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let settings = build_optimise_settings(&adapter).unwrap();
        assert_eq!(settings.space.kind, StrategyKind::MovingAverageCrossover);
        assert_eq!(settings.trials, 12);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.space.ranges.len(), 3);
        assert_eq!(settings.space.ranges["slow"].min, 10.0);
    }
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_results_when_output_given() {
        let ws = Workspace::new(MOMENTUM);
        let code = ws.run(&["backtest", "-c", &ws.config(), "-o", &ws.out()]);
        assert_eq!(code, ExitCode::SUCCESS);

        let out = ws.dir.path().join("out");
        assert_eq!(line_count(&out.join("runs.csv")), 2);
        assert_eq!(line_count(&out.join("equities.csv")), 91);
    }

    #[test]
    fn repeated_runs_append() {
        let ws = Workspace::new(MOMENTUM);
        for _ in 0..2 {
            let code = ws.run(&["backtest", "-c", &ws.config(), "-o", &ws.out()]);
            assert_eq!(code, ExitCode::SUCCESS);
        }
        let out = ws.dir.path().join("out");
        assert_eq!(line_count(&out.join("runs.csv")), 3);
        let header = fs::read_to_string(out.join("equities.csv")).unwrap();
        assert_eq!(header.lines().next().unwrap().split(',').count(), 2);
    }

    #[test]
    fn without_output_writes_nothing() {
        let ws = Workspace::new(MOMENTUM);
        let code = ws.run(&["backtest", "-c", &ws.config()]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!ws.dir.path().join("out").exists());
    }

    #[test]
    fn missing_config_file_exits_2() {
        let ws = Workspace::new(MOMENTUM);
        let missing = ws.dir.path().join("nope.ini").display().to_string();
        assert_eq!(ws.run(&["backtest", "-c", &missing]), ExitCode::from(2));
    }

    #[test]
    fn missing_price_file_exits_3() {
        let ws = Workspace::new(MOMENTUM);
        fs::remove_file(ws.dir.path().join("BTC-USD.csv")).unwrap();
        assert_eq!(ws.run(&["backtest", "-c", &ws.config()]), ExitCode::from(3));
    }

    #[test]
    fn lookback_longer_than_data_exits_4() {
        let ws = Workspace::new("[strategy]\nkind = momentum\nlookback = 500\n");
        assert_eq!(ws.run(&["backtest", "-c", &ws.config()]), ExitCode::from(4));
    }

    #[test]
    fn empty_date_window_exits_5() {
        let ws = Workspace::new(MOMENTUM);
        let ini = fs::read_to_string(ws.dir.path().join("run.ini")).unwrap();
        let ini = ini.replace(
            "symbol = BTC-USD\n",
            "symbol = BTC-USD\nstart = 2030-01-01\n",
        );
        fs::write(ws.dir.path().join("run.ini"), ini).unwrap();
        assert_eq!(ws.run(&["backtest", "-c", &ws.config()]), ExitCode::from(5));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_succeeds_without_prices() {
        let ws = Workspace::new("[strategy]\nkind = rsi\nperiod = 10\n");
        fs::remove_file(ws.dir.path().join("BTC-USD.csv")).unwrap();
        assert_eq!(ws.run(&["validate", "-c", &ws.config()]), ExitCode::SUCCESS);
    }

    #[test]
    fn invalid_strategy_params_exit_2() {
        let ws = Workspace::new("[strategy]\nkind = ma_crossover\nfast = 30\nslow = 10\n");
        assert_eq!(ws.run(&["validate", "-c", &ws.config()]), ExitCode::from(2));
    }

    #[test]
    fn unknown_strategy_exits_2() {
        let ws = Workspace::new("[strategy]\nkind = martingale\n");
        assert_eq!(ws.run(&["validate", "-c", &ws.config()]), ExitCode::from(2));
    }
}

mod optimise_command {
    use super::*;

    const SEARCH: &str = "[strategy]\nkind = momentum\n\n[optimise]\ntrials = 8\nseed = 1\nlookback_min = 1\nlookback_max = 20\n";

    #[test]
    fn saves_every_completed_trial() {
        let ws = Workspace::new(SEARCH);
        let code = ws.run(&["optimise", "-c", &ws.config(), "-o", &ws.out()]);
        assert_eq!(code, ExitCode::SUCCESS);
        let out = ws.dir.path().join("out");
        assert_eq!(line_count(&out.join("runs.csv")), 1 + 8);
    }

    #[test]
    fn missing_range_exits_2() {
        let ws = Workspace::new("[strategy]\nkind = momentum\n\n[optimise]\nlookback_min = 1\n");
        assert_eq!(ws.run(&["optimise", "-c", &ws.config()]), ExitCode::from(2));
    }

    #[test]
    fn crossover_search_explores_both_average_types() {
        let ws = Workspace::new(
            "[strategy]\nkind = ma_crossover\nfast_type = any\n\n[optimise]\ntrials = 12\nseed = 3\nfast_min = 2\nfast_max = 6\nslow_min = 10\nslow_max = 30\nmargin_min = 0\nmargin_max = 0.01\n",
        );
        let code = ws.run(&["optimise", "-c", &ws.config(), "-o", &ws.out()]);
        assert_eq!(code, ExitCode::SUCCESS);
        let runs = fs::read_to_string(ws.dir.path().join("out").join("runs.csv")).unwrap();
        assert!(runs.contains("fast=SMA("));
        assert!(runs.contains("fast=EMA("));
    }

    #[test]
    fn inverted_range_exits_4() {
        let ws = Workspace::new(
            "[strategy]\nkind = momentum\n\n[optimise]\nlookback_min = 20\nlookback_max = 5\n",
        );
        assert_eq!(ws.run(&["optimise", "-c", &ws.config()]), ExitCode::from(4));
    }
}

mod stability_command {
    use super::*;

    const SEARCH: &str = "[strategy]\nkind = momentum\n\n[optimise]\ntrials = 6\nseed = 9\nlookback_min = 1\nlookback_max = 12\n";

    #[test]
    fn reads_runs_saved_by_optimise() {
        let ws = Workspace::new(SEARCH);
        let code = ws.run(&["optimise", "-c", &ws.config(), "-o", &ws.out()]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(ws.run(&["stability", "-r", &ws.out()]), ExitCode::SUCCESS);
    }

    #[test]
    fn unknown_reference_run_exits_4() {
        let ws = Workspace::new(MOMENTUM);
        ws.run(&["backtest", "-c", &ws.config(), "-o", &ws.out()]);
        let code = ws.run(&[
            "stability",
            "-r",
            &ws.out(),
            "--run",
            "00000000-0000-0000-0000-000000000000",
        ]);
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn missing_results_exit_3() {
        let ws = Workspace::new(MOMENTUM);
        assert_eq!(ws.run(&["stability", "-r", &ws.out()]), ExitCode::from(3));
    }
}
