//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_result_store::CsvResultStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    build_data_config, build_execution_config, build_metrics_config, build_optimise_settings,
    load_run_settings, DataConfig,
};
use crate::domain::error::AlphaError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::optimiser::random_search;
use crate::domain::pipeline::{run_backtest, BacktestResult};
use crate::domain::stability::stability;
use crate::logging::DEFAULT_FILTER;
use crate::ports::price_data_port::PriceDataPort;
use crate::ports::result_store_port::ResultStorePort;

/// Number of optimiser results echoed to the console.
const TOP_RESULTS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "alphatester", about = "Single-asset crypto strategy backtester")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = DEFAULT_FILTER)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one backtest described by a config file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory to append runs.csv and equities.csv to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a config file without loading any prices
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Random parameter search using the [optimise] section
    Optimise {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Estimate parameter sensitivity from runs saved in a results directory
    Stability {
        #[arg(short, long)]
        results: PathBuf,
        /// Reference run id; defaults to the most profitable saved run
        #[arg(long)]
        run: Option<Uuid>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest { config, output } => run_single(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Optimise { config, output } => run_optimise(&config, output.as_deref()),
        Command::Stability { results, run } => run_stability(&results, run),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AlphaError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| match e {
        AlphaError::ConfigParse { .. } => e,
        other => AlphaError::ConfigParse {
            file: path.display().to_string(),
            reason: other.to_string(),
        },
    })
}

fn load_prices(data: &DataConfig) -> Result<PriceSeries, AlphaError> {
    let adapter = CsvPriceAdapter::new(&data.path);
    let prices = adapter.load_prices(&data.symbol, data.start, data.end)?;
    match (prices.bars().first(), prices.bars().last()) {
        (Some(first), Some(last)) => eprintln!(
            "Loaded {} bars for {} ({} to {})",
            prices.len(),
            prices.symbol(),
            first.timestamp.format("%Y-%m-%d"),
            last.timestamp.format("%Y-%m-%d"),
        ),
        _ => eprintln!("Loaded 0 bars for {}", prices.symbol()),
    }
    Ok(prices)
}

fn save_results(output: Option<&Path>, results: &[BacktestResult]) -> Result<(), AlphaError> {
    if let Some(dir) = output {
        let store = CsvResultStore::new(dir);
        store.save(results)?;
        eprintln!("\nResults written to: {}", dir.display());
    }
    Ok(())
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== Results ===");
    eprintln!("Run:              {}", result.run_id);
    eprintln!("Strategy:         {}", result.config_snapshot.strategy);
    eprintln!("Final Equity:     {:.2}", m.final_equity);
    eprintln!("Profit:           {:.2}%", m.profit_pct);
    eprintln!("Sharpe Ratio:     {}", fmt_ratio(m.sharpe));
    eprintln!("Sortino Ratio:    {}", fmt_ratio(m.sortino));
    eprintln!(
        "Max Drawdown:     {:.1}% over {} bars",
        m.max_drawdown, m.max_drawdown_duration
    );
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {}", fmt_ratio(m.profit_factor));
}

fn run_single(config_path: &Path, output: Option<&Path>) -> Result<(), AlphaError> {
    let config = load_config(config_path)?;
    let settings = load_run_settings(&config)?;
    let prices = load_prices(&settings.data)?;

    eprintln!("Running backtest: {}", settings.strategy);
    let result = run_backtest(
        &prices,
        &settings.strategy,
        &settings.execution,
        &settings.metrics,
    )?;
    print_summary(&result);
    save_results(output, std::slice::from_ref(&result))
}

fn run_validate(config_path: &Path) -> Result<(), AlphaError> {
    let config = load_config(config_path)?;
    let settings = load_run_settings(&config)?;

    eprintln!("\nData:");
    eprintln!("  path:   {}", settings.data.path.display());
    eprintln!("  symbol: {}", settings.data.symbol);
    eprintln!("\nStrategy: {}", settings.strategy);
    eprintln!("Indicators to compute:");
    for indicator in settings.strategy.required_indicators() {
        eprintln!("  {}", indicator);
    }
    eprintln!("\nConfiguration is valid");
    Ok(())
}

fn run_optimise(config_path: &Path, output: Option<&Path>) -> Result<(), AlphaError> {
    let config = load_config(config_path)?;
    let data = build_data_config(&config)?;
    let execution = build_execution_config(&config)?;
    let metrics = build_metrics_config(&config)?;
    let search = build_optimise_settings(&config)?;
    let prices = load_prices(&data)?;

    eprintln!(
        "Searching {} parameters: {} trials, seed {}",
        search.space.kind, search.trials, search.seed
    );
    let outcome = random_search(
        &prices,
        &search.space,
        search.trials,
        search.seed,
        &execution,
        &metrics,
    )?;

    eprintln!(
        "\n=== Top Results ({} completed, {} skipped) ===",
        outcome.results.len(),
        outcome.skipped
    );
    for (rank, result) in outcome.results.iter().take(TOP_RESULTS).enumerate() {
        let m = &result.metrics;
        eprintln!(
            "  {}. {}  profit {:.2}%, sharpe {}, max dd {:.1}%, {} trades",
            rank + 1,
            result.config_snapshot.strategy,
            m.profit_pct,
            fmt_ratio(m.sharpe),
            m.max_drawdown,
            m.total_trades,
        );
    }

    if outcome.results.is_empty() {
        return Err(AlphaError::InsufficientData {
            reason: format!("all {} trials were skipped", search.trials),
        });
    }
    save_results(output, &outcome.results)
}

fn run_stability(results: &Path, run: Option<Uuid>) -> Result<(), AlphaError> {
    let saved = CsvResultStore::new(results).load()?;
    eprintln!("Loaded {} saved runs from {}", saved.runs.len(), results.display());

    let reference = match run {
        Some(id) => saved
            .run(id)
            .ok_or_else(|| AlphaError::invalid("run", format!("no saved run {}", id)))?,
        None => saved
            .runs
            .iter()
            .max_by(|a, b| a.metrics.profit_pct.total_cmp(&b.metrics.profit_pct))
            .ok_or_else(|| AlphaError::InsufficientData {
                reason: format!("{} holds no runs", results.display()),
            })?,
    };

    let report = stability(reference, &saved.runs);
    eprintln!("\n=== Stability ===");
    eprintln!("Reference:        {}", reference.run_id);
    eprintln!("Strategy:         {}", reference.strategy);
    eprintln!("Profit:           {:.2}%", reference.metrics.profit_pct);
    eprintln!(
        "Compared:         {} runs ({} incomparable)",
        report.comparisons.len(),
        report.skipped
    );
    eprintln!("Lipschitz:        {:.3}", report.lipschitz());
    if let Some(steepest) = report.steepest() {
        eprintln!(
            "Steepest:         {} (distance {:.3}, profit change {:.3})",
            steepest.run_id, steepest.distance, steepest.profit_change
        );
    }
    Ok(())
}
