//! CSV result store.
//!
//! Keeps two files in the output directory:
//! - `runs.csv`: one row per run with its symbol, data window, strategy
//!   parameters, execution settings and metrics; rows are appended across
//!   invocations.
//! - `equities.csv`: one column per run id holding that run's equity curve.
//!   Existing columns are kept and shorter columns are padded with empty
//!   cells.
//!
//! Both files can be read back into `SavedRuns`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::error::AlphaError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::metrics::MetricsReport;
use crate::domain::ohlcv::parse_timestamp;
use crate::domain::pipeline::{BacktestResult, RunSummary};
use crate::domain::strategy::StrategyConfig;
use crate::ports::result_store_port::{ResultStorePort, SavedRuns};

const RUNS_FILE: &str = "runs.csv";
const EQUITIES_FILE: &str = "equities.csv";

const RUN_HEADER: [&str; 26] = [
    "run_id",
    "symbol",
    "strategy",
    "params",
    "start",
    "end",
    "bars",
    "initial_equity",
    "fee_bps",
    "slippage_bps",
    "position_fraction",
    "allow_shorting",
    "final_equity",
    "profit_pct",
    "sharpe",
    "sortino",
    "max_drawdown",
    "max_drawdown_duration",
    "win_rate",
    "total_trades",
    "trades_won",
    "trades_lost",
    "largest_win_pct",
    "largest_loss_pct",
    "avg_trade_size_pct",
    "profit_factor",
];

fn csv_error(path: &Path, e: csv::Error) -> AlphaError {
    AlphaError::Data {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn run_row(run: &RunSummary) -> Vec<String> {
    let m = &run.metrics;
    let e = &run.execution;
    let params: Vec<String> = run
        .strategy
        .params()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    vec![
        run.run_id.to_string(),
        run.symbol.clone(),
        run.strategy.kind().to_string(),
        params.join(";"),
        opt(run.start.map(|t| t.to_rfc3339())),
        opt(run.end.map(|t| t.to_rfc3339())),
        run.bars.to_string(),
        e.initial_equity.to_string(),
        e.fee_bps.to_string(),
        e.slippage_bps.to_string(),
        e.position_fraction.to_string(),
        e.allow_shorting.to_string(),
        m.final_equity.to_string(),
        m.profit_pct.to_string(),
        opt(m.sharpe),
        opt(m.sortino),
        m.max_drawdown.to_string(),
        m.max_drawdown_duration.to_string(),
        m.win_rate.to_string(),
        m.total_trades.to_string(),
        m.trades_won.to_string(),
        m.trades_lost.to_string(),
        m.largest_win_pct.to_string(),
        m.largest_loss_pct.to_string(),
        m.avg_trade_size_pct.to_string(),
        opt(m.profit_factor),
    ]
}

/// One `runs.csv` record with its columns looked up by header name.
struct RunRow<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
    line: u64,
}

impl RunRow<'_> {
    fn error(&self, column: &str, reason: impl std::fmt::Display) -> AlphaError {
        AlphaError::Data {
            reason: format!("{} line {}, column {}: {}", RUNS_FILE, self.line, column, reason),
        }
    }

    fn text(&self, column: &str) -> Result<&str, AlphaError> {
        self.columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .map(str::trim)
            .ok_or_else(|| self.error(column, "missing"))
    }

    fn parse<T: FromStr>(&self, column: &str) -> Result<T, AlphaError> {
        let raw = self.text(column)?;
        raw.parse()
            .map_err(|_| self.error(column, format!("cannot parse '{}'", raw)))
    }

    fn optional<T: FromStr>(&self, column: &str) -> Result<Option<T>, AlphaError> {
        if self.text(column)?.is_empty() {
            return Ok(None);
        }
        self.parse(column).map(Some)
    }

    fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, AlphaError> {
        let raw = self.text(column)?;
        if raw.is_empty() {
            return Ok(None);
        }
        parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| self.error(column, format!("cannot parse '{}'", raw)))
    }

    fn strategy(&self) -> Result<StrategyConfig, AlphaError> {
        let kind = self.parse("strategy")?;
        let params = self
            .text("params")?
            .split(';')
            .filter(|pair| !pair.trim().is_empty())
            .map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .ok_or_else(|| self.error("params", format!("expected name=value, got '{}'", pair)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        StrategyConfig::from_params(kind, &params).map_err(|e| self.error("params", e))
    }

    fn summary(&self) -> Result<RunSummary, AlphaError> {
        Ok(RunSummary {
            run_id: self.parse("run_id")?,
            symbol: self.text("symbol")?.to_string(),
            strategy: self.strategy()?,
            execution: ExecutionConfig {
                initial_equity: self.parse("initial_equity")?,
                fee_bps: self.parse("fee_bps")?,
                slippage_bps: self.parse("slippage_bps")?,
                position_fraction: self.parse("position_fraction")?,
                allow_shorting: self.parse("allow_shorting")?,
            },
            start: self.timestamp("start")?,
            end: self.timestamp("end")?,
            bars: self.parse("bars")?,
            metrics: MetricsReport {
                final_equity: self.parse("final_equity")?,
                profit_pct: self.parse("profit_pct")?,
                sharpe: self.optional("sharpe")?,
                sortino: self.optional("sortino")?,
                max_drawdown: self.parse("max_drawdown")?,
                max_drawdown_duration: self.parse("max_drawdown_duration")?,
                win_rate: self.parse("win_rate")?,
                total_trades: self.parse("total_trades")?,
                trades_won: self.parse("trades_won")?,
                trades_lost: self.parse("trades_lost")?,
                largest_win_pct: self.parse("largest_win_pct")?,
                largest_loss_pct: self.parse("largest_loss_pct")?,
                avg_trade_size_pct: self.parse("avg_trade_size_pct")?,
                profit_factor: self.optional("profit_factor")?,
            },
        })
    }
}

pub struct CsvResultStore {
    dir: PathBuf,
}

impl CsvResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn runs_path(&self) -> PathBuf {
        self.dir.join(RUNS_FILE)
    }

    pub fn equities_path(&self) -> PathBuf {
        self.dir.join(EQUITIES_FILE)
    }

    fn append_runs(&self, results: &[BacktestResult]) -> Result<(), AlphaError> {
        let path = self.runs_path();
        let has_header = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let mut wtr = csv::Writer::from_writer(file);
        if !has_header {
            wtr.write_record(RUN_HEADER)
                .map_err(|e| csv_error(&path, e))?;
        }
        for result in results {
            wtr.write_record(run_row(&result.summary()))
                .map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Existing equity columns as `(header, values)`; values are kept as text.
    fn read_equity_columns(&self) -> Result<Vec<(String, Vec<String>)>, AlphaError> {
        let path = self.equities_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| csv_error(&path, e))?;
        let mut columns: Vec<(String, Vec<String>)> = rdr
            .headers()
            .map_err(|e| csv_error(&path, e))?
            .iter()
            .map(|h| (h.to_string(), Vec::new()))
            .collect();
        for record in rdr.records() {
            let record = record.map_err(|e| csv_error(&path, e))?;
            for (i, (_, values)) in columns.iter_mut().enumerate() {
                values.push(record.get(i).unwrap_or("").to_string());
            }
        }
        Ok(columns)
    }

    fn read_runs(&self) -> Result<Vec<RunSummary>, AlphaError> {
        let path = self.runs_path();
        if !path.exists() {
            return Err(AlphaError::Data {
                reason: format!("no saved runs at {}", path.display()),
            });
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        let columns: HashMap<String, usize> = rdr
            .headers()
            .map_err(|e| csv_error(&path, e))?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();

        let mut runs = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| csv_error(&path, e))?;
            let row = RunRow {
                columns: &columns,
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                record: &record,
            };
            runs.push(row.summary()?);
        }
        Ok(runs)
    }

    fn read_equities(&self) -> Result<Vec<(Uuid, Vec<f64>)>, AlphaError> {
        let bad = |what: String| AlphaError::Data {
            reason: format!("{}: {}", EQUITIES_FILE, what),
        };
        self.read_equity_columns()?
            .into_iter()
            .map(|(header, cells)| {
                let run_id: Uuid = header
                    .trim()
                    .parse()
                    .map_err(|_| bad(format!("column '{}' is not a run id", header)))?;
                let curve = cells
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(|c| {
                        c.parse::<f64>()
                            .map_err(|_| bad(format!("cannot parse '{}' in column {}", c, run_id)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((run_id, curve))
            })
            .collect()
    }

    fn write_equities(&self, results: &[BacktestResult]) -> Result<(), AlphaError> {
        let path = self.equities_path();
        let mut columns = self.read_equity_columns()?;
        for result in results {
            columns.push((
                result.run_id.to_string(),
                result
                    .equity_curve
                    .iter()
                    .map(|p| p.equity.to_string())
                    .collect(),
            ));
        }

        let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut wtr = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        wtr.write_record(columns.iter().map(|(h, _)| h.as_str()))
            .map_err(|e| csv_error(&path, e))?;
        for i in 0..rows {
            wtr.write_record(
                columns
                    .iter()
                    .map(|(_, v)| v.get(i).map(String::as_str).unwrap_or("")),
            )
            .map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ResultStorePort for CsvResultStore {
    fn save(&self, results: &[BacktestResult]) -> Result<(), AlphaError> {
        if results.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        self.append_runs(results)?;
        self.write_equities(results)?;
        info!(
            runs = results.len(),
            dir = %self.dir.display(),
            "saved backtest results"
        );
        Ok(())
    }

    fn load(&self) -> Result<SavedRuns, AlphaError> {
        let saved = SavedRuns {
            runs: self.read_runs()?,
            equities: self.read_equities()?,
        };
        debug!(
            runs = saved.runs.len(),
            curves = saved.equities.len(),
            dir = %self.dir.display(),
            "loaded saved runs"
        );
        Ok(saved)
    }
}
