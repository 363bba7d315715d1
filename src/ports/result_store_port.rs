//! Result persistence port.

use uuid::Uuid;

use crate::domain::error::AlphaError;
use crate::domain::pipeline::{BacktestResult, RunSummary};

/// Runs read back from a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedRuns {
    pub runs: Vec<RunSummary>,
    /// Equity curve per run id, in stored order. Missing cells are dropped.
    pub equities: Vec<(Uuid, Vec<f64>)>,
}

impl SavedRuns {
    pub fn run(&self, run_id: Uuid) -> Option<&RunSummary> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }

    pub fn equity(&self, run_id: Uuid) -> Option<&[f64]> {
        self.equities
            .iter()
            .find(|(id, _)| *id == run_id)
            .map(|(_, curve)| curve.as_slice())
    }
}

/// Store for finished backtest runs.
pub trait ResultStorePort {
    fn save(&self, results: &[BacktestResult]) -> Result<(), AlphaError>;

    fn load(&self) -> Result<SavedRuns, AlphaError>;
}
