//! Parameter sensitivity between runs of one strategy on one data window.
//!
//! Two runs are comparable when they share the strategy family, symbol, data
//! window and execution settings; otherwise their distance is infinite.
//! For comparable runs each parameter contributes `|exp(-|a - b|) - 1|`,
//! rounded to two decimals. Moving averages contribute 0.5 when their types
//! differ plus half the same term on their periods. The distance is the mean
//! over the strategy's parameters.
//!
//! The profit change is `|profit_a - profit_b| / 100`, rounded to three
//! decimals, and the sensitivity ratio is change over distance. The largest
//! ratio between a reference run and its comparable neighbours is a
//! Lipschitz-style estimate of how sharply profit reacts to the parameters.

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::pipeline::RunSummary;
use super::strategy::ParamValue;

const NEGLIGIBLE_DISTANCE: f64 = 1e-12;

fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

fn closeness(a: f64, b: f64) -> f64 {
    round_to(((-(a - b).abs()).exp() - 1.0).abs(), 2)
}

fn comparable(a: &RunSummary, b: &RunSummary) -> bool {
    a.strategy.kind() == b.strategy.kind()
        && a.symbol == b.symbol
        && a.start == b.start
        && a.end == b.end
        && a.execution == b.execution
}

/// Distance between the parameter sets of two runs, in `[0, 1]`, or infinity
/// when the runs are not comparable.
pub fn parameter_distance(a: &RunSummary, b: &RunSummary) -> f64 {
    if !comparable(a, b) {
        return f64::INFINITY;
    }
    let pa = a.strategy.params();
    let pb = b.strategy.params();
    let total: f64 = pa
        .iter()
        .zip(&pb)
        .map(|((_, x), (_, y))| match (x, y) {
            (ParamValue::Number(x), ParamValue::Number(y)) => closeness(*x, *y),
            (ParamValue::MovingAverage(x), ParamValue::MovingAverage(y)) => {
                let kind = if x.kind == y.kind { 0.0 } else { 0.5 };
                kind + closeness(x.period as f64, y.period as f64) / 2.0
            }
            _ => 1.0,
        })
        .sum();
    total / pa.len().max(1) as f64
}

/// Absolute difference in profit as a fraction of initial equity.
pub fn profit_change(a: &RunSummary, b: &RunSummary) -> f64 {
    round_to(
        (a.metrics.profit_pct - b.metrics.profit_pct).abs() / 100.0,
        3,
    )
}

/// Profit change per unit of parameter distance. Zero when the distance is
/// negligible or infinite.
pub fn sensitivity_ratio(distance: f64, change: f64) -> f64 {
    if distance < NEGLIGIBLE_DISTANCE || !distance.is_finite() {
        return 0.0;
    }
    round_to(change / distance, 3)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunComparison {
    pub run_id: Uuid,
    pub distance: f64,
    pub profit_change: f64,
    pub ratio: f64,
}

pub fn compare_runs(reference: &RunSummary, other: &RunSummary) -> RunComparison {
    let distance = parameter_distance(reference, other);
    let change = profit_change(reference, other);
    RunComparison {
        run_id: other.run_id,
        distance,
        profit_change: change,
        ratio: sensitivity_ratio(distance, change),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityReport {
    pub reference: Uuid,
    /// Comparable runs, in input order.
    pub comparisons: Vec<RunComparison>,
    /// Incomparable runs left out of the estimate.
    pub skipped: usize,
}

impl StabilityReport {
    /// Largest ratio over the comparable runs, 0 when there are none.
    pub fn lipschitz(&self) -> f64 {
        self.comparisons.iter().map(|c| c.ratio).fold(0.0, f64::max)
    }

    /// The comparison that sets the estimate.
    pub fn steepest(&self) -> Option<&RunComparison> {
        self.comparisons
            .iter()
            .max_by(|a, b| a.ratio.total_cmp(&b.ratio))
    }
}

/// Compare `reference` against every other run. The reference itself (by run
/// id) and runs with an infinite distance are not compared.
pub fn stability(reference: &RunSummary, runs: &[RunSummary]) -> StabilityReport {
    let mut comparisons = Vec::new();
    let mut skipped = 0;
    for run in runs.iter().filter(|r| r.run_id != reference.run_id) {
        let comparison = compare_runs(reference, run);
        if comparison.distance.is_finite() {
            comparisons.push(comparison);
        } else {
            skipped += 1;
        }
    }
    let report = StabilityReport {
        reference: reference.run_id,
        comparisons,
        skipped,
    };
    debug!(
        reference = %report.reference,
        compared = report.comparisons.len(),
        skipped = report.skipped,
        lipschitz = report.lipschitz(),
        "stability estimate"
    );
    report
}
