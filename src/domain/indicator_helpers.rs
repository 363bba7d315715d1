//! Indicator sets: every indicator a strategy needs, computed once per run.

use std::collections::BTreeMap;

use crate::domain::error::AlphaError;
use crate::domain::indicator::{self, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceSeries;

/// Indicator series keyed by identity, each aligned 1:1 with the price series
/// it was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: BTreeMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type, series);
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    /// Like `get`, but a missing indicator is an `InvalidParameter` error.
    pub fn require(&self, indicator_type: &IndicatorType) -> Result<&IndicatorSeries, AlphaError> {
        self.get(indicator_type).ok_or_else(|| {
            AlphaError::invalid(
                indicator_type.to_string(),
                "indicator was not computed for this run",
            )
        })
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndicatorType, &IndicatorSeries)> {
        self.series.iter()
    }

    /// Check that every series has one point per bar with matching timestamps.
    pub fn check_alignment(&self, prices: &PriceSeries) -> Result<(), AlphaError> {
        for (ty, series) in &self.series {
            if series.len() != prices.len() {
                return Err(AlphaError::misaligned(format!(
                    "{} has {} points but the price series has {} bars",
                    ty,
                    series.len(),
                    prices.len()
                )));
            }
            if let Some(i) = series
                .values
                .iter()
                .zip(prices.timestamps())
                .position(|(p, ts)| p.timestamp != ts)
            {
                return Err(AlphaError::misaligned(format!(
                    "{} timestamp at index {} does not match the price series",
                    ty, i
                )));
            }
        }
        Ok(())
    }
}

/// Compute each distinct indicator in `types` over `prices`.
pub fn compute_all(
    prices: &PriceSeries,
    types: &[IndicatorType],
) -> Result<IndicatorSet, AlphaError> {
    let mut set = IndicatorSet::new();
    for ty in types {
        if set.get(ty).is_none() {
            set.insert(indicator::compute(*ty, prices)?);
        }
    }
    Ok(set)
}
