//! Price data access port.

use chrono::{DateTime, Utc};

use crate::domain::error::AlphaError;
use crate::domain::ohlcv::PriceSeries;

pub trait PriceDataPort {
    /// Load bars for `symbol` with `start <= timestamp <= end`, oldest first.
    fn load_prices(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<PriceSeries, AlphaError>;
}
