//! Historical data provider port.

use crate::domain::bar::Bar;
use crate::domain::error::ReplayError;
use crate::domain::resolution::Resolution;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars with `start <= time < end`, ascending by time.
    fn fetch_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, ReplayError>;

    /// The last `count` bars strictly before `before`, ascending by time.
    ///
    /// Returns fewer than `count` bars when the provider has less history.
    fn fetch_history(
        &self,
        symbol: &str,
        resolution: Resolution,
        before: NaiveDateTime,
        count: usize,
    ) -> Result<Vec<Bar>, ReplayError>;

    fn list_symbols(&self, resolution: Resolution) -> Result<Vec<String>, ReplayError>;
}
