//! CSV file data adapter.
//!
//! One file per symbol and resolution: `<base>/<SYMBOL>_<resolution>.csv`
//! with header `time,open,high,low,close,volume`.

use crate::domain::bar::{parse_timestamp, Bar};
use crate::domain::error::ReplayError;
use crate::domain::resolution::Resolution;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, symbol: &str, resolution: Resolution) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.to_uppercase(), resolution.as_str()))
    }

    /// Every bar in the symbol's file, sorted stably by time.
    fn read_all(&self, symbol: &str, resolution: Resolution) -> Result<Vec<Bar>, ReplayError> {
        let path = self.csv_path(symbol, resolution);
        let content = fs::read_to_string(&path).map_err(|e| ReplayError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| ReplayError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let time = parse_timestamp(&row.time).ok_or_else(|| ReplayError::Data {
                reason: format!(
                    "{}: row {}: invalid time '{}'",
                    path.display(),
                    line + 1,
                    row.time
                ),
            })?;
            let bar = Bar {
                symbol: symbol.to_uppercase(),
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            };
            if !bar.is_qualifying() {
                warn!(symbol = %bar.symbol, time = %bar.time, "non-qualifying bar in CSV");
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.time);
        debug!(path = %path.display(), bars = bars.len(), "loaded CSV bars");
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, ReplayError> {
        let bars = self.read_all(symbol, resolution)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.time >= start && b.time < end)
            .collect())
    }

    fn fetch_history(
        &self,
        symbol: &str,
        resolution: Resolution,
        before: NaiveDateTime,
        count: usize,
    ) -> Result<Vec<Bar>, ReplayError> {
        let mut bars: Vec<Bar> = self
            .read_all(symbol, resolution)?
            .into_iter()
            .filter(|b| b.time < before)
            .collect();
        let skip = bars.len().saturating_sub(count);
        Ok(bars.split_off(skip))
    }

    fn list_symbols(&self, resolution: Resolution) -> Result<Vec<String>, ReplayError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ReplayError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", resolution.as_str());
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| ReplayError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "time,open,high,low,close,volume\n\
            2013-10-04 15:00:00,168.0,169.0,167.5,168.5,40000\n\
            2013-10-07 10:00:00,100.0,110.0,90.0,105.0,50000\n\
            2013-10-07 09:00:00,99.0,101.0,98.0,100.0,45000\n\
            2013-10-07 11:00:00,105.0,115.0,100.0,110.0,60000\n\
            2013-10-08 10:00:00,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("SPY_hour.csv"), csv_content).unwrap();
        fs::write(path.join("QQQ_hour.csv"), "time,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("SPY_daily.csv"), "time,open,high,low,close,volume\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_sorted_window() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_bars("spy", Resolution::Hour, at(7, 0), at(8, 0))
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].time, at(7, 9));
        assert_eq!(bars[0].symbol, "SPY");
        assert_eq!(bars[1].open, 100.0);
        assert_eq!(bars[1].high, 110.0);
        assert_eq!(bars[1].low, 90.0);
        assert_eq!(bars[1].close, 105.0);
        assert_eq!(bars[1].volume, 50000);
    }

    #[test]
    fn fetch_bars_end_is_exclusive() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_bars("SPY", Resolution::Hour, at(7, 10), at(7, 11))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].time, at(7, 10));
    }

    #[test]
    fn fetch_history_returns_last_bars_before() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_history("SPY", Resolution::Hour, at(7, 11), 2)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, at(7, 9));
        assert_eq!(bars[1].time, at(7, 10));

        let all = adapter
            .fetch_history("SPY", Resolution::Hour, at(7, 0), 10)
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].time, at(4, 15));
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_bars("XYZ", Resolution::Hour, at(7, 0), at(8, 0));
        assert!(matches!(result, Err(ReplayError::Data { .. })));
    }

    #[test]
    fn bad_row_is_a_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD_hour.csv"),
            "time,open,high,low,close,volume\nyesterday,1,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_bars("BAD", Resolution::Hour, at(7, 0), at(8, 0));
        assert!(matches!(result, Err(ReplayError::Data { .. })));
    }

    #[test]
    fn list_symbols_filters_by_resolution() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols(Resolution::Hour).unwrap(), vec!["QQQ", "SPY"]);
        assert_eq!(adapter.list_symbols(Resolution::Daily).unwrap(), vec!["SPY"]);
    }
}
