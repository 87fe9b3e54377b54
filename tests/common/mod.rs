#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tickreplay::domain::backtest::BacktestConfig;
pub use tickreplay::domain::bar::Bar;
use tickreplay::domain::error::ReplayError;
use tickreplay::domain::execution::ExecutionConfig;
use tickreplay::domain::resolution::Resolution;
use tickreplay::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn bars(&self, symbol: &str) -> Result<Vec<Bar>, ReplayError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ReplayError::Data {
                reason: reason.clone(),
            });
        }
        let mut bars = self.data.get(symbol).cloned().unwrap_or_default();
        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _resolution: Resolution,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, ReplayError> {
        Ok(self
            .bars(symbol)?
            .into_iter()
            .filter(|b| b.time >= start && b.time < end)
            .collect())
    }

    fn fetch_history(
        &self,
        symbol: &str,
        _resolution: Resolution,
        before: NaiveDateTime,
        count: usize,
    ) -> Result<Vec<Bar>, ReplayError> {
        let mut bars: Vec<Bar> = self
            .bars(symbol)?
            .into_iter()
            .filter(|b| b.time < before)
            .collect();
        let skip = bars.len().saturating_sub(count);
        Ok(bars.split_off(skip))
    }

    fn list_symbols(&self, _resolution: Resolution) -> Result<Vec<String>, ReplayError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// October 2013; the 7th is a Monday.
pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2013, 10, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, time: NaiveDateTime, close: f64, volume: i64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        time,
        open: close - 0.25,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
    }
}

/// Hourly bars from 10:00 to 16:00 on each of `days` consecutive days
/// starting at `first_day` of October 2013. Closes rise by 0.5 per bar.
pub fn market_hours_bars(symbol: &str, first_day: u32, days: u32) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut i = 0;
    for d in 0..days {
        let day = at(first_day, 0) + Duration::days(d as i64);
        for hour in 10..=16 {
            let close = 100.0 + i as f64 * 0.5;
            let volume = 1000 + (i % 5) * 100;
            bars.push(make_bar(symbol, day + Duration::hours(hour), close, volume));
            i += 1;
        }
    }
    bars
}

/// Monday 7th to Friday 11th, hourly, warm-up on.
pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start: at(7, 0),
        end: at(11, 0),
        initial_capital: 100_000.0,
        resolution: Resolution::Hour,
        warmup: true,
        risk_free_rate: 0.0,
        execution: ExecutionConfig::default(),
    }
}

/// SPY bars: Friday 4th as history, then the 7th through the 10th.
pub fn spy_port() -> MockDataPort {
    let mut bars = market_hours_bars("SPY", 4, 1);
    bars.extend(market_hours_bars("SPY", 7, 4).into_iter().map(|mut b| {
        b.close += 10.0;
        b.open += 10.0;
        b.high += 10.0;
        b.low += 10.0;
        b
    }));
    MockDataPort::new().with_bars("SPY", bars)
}
