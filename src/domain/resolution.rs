//! Bar resolution and instrument subscriptions.

use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resolution {
    Minute,
    Hour,
    Daily,
}

impl Resolution {
    /// Length of one clock step.
    pub fn step(self) -> Duration {
        match self {
            Resolution::Minute => Duration::minutes(1),
            Resolution::Hour => Duration::hours(1),
            Resolution::Daily => Duration::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Minute => "minute",
            Resolution::Hour => "hour",
            Resolution::Daily => "daily",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "1m" => Ok(Resolution::Minute),
            "hour" | "hourly" | "1h" => Ok(Resolution::Hour),
            "daily" | "day" | "1d" => Ok(Resolution::Daily),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

/// A subscribed instrument. Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub symbol: String,
    pub resolution: Resolution,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            resolution,
        }
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }
}
