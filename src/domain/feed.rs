//! Per-instrument bar feed.
//!
//! A feed is opened once per run. Bars are handed out in ascending time order
//! and cannot be replayed; a new run needs a new feed.

use chrono::NaiveDateTime;
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::bar::Bar;
use super::error::ReplayError;
use super::resolution::{Instrument, Window};
use crate::ports::data_port::DataPort;

#[derive(Debug)]
pub struct BarFeed {
    instrument: Instrument,
    warmup: Vec<Bar>,
    bars: VecDeque<Bar>,
    delivered: usize,
}

impl BarFeed {
    /// Open a feed for `instrument` over `window`, plus up to `warmup_count`
    /// bars of history before `window.start`.
    ///
    /// Fails with [`ReplayError::DataGap`] when the provider has no bars at all
    /// inside the window, and with [`ReplayError::Data`] when it returns bars
    /// for another symbol. Bars are stamped with the instrument's symbol.
    pub fn open(
        port: &dyn DataPort,
        instrument: &Instrument,
        window: Window,
        warmup_count: usize,
    ) -> Result<Self, ReplayError> {
        let bars = port.fetch_bars(
            &instrument.symbol,
            instrument.resolution,
            window.start,
            window.end,
        )?;
        let bars: Vec<Bar> = stamp_symbol(instrument, bars)?
            .into_iter()
            .filter(|b| window.contains(b.time))
            .collect();
        if bars.is_empty() {
            return Err(ReplayError::DataGap {
                symbol: instrument.symbol.clone(),
                start: window.start,
                end: window.end,
            });
        }

        let warmup = if warmup_count > 0 {
            let history = port.fetch_history(
                &instrument.symbol,
                instrument.resolution,
                window.start,
                warmup_count,
            )?;
            let mut history: Vec<Bar> = stamp_symbol(instrument, history)?
                .into_iter()
                .filter(|b| b.time < window.start)
                .collect();
            history.sort_by_key(|b| b.time);
            if history.len() > warmup_count {
                history.drain(..history.len() - warmup_count);
            }
            if history.len() < warmup_count {
                warn!(
                    symbol = %instrument.symbol,
                    requested = warmup_count,
                    available = history.len(),
                    "insufficient history for warm-up"
                );
            }
            history
        } else {
            Vec::new()
        };

        debug!(
            symbol = %instrument.symbol,
            bars = bars.len(),
            warmup = warmup.len(),
            "opened bar feed"
        );

        Ok(Self::from_bars(instrument.clone(), warmup, bars))
    }

    /// Build a feed from bars already in memory. Bars are sorted stably by time.
    pub fn from_bars(instrument: Instrument, warmup: Vec<Bar>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.time);
        Self {
            instrument,
            warmup,
            bars: bars.into(),
            delivered: 0,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Hand over the warm-up bars. Subsequent calls return nothing.
    pub fn take_warmup(&mut self) -> Vec<Bar> {
        std::mem::take(&mut self.warmup)
    }

    pub fn warmup_len(&self) -> usize {
        self.warmup.len()
    }

    /// Every not-yet-delivered bar with `time <= now`, in time order.
    pub fn drain_until(&mut self, now: NaiveDateTime) -> Vec<Bar> {
        let mut out = Vec::new();
        while self.bars.front().is_some_and(|b| b.time <= now) {
            if let Some(bar) = self.bars.pop_front() {
                self.delivered += 1;
                out.push(bar);
            }
        }
        out
    }

    /// Time of the last undelivered bar before `end`.
    pub fn last_pending_before(&self, end: NaiveDateTime) -> Option<NaiveDateTime> {
        self.bars.iter().rev().map(|b| b.time).find(|t| *t < end)
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn is_exhausted(&self) -> bool {
        self.bars.is_empty()
    }
}

fn stamp_symbol(instrument: &Instrument, bars: Vec<Bar>) -> Result<Vec<Bar>, ReplayError> {
    bars.into_iter()
        .map(|mut bar| {
            if !bar.symbol.eq_ignore_ascii_case(&instrument.symbol) {
                return Err(ReplayError::Data {
                    reason: format!(
                        "provider returned a {} bar at {} for {}",
                        bar.symbol, bar.time, instrument.symbol
                    ),
                });
            }
            bar.symbol.clone_from(&instrument.symbol);
            Ok(bar)
        })
        .collect()
}
