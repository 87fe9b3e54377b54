//! Indicator warm-up phase.
//!
//! Before the first nominal tick, history preceding the start date is replayed
//! through the indicator engine. Strategy callbacks and order processing do not
//! run during this phase. The phase ends with a [`WarmupReport`] which the
//! dispatcher consumes before it starts the clock.

use tracing::{info, warn};

use super::feed::BarFeed;
use super::indicator_engine::IndicatorEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupReport {
    /// Lookback requested per instrument.
    pub required_bars: usize,
    /// Bars replayed across all instruments.
    pub bars_fed: usize,
    /// Whether every registered indicator was ready when the phase ended.
    pub all_ready: bool,
}

impl WarmupReport {
    /// Report for a run with warm-up switched off.
    pub fn skipped(engine: &IndicatorEngine) -> Self {
        Self {
            required_bars: 0,
            bars_fed: 0,
            all_ready: engine.all_ready(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarmupController {
    enabled: bool,
}

impl WarmupController {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bars of history to request per instrument.
    pub fn required_bars(&self, engine: &IndicatorEngine) -> usize {
        if self.enabled {
            engine.max_period()
        } else {
            0
        }
    }

    /// Replay every feed's warm-up bars through `engine` in time order.
    ///
    /// Bars sharing a timestamp are applied in feed order.
    pub fn run(&self, feeds: &mut [BarFeed], engine: &mut IndicatorEngine) -> WarmupReport {
        if !self.enabled {
            for feed in feeds.iter_mut() {
                feed.take_warmup();
            }
            return WarmupReport::skipped(engine);
        }

        let required_bars = engine.max_period();
        let mut merged: Vec<(usize, _)> = feeds
            .iter_mut()
            .enumerate()
            .flat_map(|(i, feed)| feed.take_warmup().into_iter().map(move |b| (i, b)))
            .collect();
        merged.sort_by(|(ia, a), (ib, b)| a.time.cmp(&b.time).then(ia.cmp(ib)));

        let bars_fed = merged.len();
        for (_, bar) in &merged {
            engine.update(bar);
        }

        let report = WarmupReport {
            required_bars,
            bars_fed,
            all_ready: engine.all_ready(),
        };

        if report.all_ready {
            info!(required = required_bars, fed = bars_fed, "warm-up complete");
        } else {
            let pending: Vec<String> = engine
                .handles()
                .filter(|h| !engine.is_ready(h))
                .map(|h| h.to_string())
                .collect();
            warn!(
                required = required_bars,
                fed = bars_fed,
                pending = ?pending,
                "warm-up finished with indicators not ready"
            );
        }
        report
    }
}
