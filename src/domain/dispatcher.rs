//! Tick loop.
//!
//! The dispatcher owns everything a run mutates: the clock, the feeds, the
//! indicator engine, the order simulator and the ledger. One tick runs to
//! completion, order events included, before the clock advances.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::bar::Bar;
use super::clock::Clock;
use super::execution::OrderSimulator;
use super::feed::BarFeed;
use super::indicator_engine::IndicatorEngine;
use super::order::{Fill, Order, OrderEvent};
use super::portfolio::Portfolio;
use super::strategy::{Strategy, TickContext};
use super::warmup::WarmupReport;

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub portfolio: Portfolio,
    pub orders: Vec<Order>,
    pub fills: Vec<Fill>,
    pub events: Vec<OrderEvent>,
    pub ticks: usize,
    pub bars_delivered: usize,
}

pub struct Dispatcher {
    clock: Clock,
    feeds: Vec<BarFeed>,
    engine: IndicatorEngine,
    simulator: OrderSimulator,
    portfolio: Portfolio,
    latest: BTreeMap<String, Bar>,
    ticks: usize,
    bars_delivered: usize,
}

impl Dispatcher {
    pub fn new(
        clock: Clock,
        feeds: Vec<BarFeed>,
        engine: IndicatorEngine,
        simulator: OrderSimulator,
        portfolio: Portfolio,
    ) -> Self {
        Self {
            clock,
            feeds,
            engine,
            simulator,
            portfolio,
            latest: BTreeMap::new(),
            ticks: 0,
            bars_delivered: 0,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    pub fn simulator(&self) -> &OrderSimulator {
        &self.simulator
    }

    /// Drive the clock to the end, then cancel orders still open.
    ///
    /// Bars stamped after the last clock step but before the end of the
    /// window are delivered on one extra tick at the latest such bar's time.
    pub fn run(mut self, strategy: &mut dyn Strategy, warmup: &WarmupReport) -> RunOutcome {
        strategy.on_warmup_finished(warmup);

        while let Some(time) = self.clock.advance() {
            self.step(time, strategy);
        }

        let end = self.clock.end();
        let tail = self
            .feeds
            .iter()
            .filter_map(|feed| feed.last_pending_before(end))
            .max();
        if let Some(time) = tail {
            debug!(%time, "delivering bars after the last clock step");
            self.step(time, strategy);
        }

        let last_tick = tail.or(self.clock.now()).unwrap_or(end);
        self.simulator.cancel_open(last_tick);
        self.deliver(strategy);

        debug!(
            ticks = self.ticks,
            bars = self.bars_delivered,
            orders = self.simulator.orders().len(),
            "dispatch finished"
        );

        let (orders, fills, events) = self.simulator.into_logs();
        RunOutcome {
            portfolio: self.portfolio,
            orders,
            fills,
            events,
            ticks: self.ticks,
            bars_delivered: self.bars_delivered,
        }
    }

    /// Process one tick.
    pub fn step(&mut self, time: NaiveDateTime, strategy: &mut dyn Strategy) {
        let mut current: BTreeMap<String, Bar> = BTreeMap::new();
        let mut opens: BTreeMap<String, Bar> = BTreeMap::new();

        for feed in self.feeds.iter_mut() {
            for bar in feed.drain_until(time) {
                self.engine.update(&bar);
                self.bars_delivered += 1;
                opens
                    .entry(bar.symbol.clone())
                    .or_insert_with(|| bar.clone());
                self.latest.insert(bar.symbol.clone(), bar.clone());
                current.insert(bar.symbol.clone(), bar);
            }
        }
        let closes = self.closes();
        self.portfolio.mark_to_market(&closes);

        self.simulator.fill_pending(&opens, time, &mut self.portfolio);
        self.portfolio.mark_to_market(&closes);
        self.deliver(strategy);

        let requests = {
            let mut ctx = TickContext::new(
                time,
                &current,
                &self.latest,
                &self.engine,
                &self.portfolio,
            );
            strategy.on_tick(&mut ctx);
            ctx.into_requests()
        };

        for request in &requests {
            self.simulator.submit(request, time, &self.latest, &mut self.portfolio);
            self.portfolio.mark_to_market(&closes);
            self.deliver(strategy);
        }

        self.portfolio.record_equity(time);
        self.ticks += 1;
        trace!(%time, bars = current.len(), requests = requests.len(), "tick");
    }

    fn closes(&self) -> BTreeMap<String, f64> {
        self.latest
            .iter()
            .map(|(symbol, bar)| (symbol.clone(), bar.close))
            .collect()
    }

    fn deliver(&mut self, strategy: &mut dyn Strategy) {
        for event in self.simulator.drain_events() {
            strategy.on_order_status(&event);
        }
    }
}
