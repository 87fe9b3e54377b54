//! Strategy trait and the contexts the engine hands to it.
//!
//! Subscriptions and indicators can only be registered through [`Setup`],
//! which exists only while [`Strategy::initialize`] runs. During the run the
//! strategy sees a [`TickContext`] per tick and receives every order event
//! through [`Strategy::on_order_status`].

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

use super::bar::Bar;
use super::error::ReplayError;
use super::indicator::IndicatorType;
use super::indicator_engine::{IndicatorEngine, IndicatorHandle};
use super::order::{OrderEvent, OrderRequest};
use super::portfolio::Portfolio;
use super::resolution::{Instrument, Resolution, Window};
use super::warmup::WarmupReport;

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Declare subscriptions and indicators. Returning an error aborts the
    /// run before any data is requested.
    fn initialize(&mut self, setup: &mut Setup<'_>) -> Result<(), ReplayError>;

    fn on_tick(&mut self, ctx: &mut TickContext<'_>);

    fn on_order_status(&mut self, _event: &OrderEvent) {}

    fn on_warmup_finished(&mut self, _report: &WarmupReport) {}
}

/// Registration surface available during initialization.
pub struct Setup<'a> {
    window: Window,
    resolution: Resolution,
    subscriptions: &'a mut Vec<Instrument>,
    engine: &'a mut IndicatorEngine,
}

impl<'a> Setup<'a> {
    pub fn new(
        window: Window,
        resolution: Resolution,
        subscriptions: &'a mut Vec<Instrument>,
        engine: &'a mut IndicatorEngine,
    ) -> Self {
        Self {
            window,
            resolution,
            subscriptions,
            engine,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Resolution the clock runs at.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Subscribe to `symbol`. A symbol can be subscribed once; repeating the
    /// call returns the existing subscription.
    pub fn subscribe(&mut self, symbol: &str, resolution: Resolution) -> Instrument {
        let instrument = Instrument::new(symbol, resolution);
        if let Some(existing) = self
            .subscriptions
            .iter()
            .find(|i| i.symbol == instrument.symbol)
        {
            return existing.clone();
        }
        self.subscriptions.push(instrument.clone());
        instrument
    }

    pub fn register(&mut self, symbol: &str, kind: IndicatorType) -> IndicatorHandle {
        self.engine.register(symbol, kind)
    }

    pub fn subscriptions(&self) -> &[Instrument] {
        self.subscriptions
    }
}

/// View of one tick handed to [`Strategy::on_tick`].
pub struct TickContext<'a> {
    time: NaiveDateTime,
    bars: &'a BTreeMap<String, Bar>,
    latest: &'a BTreeMap<String, Bar>,
    engine: &'a IndicatorEngine,
    portfolio: &'a Portfolio,
    requests: Vec<OrderRequest>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        time: NaiveDateTime,
        bars: &'a BTreeMap<String, Bar>,
        latest: &'a BTreeMap<String, Bar>,
        engine: &'a IndicatorEngine,
        portfolio: &'a Portfolio,
    ) -> Self {
        Self {
            time,
            bars,
            latest,
            engine,
            portfolio,
            requests: Vec::new(),
        }
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    /// Bar delivered for `symbol` on this tick.
    pub fn bar(&self, symbol: &str) -> Option<&Bar> {
        self.bars.get(symbol)
    }

    /// Every bar delivered on this tick, by symbol.
    pub fn bars(&self) -> &BTreeMap<String, Bar> {
        self.bars
    }

    /// Most recent bar seen for `symbol`, possibly from an earlier tick.
    pub fn last_bar(&self, symbol: &str) -> Option<&Bar> {
        self.latest.get(symbol)
    }

    pub fn is_ready(&self, handle: &IndicatorHandle) -> bool {
        self.engine.is_ready(handle)
    }

    pub fn indicator(&self, handle: &IndicatorHandle) -> Result<f64, ReplayError> {
        self.engine.current(handle)
    }

    pub fn portfolio(&self) -> &Portfolio {
        self.portfolio
    }

    /// Buy (positive) or sell (negative) `quantity` shares.
    pub fn market_order(&mut self, symbol: &str, quantity: f64) {
        self.requests.push(OrderRequest::quantity(symbol, quantity));
    }

    /// Trade toward holding `weight` of total portfolio value in `symbol`.
    pub fn set_holdings(&mut self, symbol: &str, weight: f64) {
        self.requests.push(OrderRequest::target_weight(symbol, weight));
    }

    /// Close the whole position in `symbol`, as held when the call is made.
    pub fn liquidate(&mut self, symbol: &str) {
        let symbol = symbol.to_uppercase();
        let held = self.portfolio.quantity(&symbol);
        if held == 0.0 {
            debug!(symbol = %symbol, "liquidate on flat position ignored");
            return;
        }
        self.requests.push(OrderRequest::quantity(symbol, -held));
    }

    pub fn requests(&self) -> &[OrderRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<OrderRequest> {
        self.requests
    }
}
