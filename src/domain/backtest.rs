//! Backtest configuration and the run entry point.
//!
//! [`run_backtest`] wires the pieces together: strategy initialization,
//! feed subscription, warm-up, then the tick loop.

use chrono::NaiveDateTime;
use tracing::info;

use super::clock::Clock;
use super::dispatcher::{Dispatcher, RunOutcome};
use super::error::ReplayError;
use super::execution::{ExecutionConfig, OrderSimulator};
use super::feed::BarFeed;
use super::indicator_engine::IndicatorEngine;
use super::metrics::Metrics;
use super::order::{Fill, Order, OrderEvent};
use super::portfolio::Portfolio;
use super::resolution::{Resolution, Window};
use super::strategy::{Setup, Strategy};
use super::warmup::{WarmupController, WarmupReport};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub initial_capital: f64,
    pub resolution: Resolution,
    pub warmup: bool,
    pub risk_free_rate: f64,
    pub execution: ExecutionConfig,
}

impl BacktestConfig {
    pub fn window(&self) -> Window {
        Window {
            start: self.start,
            end: self.end,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub portfolio: Portfolio,
    pub orders: Vec<Order>,
    pub fills: Vec<Fill>,
    pub events: Vec<OrderEvent>,
    pub ticks: usize,
    pub bars_delivered: usize,
    pub warmup: WarmupReport,
}

impl BacktestResult {
    pub fn metrics(&self, config: &BacktestConfig) -> Metrics {
        Metrics::compute(
            &self.portfolio,
            &self.events,
            config.window(),
            config.risk_free_rate,
        )
    }
}

/// Run `strategy` over `config`'s window with bars from `port`.
///
/// Fails before the first tick when the strategy refuses to initialize, the
/// provider errors, or a subscribed instrument has no bars in the window.
pub fn run_backtest(
    port: &dyn DataPort,
    strategy: &mut dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, ReplayError> {
    let config = config.clone();
    let window = config.window();
    if window.end <= window.start {
        return Err(ReplayError::ConfigInvalid {
            section: "backtest".into(),
            key: "end_date".into(),
            reason: "end must be after start".into(),
        });
    }

    let mut subscriptions = Vec::new();
    let mut engine = IndicatorEngine::new();
    {
        let mut setup = Setup::new(window, config.resolution, &mut subscriptions, &mut engine);
        strategy.initialize(&mut setup)?;
    }

    info!(
        strategy = strategy.name(),
        start = %config.start,
        end = %config.end,
        resolution = %config.resolution,
        instruments = subscriptions.len(),
        indicators = engine.len(),
        "starting backtest"
    );

    let controller = WarmupController::new(config.warmup);
    let lookback = controller.required_bars(&engine);

    let mut feeds = Vec::with_capacity(subscriptions.len());
    for instrument in &subscriptions {
        info!(symbol = %instrument.symbol, resolution = %instrument.resolution, "subscribed");
        feeds.push(BarFeed::open(port, instrument, window, lookback)?);
    }

    let warmup = controller.run(&mut feeds, &mut engine);

    let simulator = OrderSimulator::new(
        config.execution.clone(),
        subscriptions.iter().map(|i| i.symbol.as_str()),
    );
    let dispatcher = Dispatcher::new(
        Clock::new(config.start, config.end, config.resolution),
        feeds,
        engine,
        simulator,
        Portfolio::new(config.initial_capital),
    );

    let RunOutcome {
        portfolio,
        orders,
        fills,
        events,
        ticks,
        bars_delivered,
    } = dispatcher.run(strategy, &warmup);

    info!(
        ticks,
        bars = bars_delivered,
        orders = orders.len(),
        fills = fills.len(),
        final_value = portfolio.total_value(),
        "backtest finished"
    );

    Ok(BacktestResult {
        strategy: strategy.name().to_string(),
        portfolio,
        orders,
        fills,
        events,
        ticks,
        bars_delivered,
        warmup,
    })
}
