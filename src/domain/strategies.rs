//! Built-in strategies.

use tracing::{debug, info};

use super::error::ReplayError;
use super::indicator::IndicatorType;
use super::indicator_engine::IndicatorHandle;
use super::order::{OrderEvent, OrderStatus};
use super::strategy::{Setup, Strategy, TickContext};
use super::warmup::WarmupReport;

/// Holds `target_weight` of the portfolio in one symbol once its relative
/// volume indicator is ready.
#[derive(Debug)]
pub struct RelativeVolume {
    symbol: String,
    period: usize,
    target_weight: f64,
    rdv: Option<IndicatorHandle>,
}

impl RelativeVolume {
    pub fn new(symbol: &str, period: usize, target_weight: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            period,
            target_weight,
            rdv: None,
        }
    }
}

impl Strategy for RelativeVolume {
    fn name(&self) -> &str {
        "relative_volume"
    }

    fn initialize(&mut self, setup: &mut Setup<'_>) -> Result<(), ReplayError> {
        if self.period == 0 {
            return Err(ReplayError::Strategy {
                reason: "relative volume period must be at least 1".into(),
            });
        }
        let resolution = setup.resolution();
        setup.subscribe(&self.symbol, resolution);
        self.rdv = Some(setup.register(&self.symbol, IndicatorType::Rdv(self.period)));
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        let Some(handle) = &self.rdv else { return };
        if ctx.bar(&self.symbol).is_none() {
            return;
        }
        // not ready yet: skip the tick
        let Ok(value) = ctx.indicator(handle) else {
            return;
        };
        debug!(symbol = %self.symbol, time = %ctx.time(), rdv = value, "relative volume");
        ctx.set_holdings(&self.symbol, self.target_weight);
    }

    fn on_order_status(&mut self, event: &OrderEvent) {
        if event.status == OrderStatus::Filled {
            if let Some(fill) = &event.fill {
                info!(
                    order = %event.order_id,
                    symbol = %fill.symbol,
                    quantity = fill.quantity,
                    price = fill.price,
                    "filled"
                );
            }
        }
    }

    fn on_warmup_finished(&mut self, report: &WarmupReport) {
        debug!(ready = report.all_ready, bars = report.bars_fed, "relative volume warm-up done");
    }
}

/// Long while the fast SMA is above the slow SMA, flat otherwise.
#[derive(Debug)]
pub struct SmaCross {
    symbol: String,
    fast: usize,
    slow: usize,
    target_weight: f64,
    handles: Option<(IndicatorHandle, IndicatorHandle)>,
}

impl SmaCross {
    pub fn new(symbol: &str, fast: usize, slow: usize, target_weight: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            fast,
            slow,
            target_weight,
            handles: None,
        }
    }
}

impl Strategy for SmaCross {
    fn name(&self) -> &str {
        "sma_cross"
    }

    fn initialize(&mut self, setup: &mut Setup<'_>) -> Result<(), ReplayError> {
        if self.fast == 0 || self.fast >= self.slow {
            return Err(ReplayError::Strategy {
                reason: format!(
                    "fast period ({}) must be at least 1 and below slow period ({})",
                    self.fast, self.slow
                ),
            });
        }
        let resolution = setup.resolution();
        setup.subscribe(&self.symbol, resolution);
        let fast = setup.register(&self.symbol, IndicatorType::Sma(self.fast));
        let slow = setup.register(&self.symbol, IndicatorType::Sma(self.slow));
        self.handles = Some((fast, slow));
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        let Some((fast, slow)) = &self.handles else { return };
        if ctx.bar(&self.symbol).is_none() {
            return;
        }
        let (Ok(fast), Ok(slow)) = (ctx.indicator(fast), ctx.indicator(slow)) else {
            return;
        };
        let held = ctx.portfolio().quantity(&self.symbol);
        if fast > slow && held <= 0.0 {
            ctx.set_holdings(&self.symbol, self.target_weight);
        } else if fast < slow && held > 0.0 {
            ctx.liquidate(&self.symbol);
        }
    }
}
