//! Order simulation: validation, sizing, pricing, fills and order events.
//!
//! Every order passes through `Submitted` and ends in exactly one terminal
//! status. Each transition emits one [`OrderEvent`]; events collect in an
//! outbox the dispatcher drains and delivers to the strategy, and in a log
//! returned with the backtest result.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::bar::Bar;
use super::error::OrderRejection;
use super::order::{Fill, Order, OrderEvent, OrderId, OrderKind, OrderRequest, OrderStatus};
use super::portfolio::Portfolio;

/// Which price an accepted order fills at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Close of the bar active when the order is submitted.
    #[default]
    SameBarClose,
    /// Open of the next bar delivered for the instrument.
    NextBarOpen,
}

impl FillPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPolicy::SameBarClose => "same_bar_close",
            FillPolicy::NextBarOpen => "next_bar_open",
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "same_bar_close" | "close" => Ok(FillPolicy::SameBarClose),
            "next_bar_open" | "open" => Ok(FillPolicy::NextBarOpen),
            other => Err(format!(
                "unknown fill policy '{other}' (expected same_bar_close or next_bar_open)"
            )),
        }
    }
}

/// Configuration for backtest execution parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub fill_policy: FillPolicy,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    /// Gross exposure allowed as a multiple of portfolio value.
    pub leverage: f64,
    pub allow_shorting: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            fill_policy: FillPolicy::SameBarClose,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            leverage: 1.0,
            allow_shorting: false,
        }
    }
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Buy: market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Sell: market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Slippage applied against the side of a signed quantity.
pub fn execution_price(market_price: f64, quantity: f64, slippage_pct: f64) -> f64 {
    if quantity >= 0.0 {
        apply_slippage_buy(market_price, slippage_pct)
    } else {
        apply_slippage_sell(market_price, slippage_pct)
    }
}

/// Whole-share quantity that moves `current_quantity` toward `weight` of
/// `portfolio_value`, net of commission. Truncates toward zero.
pub fn target_weight_quantity(
    weight: f64,
    portfolio_value: f64,
    current_quantity: f64,
    market_price: f64,
    config: &ExecutionConfig,
) -> f64 {
    let current_value = current_quantity * market_price;
    let gap = weight * portfolio_value - current_value;
    if gap == 0.0 || market_price <= 0.0 {
        return 0.0;
    }
    let price = execution_price(market_price, gap, config.slippage_pct);
    let numerator = gap - config.commission_per_trade;
    let quantity = (numerator / (price * (1.0 + config.commission_pct / 100.0))).trunc();
    // The flat fee must not flip the side of the trade.
    if quantity.signum() != gap.signum() {
        0.0
    } else {
        quantity
    }
}

pub struct OrderSimulator {
    config: ExecutionConfig,
    subscribed: BTreeSet<String>,
    next_id: u64,
    orders: Vec<Order>,
    pending: Vec<usize>,
    fills: Vec<Fill>,
    outbox: Vec<OrderEvent>,
    log: Vec<OrderEvent>,
}

impl OrderSimulator {
    pub fn new<I, S>(config: ExecutionConfig, subscribed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            config,
            subscribed: subscribed
                .into_iter()
                .map(|s| s.as_ref().to_uppercase())
                .collect(),
            next_id: 1,
            orders: Vec::new(),
            pending: Vec::new(),
            fills: Vec::new(),
            outbox: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.subscribed.contains(symbol)
    }

    /// Validate, size and route one request.
    ///
    /// `latest` holds the most recent bar per instrument. Returns the order
    /// in its status after routing, or `None` when a target-weight request
    /// resolves to no change.
    pub fn submit(
        &mut self,
        request: &OrderRequest,
        time: NaiveDateTime,
        latest: &BTreeMap<String, Bar>,
        portfolio: &mut Portfolio,
    ) -> Option<Order> {
        if let Err(rejection) = self.validate_request(request, latest) {
            let idx = self.create(request, time);
            self.reject(idx, time, rejection);
            return Some(self.orders[idx].clone());
        }

        let quantity = match request.kind {
            OrderKind::Quantity(q) => q,
            OrderKind::TargetWeight(weight) => {
                // validate_request guarantees a bar for target-weight requests
                let reference = latest.get(&request.symbol).map(|b| b.close)?;
                let q = target_weight_quantity(
                    weight,
                    portfolio.total_value(),
                    portfolio.quantity(&request.symbol),
                    reference,
                    &self.config,
                );
                if q == 0.0 {
                    debug!(
                        symbol = %request.symbol,
                        weight,
                        "target weight already met; no order"
                    );
                    return None;
                }
                q
            }
        };

        let idx = self.create(request, time);
        self.orders[idx].quantity = quantity;

        if let Err(rejection) = self.check_shorting(&request.symbol, quantity, portfolio) {
            self.reject(idx, time, rejection);
            return Some(self.orders[idx].clone());
        }

        match self.config.fill_policy {
            FillPolicy::SameBarClose => {
                if let Some(bar) = latest.get(&request.symbol) {
                    self.execute(idx, bar.close, time, portfolio);
                }
            }
            FillPolicy::NextBarOpen => {
                debug!(order = %self.orders[idx].id, symbol = %request.symbol, "order pending next bar open");
                self.pending.push(idx);
            }
        }
        Some(self.orders[idx].clone())
    }

    /// Fill pending orders at the open of the first bar each instrument
    /// received this tick. Orders on instruments without a new bar stay
    /// pending.
    pub fn fill_pending(
        &mut self,
        opens: &BTreeMap<String, Bar>,
        time: NaiveDateTime,
        portfolio: &mut Portfolio,
    ) {
        let pending = std::mem::take(&mut self.pending);
        for idx in pending {
            let symbol = self.orders[idx].symbol.clone();
            let Some(bar) = opens.get(&symbol) else {
                self.pending.push(idx);
                continue;
            };
            let quantity = self.orders[idx].quantity;
            match self.check_shorting(&symbol, quantity, portfolio) {
                Ok(()) => self.execute(idx, bar.open, time, portfolio),
                Err(rejection) => self.reject(idx, time, rejection),
            }
        }
    }

    /// Cancel every order still open.
    pub fn cancel_open(&mut self, time: NaiveDateTime) {
        for idx in std::mem::take(&mut self.pending) {
            if self.orders[idx].transition(OrderStatus::Canceled).is_ok() {
                debug!(order = %self.orders[idx].id, symbol = %self.orders[idx].symbol, "order canceled at end of run");
                let event = OrderEvent::canceled(&self.orders[idx], time);
                self.emit(event);
            }
        }
    }

    /// Events not yet delivered, in emission order.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn events(&self) -> &[OrderEvent] {
        &self.log
    }

    /// Orders, fills and the full event log.
    pub fn into_logs(self) -> (Vec<Order>, Vec<Fill>, Vec<OrderEvent>) {
        (self.orders, self.fills, self.log)
    }

    fn validate_request(
        &self,
        request: &OrderRequest,
        latest: &BTreeMap<String, Bar>,
    ) -> Result<(), OrderRejection> {
        let invalid = |reason: String| Err(OrderRejection::InvalidOrder { reason });

        if !self.is_subscribed(&request.symbol) {
            return invalid(format!("{} is not subscribed", request.symbol));
        }
        let (amount, label) = match request.kind {
            OrderKind::Quantity(q) => (q, "quantity"),
            OrderKind::TargetWeight(w) => (w, "target weight"),
        };
        if !amount.is_finite() {
            return invalid(format!("{label} {amount} is not finite"));
        }
        if amount == 0.0 {
            return invalid(format!("{label} is zero"));
        }
        let needs_price = matches!(request.kind, OrderKind::TargetWeight(_))
            || self.config.fill_policy == FillPolicy::SameBarClose;
        if needs_price && !latest.contains_key(&request.symbol) {
            return invalid(format!("no bar yet for {}", request.symbol));
        }
        Ok(())
    }

    fn check_shorting(
        &self,
        symbol: &str,
        quantity: f64,
        portfolio: &Portfolio,
    ) -> Result<(), OrderRejection> {
        let held = portfolio.quantity(symbol);
        if !self.config.allow_shorting && held + quantity < 0.0 {
            return Err(OrderRejection::InvalidOrder {
                reason: format!("selling {} {symbol} exceeds held {held}", -quantity),
            });
        }
        Ok(())
    }

    /// Margin check, then book the fill.
    fn execute(
        &mut self,
        idx: usize,
        market_price: f64,
        time: NaiveDateTime,
        portfolio: &mut Portfolio,
    ) {
        let (order_id, symbol, quantity) = {
            let order = &self.orders[idx];
            (order.id, order.symbol.clone(), order.quantity)
        };
        let price = execution_price(market_price, quantity, self.config.slippage_pct);
        let commission = calculate_commission(quantity.abs() * price, &self.config);

        let (held_value, held_quantity) = portfolio
            .get_position(&symbol)
            .map(|p| (p.market_value(), p.quantity))
            .unwrap_or((0.0, 0.0));
        let new_value = (held_quantity + quantity) * price;
        let gross_after = portfolio.gross_exposure() - held_value.abs() + new_value.abs();
        let value_after = portfolio.cash - (quantity * price + commission)
            + (portfolio.positions_value() - held_value)
            + new_value;
        let available = self.config.leverage * value_after;
        if gross_after - available > 1e-9 {
            self.reject(
                idx,
                time,
                OrderRejection::MarginExceeded {
                    required: gross_after,
                    available,
                },
            );
            return;
        }

        let fill = Fill {
            order_id,
            symbol,
            time,
            quantity,
            price,
            commission,
        };
        portfolio.apply_fill(&fill);

        let order = &mut self.orders[idx];
        if order.transition(OrderStatus::Filled).is_ok() {
            debug!(
                order = %order.id,
                symbol = %order.symbol,
                quantity,
                price,
                commission,
                "order filled"
            );
            let event = OrderEvent::filled(order, fill.clone());
            self.fills.push(fill);
            self.emit(event);
        }
    }

    fn create(&mut self, request: &OrderRequest, time: NaiveDateTime) -> usize {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        let order = Order::new(id, request, time);
        debug!(order = %id, symbol = %order.symbol, kind = ?order.kind, "order submitted");
        let event = OrderEvent::submitted(&order, time);
        self.orders.push(order);
        self.emit(event);
        self.orders.len() - 1
    }

    fn reject(&mut self, idx: usize, time: NaiveDateTime, rejection: OrderRejection) {
        let order = &mut self.orders[idx];
        if order.transition(OrderStatus::Rejected).is_ok() {
            debug!(order = %order.id, symbol = %order.symbol, reason = %rejection, "order rejected");
            let event = OrderEvent::rejected(order, time, rejection);
            self.emit(event);
        }
    }

    fn emit(&mut self, event: OrderEvent) {
        self.log.push(event.clone());
        self.outbox.push(event);
    }
}
