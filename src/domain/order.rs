//! Orders, order lifecycle and order-status events.

use chrono::NaiveDateTime;
use std::fmt;

use super::error::OrderRejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the strategy asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    /// Signed share quantity; positive buys, negative sells.
    Quantity(f64),
    /// Target fraction of total portfolio value held in the instrument.
    TargetWeight(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub kind: OrderKind,
}

impl OrderRequest {
    pub fn quantity(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            kind: OrderKind::Quantity(quantity),
        }
    }

    pub fn target_weight(symbol: impl Into<String>, weight: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            kind: OrderKind::TargetWeight(weight),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Submitted,
    Filled,
    Rejected,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Submitted)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Filled => "filled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("order {id}: illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub kind: OrderKind,
    /// Signed share quantity after resolving the request; 0 until resolved.
    pub quantity: f64,
    pub created_at: NaiveDateTime,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(id: OrderId, request: &OrderRequest, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            symbol: request.symbol.clone(),
            kind: request.kind,
            quantity: match request.kind {
                OrderKind::Quantity(q) => q,
                OrderKind::TargetWeight(_) => 0.0,
            },
            created_at,
            status: OrderStatus::Submitted,
        }
    }

    /// Move to `to`. Only `Submitted` may transition, and only to a terminal
    /// status.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), TransitionError> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(TransitionError {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Submitted
    }
}

/// An executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: String,
    pub time: NaiveDateTime,
    /// Signed share quantity.
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
}

impl Fill {
    /// Cash leaving the account: quantity × price + commission.
    pub fn cash_outflow(&self) -> f64 {
        self.quantity * self.price + self.commission
    }
}

/// One order status transition, delivered to the strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub time: NaiveDateTime,
    pub status: OrderStatus,
    pub fill: Option<Fill>,
    pub rejection: Option<OrderRejection>,
}

impl OrderEvent {
    pub fn submitted(order: &Order, time: NaiveDateTime) -> Self {
        Self::bare(order, time, OrderStatus::Submitted)
    }

    pub fn filled(order: &Order, fill: Fill) -> Self {
        Self {
            time: fill.time,
            fill: Some(fill),
            ..Self::bare(order, order.created_at, OrderStatus::Filled)
        }
    }

    pub fn rejected(order: &Order, time: NaiveDateTime, rejection: OrderRejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::bare(order, time, OrderStatus::Rejected)
        }
    }

    pub fn canceled(order: &Order, time: NaiveDateTime) -> Self {
        Self::bare(order, time, OrderStatus::Canceled)
    }

    fn bare(order: &Order, time: NaiveDateTime, status: OrderStatus) -> Self {
        Self {
            order_id: order.id,
            symbol: order.symbol.clone(),
            time,
            status,
            fill: None,
            rejection: None,
        }
    }
}
