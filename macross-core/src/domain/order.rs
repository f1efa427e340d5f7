//! Order types and the order lifecycle state machine.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Sign of the quantity delta this side applies to a position.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// What kind of order: a closed set of variants, not a class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fills at the next bar's open.
    Market,
    /// Stays dormant until price crosses the stop level, then fills at the
    /// stop price (or the bar's open when the bar gaps through it).
    Stop { stop_price: f64 },
}

impl OrderKind {
    pub fn is_stop(self) -> bool {
        matches!(self, OrderKind::Stop { .. })
    }
}

/// Order lifecycle states.
///
/// `Created → Submitted → {Accepted → {Completed | Canceled | Expired | Margin}
/// | Rejected}`. Transitions are monotonic: once an order leaves a state it
/// never returns, and terminal states admit no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Submitted,
    Accepted,
    Completed,
    Canceled,
    Expired,
    /// Fill was attempted but the account lacked the cash for the notional.
    Margin,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Canceled
                | OrderStatus::Expired
                | OrderStatus::Margin
                | OrderStatus::Rejected
        )
    }

    /// Whether `next` is a legal successor of `self`.
    fn allows(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Submitted)
                | (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Accepted, Completed)
                | (Accepted, Canceled)
                | (Accepted, Expired)
                | (Accepted, Margin)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Created => "created",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Expired => "expired",
            OrderStatus::Margin => "margin",
            OrderStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("invalid transition for order {0}: {1} → {2}")]
    InvalidTransition(OrderId, OrderStatus, OrderStatus),

    #[error("order {0} not found")]
    NotFound(OrderId),
}

/// A single order in the broker's order table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub quantity: f64,
    pub status: OrderStatus,
    /// Parent entry order for bracket children. A back-reference for
    /// cancellation lookup only, never an ownership relationship.
    pub parent_id: Option<OrderId>,
    /// Bar index when the order was created.
    pub created_bar: usize,
    /// Bar index when the order reached a terminal state.
    pub closed_bar: Option<usize>,
}

impl Order {
    pub fn new(
        id: OrderId,
        symbol: String,
        side: OrderSide,
        kind: OrderKind,
        quantity: f64,
        created_bar: usize,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            kind,
            quantity,
            status: OrderStatus::Created,
            parent_id: None,
            created_bar,
            closed_bar: None,
        }
    }

    /// Advance the lifecycle state machine. Illegal transitions (including any
    /// attempt to leave a terminal state) are typed errors, never silent.
    pub fn transition(&mut self, next: OrderStatus, bar: usize) -> Result<(), OrderError> {
        if !self.status.allows(next) {
            return Err(OrderError::InvalidTransition(self.id, self.status, next));
        }
        self.status = next;
        if next.is_terminal() {
            self.closed_bar = Some(bar);
        }
        Ok(())
    }

    /// Eligible for fill attempts or cancellation.
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Accepted
    }
}
