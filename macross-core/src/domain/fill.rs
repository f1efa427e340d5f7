//! Fill — the record of an executed order.

use super::ids::OrderId;
use super::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single execution. `price` already includes slippage; `commission` is the
/// cash deducted on top of the notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub timestamp: DateTime<Utc>,
    pub bar_index: usize,
}

impl Fill {
    /// Traded notional at the execution price.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Signed quantity delta applied to the position.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fill_notional_and_sign() {
        let fill = Fill {
            order_id: OrderId(1),
            symbol: "BTC-USD".into(),
            side: OrderSide::Sell,
            quantity: 10.0,
            price: 100.0,
            commission: 0.5,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            bar_index: 3,
        };
        assert_eq!(fill.notional(), 1000.0);
        assert_eq!(fill.signed_quantity(), -10.0);
    }
}
