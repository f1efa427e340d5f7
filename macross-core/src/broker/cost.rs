//! Flat-rate execution costs: proportional slippage and commission.

use crate::domain::OrderSide;
use serde::{Deserialize, Serialize};

/// Flat-rate cost model. Slippage moves the execution price against the
/// taker; commission is charged on the executed notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    /// Raw price adjusted by slippage: buys pay up, sells receive less.
    pub fn execution_price(&self, side: OrderSide, raw_price: f64) -> f64 {
        raw_price * (1.0 + side.sign() * self.slippage_rate)
    }

    /// Commission on the executed notional.
    pub fn commission(&self, quantity: f64, price: f64) -> f64 {
        quantity.abs() * price * self.commission_rate
    }
}
