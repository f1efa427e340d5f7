//! Strategy layer: parameters and the per-instrument decision engine.

mod decision;

pub use decision::{Action, DecisionContext, DecisionEngine};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    /// Signals a "skip this run" condition; the sweep runner recovers from it
    /// instead of aborting.
    #[error("short period {short} must be strictly below long period {long}")]
    InvalidPeriods { short: usize, long: usize },
}

/// Parameters of the crossover strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub short_period: usize,
    pub long_period: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    /// Fraction of equity risked per unit stop distance.
    pub risk_pct: f64,
    /// Stop distance in ATR multiples.
    pub stop_multiplier: f64,
    /// Bound on the target fraction, shared across the portfolio.
    pub leverage_cap: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            short_period: 10,
            long_period: 20,
            atr_period: 14,
            rsi_period: 14,
            risk_pct: 0.02,
            stop_multiplier: 3.0,
            leverage_cap: 2.0,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.short_period >= self.long_period {
            return Err(StrategyError::InvalidPeriods {
                short: self.short_period,
                long: self.long_period,
            });
        }
        Ok(())
    }
}
