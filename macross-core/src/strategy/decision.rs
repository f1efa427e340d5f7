//! Per-instrument decision engine.
//!
//! A state machine over Flat/Long/Short, mirroring the broker's position sign
//! (the sign is read fresh from the snapshot each bar rather than duplicated
//! here). Signals are evaluated on the bar close; the orders they request
//! fill at the next bar's open, so a decision can never see the price it
//! executes at.

use super::{StrategyError, StrategyParams};
use crate::alloc::CapitalAllocator;
use crate::broker::OrderRequest;
use crate::domain::{Bar, OrderSide, Symbol};
use crate::indicators::{Atr, CrossDetector, Ema, Rsi};

/// RSI bands gating entries: no fresh longs into an overbought market, no
/// fresh shorts into an oversold one.
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

/// What the decision engine asks of the execution engine. It never mutates
/// broker state itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Submit(OrderRequest),
    CancelProtectiveStops { symbol: Symbol },
}

/// Broker snapshot handed to the decision engine each bar.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Signed position quantity for this instrument (zero = flat).
    pub position_quantity: f64,
    /// Portfolio equity at the current closes.
    pub equity: f64,
    /// An entry order is already working for this instrument; a second
    /// concurrent entry is not allowed.
    pub entry_blocked: bool,
    pub allocator: &'a CapitalAllocator,
}

/// One instrument's indicator state plus entry/exit rules.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    symbol: Symbol,
    params: StrategyParams,
    short_ema: Ema,
    long_ema: Ema,
    atr: Atr,
    rsi: Rsi,
    cross: CrossDetector,
}

impl DecisionEngine {
    pub fn new(symbol: Symbol, params: StrategyParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            symbol,
            params,
            short_ema: Ema::new(params.short_period),
            long_ema: Ema::new(params.long_period),
            atr: Atr::new(params.atr_period),
            rsi: Rsi::new(params.rsi_period),
            cross: CrossDetector::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Update indicators with the bar and translate signals into order
    /// requests. Called exactly once per bar of this instrument.
    pub fn on_bar(&mut self, bar: &Bar, ctx: &DecisionContext<'_>) -> Vec<Action> {
        let short = self.short_ema.update(bar.close);
        let long = self.long_ema.update(bar.close);
        let atr = self.atr.update(bar);
        let rsi = self.rsi.update(bar.close);

        let cross = match (short, long) {
            (Some(s), Some(l)) => self.cross.update(s, l),
            _ => return Vec::new(),
        };
        if !cross.up && !cross.down {
            return Vec::new();
        }

        let pos = ctx.position_quantity;
        let mut actions = Vec::new();

        // Exit: an opposite-direction cross closes the position fully and
        // retires its protective stop.
        let long_exit = cross.down && pos > 0.0;
        let short_exit = cross.up && pos < 0.0;
        if long_exit || short_exit {
            actions.push(Action::CancelProtectiveStops {
                symbol: self.symbol.clone(),
            });
            let side = if long_exit {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            actions.push(Action::Submit(OrderRequest::market(
                self.symbol.clone(),
                side,
                pos.abs(),
            )));
        }

        // Entry: same-direction cross while flat or opposite, gated by RSI,
        // sized by inverse volatility, with a protective stop attached.
        // Entries wait for the full indicator warmup.
        let (atr, rsi) = match (atr, rsi) {
            (Some(a), Some(r)) => (a, r),
            _ => return actions,
        };
        let long_entry = cross.up && pos <= 0.0 && rsi < RSI_OVERBOUGHT;
        let short_entry = cross.down && pos >= 0.0 && rsi > RSI_OVERSOLD;
        if (long_entry || short_entry) && !ctx.entry_blocked {
            let fraction = ctx.allocator.target_fraction(
                self.params.risk_pct,
                self.params.stop_multiplier,
                atr,
                bar.close,
            );
            let quantity = fraction * ctx.equity / bar.close;
            if quantity > 0.0 {
                let stop_offset = self.params.stop_multiplier * atr;
                let (side, stop_price) = if long_entry {
                    (OrderSide::Buy, bar.close - stop_offset)
                } else {
                    (OrderSide::Sell, bar.close + stop_offset)
                };
                actions.push(Action::Submit(OrderRequest::market_with_stop(
                    self.symbol.clone(),
                    side,
                    quantity,
                    stop_price,
                )));
            }
        }

        actions
    }
}
