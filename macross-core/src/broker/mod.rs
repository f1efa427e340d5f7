//! Broker: order table, fill simulation, and the accounting identity.
//!
//! The broker is the single owner of cash and positions. Every other
//! component requests actions through it and reads snapshots back; nothing
//! else mutates account state. Orders live in an id-keyed table (BTreeMap, so
//! iteration follows submission order and stays deterministic), and bracket
//! children reference their entry by parent id through that table.

mod cost;

pub use cost::CostModel;

use crate::domain::{
    Bar, Fill, Order, OrderError, OrderId, OrderKind, OrderSide, OrderStatus, Position, Symbol,
    TradeDirection, TradeRecord,
};
use std::collections::BTreeMap;

/// An order request from the decision engine. `protective_stop` attaches a
/// bracket stop on the opposite side of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: f64,
    pub kind: OrderKind,
    pub protective_stop: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: Symbol, side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol,
            side,
            quantity,
            kind: OrderKind::Market,
            protective_stop: None,
        }
    }

    pub fn market_with_stop(symbol: Symbol, side: OrderSide, quantity: f64, stop: f64) -> Self {
        Self {
            symbol,
            side,
            quantity,
            kind: OrderKind::Market,
            protective_stop: Some(stop),
        }
    }
}

/// Per-fill outcome reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    Filled { order_id: OrderId, fill: Fill },
    /// Entry could not be funded; order moved to Margin, account untouched.
    MarginRejected { order_id: OrderId },
}

/// Open round trip being accumulated from fills.
#[derive(Debug, Clone)]
struct OpenLot {
    direction: TradeDirection,
    quantity: f64,
    entered_quantity: f64,
    avg_entry: f64,
    entry_time: chrono::DateTime<chrono::Utc>,
    commission: f64,
    realized: f64,
    last_exit_price: f64,
}

/// Broker state: cash, positions, the order table, and run history.
#[derive(Debug, Clone)]
pub struct Broker {
    cash: f64,
    cost: CostModel,
    positions: BTreeMap<Symbol, Position>,
    orders: BTreeMap<OrderId, Order>,
    next_order_id: u64,
    fills: Vec<Fill>,
    trades: Vec<TradeRecord>,
    open_lots: BTreeMap<Symbol, OpenLot>,
    equity_curve: Vec<f64>,
}

impl Broker {
    pub fn new(initial_cash: f64, cost: CostModel) -> Self {
        Self {
            cash: initial_cash,
            cost,
            positions: BTreeMap::new(),
            orders: BTreeMap::new(),
            next_order_id: 1,
            fills: Vec::new(),
            trades: Vec::new(),
            open_lots: BTreeMap::new(),
            equity_curve: vec![initial_cash],
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| !p.is_flat())
    }

    /// Signed position quantity, zero when flat.
    pub fn position_quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    /// Equity = cash + sum of position market values at the given prices.
    pub fn equity(&self, prices: &BTreeMap<Symbol, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.avg_entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Record an equity point after the bar's fills are done.
    pub fn mark_to_market(&mut self, prices: &BTreeMap<Symbol, f64>) {
        let equity = self.equity(prices);
        self.equity_curve.push(equity);
    }

    /// Whether an entry (non-child market order) is still working for the
    /// symbol. The allocator uses this to block duplicate concurrent entries.
    pub fn has_active_entry(&self, symbol: &str) -> bool {
        self.orders.values().any(|o| {
            o.symbol == symbol && o.is_active() && !o.kind.is_stop() && o.parent_id.is_none()
        })
    }

    // ── Order lifecycle ─────────────────────────────────────────────

    /// Submit a request. The order runs Created → Submitted → Accepted; an
    /// attached protective stop becomes a child order on the opposite side.
    /// Returns the entry order's id.
    pub fn submit(&mut self, request: OrderRequest, bar_index: usize) -> Result<OrderId, OrderError> {
        let entry_id = self.insert_order(
            request.symbol.clone(),
            request.side,
            request.kind,
            request.quantity,
            None,
            bar_index,
        )?;

        if let Some(stop_price) = request.protective_stop {
            self.insert_order(
                request.symbol,
                request.side.opposite(),
                OrderKind::Stop { stop_price },
                request.quantity,
                Some(entry_id),
                bar_index,
            )?;
        }

        Ok(entry_id)
    }

    fn insert_order(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        kind: OrderKind,
        quantity: f64,
        parent_id: Option<OrderId>,
        bar_index: usize,
    ) -> Result<OrderId, OrderError> {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;

        let mut order = Order::new(id, symbol, side, kind, quantity, bar_index);
        order.parent_id = parent_id;
        order.transition(OrderStatus::Submitted, bar_index)?;
        order.transition(OrderStatus::Accepted, bar_index)?;
        self.orders.insert(id, order);
        Ok(id)
    }

    /// Cancel an order. Canceling a Completed (or otherwise terminal) order
    /// is a no-op; canceling an Accepted order moves it to Canceled. Returns
    /// the order's status afterwards.
    pub fn cancel(&mut self, id: OrderId, bar_index: usize) -> Result<OrderStatus, OrderError> {
        let order = self.orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        if order.status.is_terminal() {
            return Ok(order.status);
        }
        order.transition(OrderStatus::Canceled, bar_index)?;
        Ok(order.status)
    }

    /// Cancel every working protective stop for a symbol.
    pub fn cancel_protective_stops(
        &mut self,
        symbol: &str,
        bar_index: usize,
    ) -> Result<(), OrderError> {
        let ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.symbol == symbol && o.is_active() && o.kind.is_stop())
            .map(|o| o.id)
            .collect();
        for id in ids {
            self.cancel(id, bar_index)?;
        }
        Ok(())
    }

    /// Cancel working protective stops whose parent entry has already left
    /// the book. A reversal submits exit + new entry + new stop together;
    /// when the exit fill passes through flat, the fresh entry's bracket
    /// must survive while the old position's stop is retired.
    fn cancel_stale_protective_stops(
        &mut self,
        symbol: &str,
        bar_index: usize,
    ) -> Result<(), OrderError> {
        let ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.symbol == symbol && o.is_active() && o.kind.is_stop())
            .filter(|o| match o.parent_id.and_then(|p| self.orders.get(&p)) {
                Some(parent) => !parent.is_active(),
                None => true,
            })
            .map(|o| o.id)
            .collect();
        for id in ids {
            self.cancel(id, bar_index)?;
        }
        Ok(())
    }

    /// Cancel all working children of a parent order (bracket bookkeeping).
    fn cancel_children(&mut self, parent: OrderId, bar_index: usize) -> Result<(), OrderError> {
        let ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.parent_id == Some(parent) && o.is_active())
            .map(|o| o.id)
            .collect();
        for id in ids {
            self.cancel(id, bar_index)?;
        }
        Ok(())
    }

    // ── Fill simulation ─────────────────────────────────────────────

    /// Fill working market orders for this symbol at the bar's open. Orders
    /// created on an earlier bar are eligible; orders submitted on this bar's
    /// close wait for the next open.
    pub fn fill_market_orders(
        &mut self,
        bar: &Bar,
        bar_index: usize,
    ) -> Result<Vec<ExecutionEvent>, OrderError> {
        let ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| {
                o.symbol == bar.symbol
                    && o.is_active()
                    && !o.kind.is_stop()
                    && o.created_bar < bar_index
            })
            .map(|o| o.id)
            .collect();

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            events.push(self.execute(id, bar.open, bar, bar_index)?);
        }
        Ok(events)
    }

    /// Trigger working stop orders against the bar's range. A triggered stop
    /// fills at its stop price, or at the open when the bar gapped through
    /// the level, slippage on top. A stop whose position is already flat is
    /// canceled instead of filled.
    pub fn trigger_stops(
        &mut self,
        bar: &Bar,
        bar_index: usize,
    ) -> Result<Vec<ExecutionEvent>, OrderError> {
        let candidates: Vec<(OrderId, OrderSide, f64)> = self
            .orders
            .values()
            .filter(|o| {
                o.symbol == bar.symbol && o.is_active() && o.kind.is_stop() && o.created_bar < bar_index
            })
            .filter_map(|o| match o.kind {
                OrderKind::Stop { stop_price } => Some((o.id, o.side, stop_price)),
                OrderKind::Market => None,
            })
            .collect();

        let mut events = Vec::new();
        for (id, side, stop_price) in candidates {
            let triggered = match side {
                OrderSide::Sell => bar.low <= stop_price,
                OrderSide::Buy => bar.high >= stop_price,
            };
            if !triggered {
                continue;
            }

            if self.position_quantity(&bar.symbol) == 0.0 {
                // Protective stop with nothing left to protect.
                self.cancel(id, bar_index)?;
                continue;
            }

            // Gap handling: when the open is already through the level the
            // stop fills at the open (worse than the stop price).
            let raw_price = match side {
                OrderSide::Sell => {
                    if bar.open < stop_price {
                        bar.open
                    } else {
                        stop_price
                    }
                }
                OrderSide::Buy => {
                    if bar.open > stop_price {
                        bar.open
                    } else {
                        stop_price
                    }
                }
            };
            events.push(self.execute(id, raw_price, bar, bar_index)?);
        }
        Ok(events)
    }

    /// Execute one order at a raw price: apply slippage and commission, check
    /// margin on exposure-increasing fills, mutate cash/position, extract
    /// trades, and enforce the bracket invariant.
    fn execute(
        &mut self,
        id: OrderId,
        raw_price: f64,
        bar: &Bar,
        bar_index: usize,
    ) -> Result<ExecutionEvent, OrderError> {
        let (symbol, side, quantity) = {
            let order = self.orders.get(&id).ok_or(OrderError::NotFound(id))?;
            (order.symbol.clone(), order.side, order.quantity)
        };

        let price = self.cost.execution_price(side, raw_price);
        let commission = self.cost.commission(quantity, price);
        let signed_quantity = side.sign() * quantity;
        let position_before = self.position_quantity(&symbol);
        let increases_exposure = position_before * signed_quantity >= 0.0;

        // Margin check only applies when the fill adds exposure; reducing
        // fills always execute.
        if increases_exposure && quantity * price + commission > self.cash {
            let order = self.orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
            order.transition(OrderStatus::Margin, bar_index)?;
            self.cancel_children(id, bar_index)?;
            return Ok(ExecutionEvent::MarginRejected { order_id: id });
        }

        self.cash -= signed_quantity * price;
        self.cash -= commission;
        self.apply_to_position(&symbol, signed_quantity, price);
        self.record_trade_progress(&symbol, signed_quantity, price, commission, bar.timestamp);

        let order = self.orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        order.transition(OrderStatus::Completed, bar_index)?;

        let fill = Fill {
            order_id: id,
            symbol: symbol.clone(),
            side,
            quantity,
            price,
            commission,
            timestamp: bar.timestamp,
            bar_index,
        };
        self.fills.push(fill.clone());

        // Bracket invariant: a position back at flat leaves no stop behind
        // (stops bracketing a still-working entry are not stale yet).
        if self.position_quantity(&symbol) == 0.0 {
            self.cancel_stale_protective_stops(&symbol, bar_index)?;
        }

        Ok(ExecutionEvent::Filled { order_id: id, fill })
    }

    fn apply_to_position(&mut self, symbol: &str, signed_quantity: f64, price: f64) {
        let pos = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::flat(symbol.to_string()));

        let old_qty = pos.quantity;
        let new_qty = old_qty + signed_quantity;

        if old_qty == 0.0 || old_qty.signum() == signed_quantity.signum() {
            // Opening or adding: weighted average entry.
            let total = old_qty.abs() + signed_quantity.abs();
            pos.avg_entry_price =
                (pos.avg_entry_price * old_qty.abs() + price * signed_quantity.abs()) / total;
        } else if new_qty != 0.0 && new_qty.signum() != old_qty.signum() {
            // Reversal: the remainder is a fresh position at the fill price.
            pos.avg_entry_price = price;
        } else if new_qty == 0.0 {
            pos.avg_entry_price = 0.0;
        }
        // Plain reduction keeps the average entry.

        pos.quantity = new_qty;
    }

    /// Accumulate round-trip trades from fills. A trade closes when the
    /// position returns to flat (or flips, which closes one trade and opens
    /// the next).
    fn record_trade_progress(
        &mut self,
        symbol: &str,
        signed_quantity: f64,
        price: f64,
        commission: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) {
        let mut remaining = signed_quantity;
        let mut remaining_commission = commission;
        let mut lot_closed = false;

        if let Some(lot) = self.open_lots.get_mut(symbol) {
            let lot_sign = match lot.direction {
                TradeDirection::Long => 1.0,
                TradeDirection::Short => -1.0,
            };
            if remaining.signum() == lot_sign {
                // Adding to the open lot.
                let add = remaining.abs();
                lot.avg_entry =
                    (lot.avg_entry * lot.quantity + price * add) / (lot.quantity + add);
                lot.quantity += add;
                lot.entered_quantity += add;
                lot.commission += remaining_commission;
                return;
            }

            // Reducing (possibly through zero).
            let closing = remaining.abs().min(lot.quantity);
            let closing_fraction = closing / remaining.abs();
            lot.realized += (price - lot.avg_entry) * closing * lot_sign;
            lot.commission += remaining_commission * closing_fraction;
            lot.quantity -= closing;
            lot.last_exit_price = price;
            remaining += closing * lot_sign;
            remaining_commission *= 1.0 - closing_fraction;
            lot_closed = lot.quantity == 0.0;
        }

        if lot_closed {
            if let Some(lot) = self.open_lots.remove(symbol) {
                self.trades.push(TradeRecord {
                    symbol: symbol.to_string(),
                    direction: lot.direction,
                    quantity: lot.entered_quantity,
                    entry_price: lot.avg_entry,
                    entry_time: lot.entry_time,
                    exit_price: lot.last_exit_price,
                    exit_time: timestamp,
                    commission: lot.commission,
                    net_pnl: lot.realized - lot.commission,
                });
            }
        }

        if remaining != 0.0 {
            // Opens a new lot (fresh entry, or the overshoot of a reversal).
            self.open_lots.insert(
                symbol.to_string(),
                OpenLot {
                    direction: if remaining > 0.0 {
                        TradeDirection::Long
                    } else {
                        TradeDirection::Short
                    },
                    quantity: remaining.abs(),
                    entered_quantity: remaining.abs(),
                    avg_entry: price,
                    entry_time: timestamp,
                    commission: remaining_commission,
                    realized: 0.0,
                    last_exit_price: price,
                },
            );
        }
    }
}
