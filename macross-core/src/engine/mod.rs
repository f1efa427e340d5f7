//! Bar-driven event loop.
//!
//! One run is strictly sequential: for every timestamp, pending market
//! orders fill at the open, working stops trigger against the bar range,
//! decisions are made on the close, and only then does the clock advance.
//! That ordering is the no-look-ahead guarantee; nothing here relaxes it.
//!
//! Multiple instrument feeds are merged by timestamp. An instrument with no
//! bar at a given timestamp simply sits out that step (gaps propagate, no
//! interpolation), and its last close keeps valuing the position.

use crate::alloc::CapitalAllocator;
use crate::broker::{Broker, CostModel, ExecutionEvent};
use crate::domain::{Bar, Fill, OrderError, Symbol, TradeRecord};
use crate::feed::{BarFeed, FeedError};
use crate::strategy::{Action, DecisionContext, DecisionEngine, StrategyError, StrategyParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("engine requires at least one instrument feed")]
    NoInstruments,
}

/// Account-level settings for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 1_000_000.0,
            commission_rate: 0.0005,
            slippage_rate: 0.0001,
        }
    }
}

/// Everything a run leaves behind for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Equity after every processed timestamp; index 0 is the initial cash.
    pub equity_curve: Vec<f64>,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<Fill>,
    /// Entries that failed the cash check at fill time.
    pub margin_rejections: usize,
    pub bars_processed: usize,
}

/// One backtest pipeline: broker plus a decision engine per instrument.
pub struct Engine {
    config: EngineConfig,
    params: StrategyParams,
}

impl Engine {
    /// Parameters are validated here, so an invalid combination is caught
    /// before any data is consumed (the sweep runner skips such runs).
    pub fn new(config: EngineConfig, params: StrategyParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self { config, params })
    }

    /// Drive every feed to end-of-stream and return the run history.
    pub fn run(
        &self,
        feeds: Vec<(Symbol, Box<dyn BarFeed>)>,
    ) -> Result<RunResult, EngineError> {
        if feeds.is_empty() {
            return Err(EngineError::NoInstruments);
        }

        let allocator = CapitalAllocator::new(self.params.leverage_cap, feeds.len());
        let mut broker = Broker::new(
            self.config.initial_cash,
            CostModel::new(self.config.commission_rate, self.config.slippage_rate),
        );

        let mut decisions = Vec::with_capacity(feeds.len());
        let mut streams = Vec::with_capacity(feeds.len());
        for (symbol, feed) in feeds {
            decisions.push(DecisionEngine::new(symbol, self.params)?);
            streams.push(feed);
        }

        // Prime one lookahead slot per stream for the timestamp merge.
        let mut pending: Vec<Option<Bar>> = Vec::with_capacity(streams.len());
        for stream in &mut streams {
            pending.push(stream.next_bar()?);
        }

        let mut last_close: BTreeMap<Symbol, f64> = BTreeMap::new();
        let mut margin_rejections = 0usize;
        let mut bars_processed = 0usize;
        let mut bar_index = 0usize;

        loop {
            let timestamp = match pending.iter().flatten().map(|b| b.timestamp).min() {
                Some(ts) => ts,
                None => break,
            };

            let mut group: Vec<(usize, Bar)> = Vec::new();
            for i in 0..streams.len() {
                let matches = pending[i]
                    .as_ref()
                    .is_some_and(|b| b.timestamp == timestamp);
                if matches {
                    if let Some(bar) = pending[i].take() {
                        pending[i] = streams[i].next_bar()?;
                        group.push((i, bar));
                    }
                }
            }

            // Phase 1: pending market orders fill at this bar's open.
            for (_, bar) in &group {
                for event in broker.fill_market_orders(bar, bar_index)? {
                    if matches!(event, ExecutionEvent::MarginRejected { .. }) {
                        margin_rejections += 1;
                    }
                }
            }

            // Phase 2: working stops trigger against the bar's range.
            for (_, bar) in &group {
                for event in broker.trigger_stops(bar, bar_index)? {
                    if matches!(event, ExecutionEvent::MarginRejected { .. }) {
                        margin_rejections += 1;
                    }
                }
            }

            // Phase 3: decisions on the close.
            for (i, bar) in &group {
                last_close.insert(bar.symbol.clone(), bar.close);
                let ctx = DecisionContext {
                    position_quantity: broker.position_quantity(&bar.symbol),
                    equity: broker.equity(&last_close),
                    entry_blocked: broker.has_active_entry(&bar.symbol),
                    allocator: &allocator,
                };
                for action in decisions[*i].on_bar(bar, &ctx) {
                    match action {
                        Action::Submit(request) => {
                            broker.submit(request, bar_index)?;
                        }
                        Action::CancelProtectiveStops { symbol } => {
                            broker.cancel_protective_stops(&symbol, bar_index)?;
                        }
                    }
                }
                bars_processed += 1;
            }

            // Phase 4: mark to market.
            broker.mark_to_market(&last_close);
            bar_index += 1;
        }

        Ok(RunResult {
            equity_curve: broker.equity_curve().to_vec(),
            trades: broker.trades().to_vec(),
            fills: broker.fills().to_vec(),
            margin_rejections,
            bars_processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MemoryFeed;
    use chrono::{TimeZone, Utc};

    fn make_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: symbol.to_string(),
                timestamp: base + chrono::Duration::minutes(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 10.0,
            })
            .collect()
    }

    fn fast_params() -> StrategyParams {
        StrategyParams {
            short_period: 2,
            long_period: 4,
            atr_period: 2,
            rsi_period: 4,
            ..StrategyParams::default()
        }
    }

    #[test]
    fn invalid_params_rejected_before_run() {
        let params = StrategyParams {
            short_period: 20,
            long_period: 10,
            ..StrategyParams::default()
        };
        assert!(Engine::new(EngineConfig::default(), params).is_err());
    }

    #[test]
    fn empty_feed_list_is_an_error() {
        let engine = Engine::new(EngineConfig::default(), fast_params()).unwrap();
        assert!(matches!(
            engine.run(Vec::new()),
            Err(EngineError::NoInstruments)
        ));
    }

    #[test]
    fn flat_run_keeps_equity_constant() {
        let engine = Engine::new(EngineConfig::default(), fast_params()).unwrap();
        let bars = make_bars("BTC-USD", &[100.0; 20]);
        let feed: Box<dyn BarFeed> = Box::new(MemoryFeed::new(bars));
        let result = engine.run(vec![("BTC-USD".into(), feed)]).unwrap();

        assert_eq!(result.bars_processed, 20);
        assert_eq!(result.equity_curve.len(), 21);
        assert!(result.trades.is_empty());
        assert!(result
            .equity_curve
            .iter()
            .all(|&e| (e - 1_000_000.0).abs() < 1e-9));
    }

    #[test]
    fn feed_integrity_error_is_fatal_to_the_run() {
        let engine = Engine::new(EngineConfig::default(), fast_params()).unwrap();
        let mut bars = make_bars("BTC-USD", &[100.0, 101.0, 102.0]);
        bars[2].timestamp = bars[0].timestamp; // out of order
        let feed: Box<dyn BarFeed> = Box::new(MemoryFeed::new(bars));
        let err = engine.run(vec![("BTC-USD".into(), feed)]).unwrap_err();
        assert!(matches!(err, EngineError::Feed(_)));
    }

    #[test]
    fn crossover_round_trip_produces_trade() {
        let engine = Engine::new(
            EngineConfig {
                initial_cash: 1_000_000.0,
                commission_rate: 0.0,
                slippage_rate: 0.0,
            },
            fast_params(),
        )
        .unwrap();

        // Decline, choppy recovery (cross up, RSI moderate), rally, collapse
        // (cross down closes the long).
        let closes = [
            110.0, 108.0, 106.0, 104.0, 102.0, 100.0, 103.0, 102.0, 105.0, 104.0, 107.0, 109.0,
            111.0, 113.0, 100.0, 88.0, 80.0, 76.0, 74.0, 72.0,
        ];
        let feed: Box<dyn BarFeed> = Box::new(MemoryFeed::new(make_bars("BTC-USD", &closes)));
        let result = engine.run(vec![("BTC-USD".into(), feed)]).unwrap();

        assert!(
            !result.fills.is_empty(),
            "crossover should have traded at least once"
        );
        assert!(
            !result.trades.is_empty(),
            "round trip should be extracted as a trade"
        );
        // Signals act on the next open, so nothing fills on the first bar.
        assert!(result.fills.iter().all(|f| f.bar_index > 0));
    }

    #[test]
    fn multi_instrument_feeds_merge_by_timestamp() {
        let engine = Engine::new(EngineConfig::default(), fast_params()).unwrap();
        let btc = make_bars("BTC-USD", &[100.0; 10]);
        // ETH misses the first three timestamps.
        let eth: Vec<Bar> = make_bars("ETH-USD", &[50.0; 10])
            .into_iter()
            .skip(3)
            .collect();

        let feeds: Vec<(Symbol, Box<dyn BarFeed>)> = vec![
            ("BTC-USD".into(), Box::new(MemoryFeed::new(btc))),
            ("ETH-USD".into(), Box::new(MemoryFeed::new(eth))),
        ];
        let result = engine.run(feeds).unwrap();

        // 10 timestamp steps, 10 + 7 instrument bars.
        assert_eq!(result.equity_curve.len(), 11);
        assert_eq!(result.bars_processed, 17);
    }
}
