//! MACross Core — the bar-driven simulation engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, orders, fills, positions, trades)
//! - Bar feeds with strict ordering and timeframe resampling
//! - Incremental indicators (EMA, ATR, RSI, crossover detection)
//! - Per-instrument strategy decision engine
//! - Broker with order lifecycle, fill simulation, and bracket bookkeeping
//! - Capital allocation across instruments
//! - The causally ordered per-bar event loop
//!
//! Data flows strictly forward in time: feed → indicators → decisions →
//! execution → equity. The runner crate layers configuration, analytics, and
//! parameter sweeps on top.

pub mod alloc;
pub mod broker;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: run state is Send + Sync, so sweep workers can
    /// carry independent pipelines across rayon threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        require_send::<broker::Broker>();
        require_sync::<broker::Broker>();
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<strategy::StrategyParams>();
        require_sync::<strategy::StrategyParams>();
        require_send::<strategy::DecisionEngine>();
        require_sync::<strategy::DecisionEngine>();
    }
}
