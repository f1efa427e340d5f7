//! MACross Runner — orchestration on top of the simulation core.
//!
//! - Run configuration (serde + TOML, content-addressed run ids)
//! - Single-run orchestration (feeds → engine → analytics)
//! - Performance analytics (returns, drawdown, Sharpe, SQN)
//! - Parameter sweep with deterministic best-run selection

pub mod analytics;
pub mod config;
pub mod result;
pub mod runner;
pub mod sweep;

pub use analytics::AnalysisResult;
pub use config::{RunConfig, RunId};
pub use result::BacktestResult;
pub use runner::run_backtest;
pub use sweep::{ParamGrid, ParamSweep, SweepReport};
