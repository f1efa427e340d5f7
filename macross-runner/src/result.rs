//! Backtest result: run identity, history, and derived analytics.

use crate::analytics::AnalysisResult;
use crate::config::RunId;
use macross_core::domain::TradeRecord;
use serde::{Deserialize, Serialize};

/// Complete output of one backtest run, handed to the external
/// reporting/plotting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    /// Crossover pair this run traded.
    pub short_period: usize,
    pub long_period: usize,
    /// Equity after every processed timestamp; index 0 is the initial cash.
    pub equity_curve: Vec<f64>,
    pub trades: Vec<TradeRecord>,
    pub analysis: AnalysisResult,
}

impl BacktestResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}
