//! Single-run orchestration: config + bars in, BacktestResult out.

use crate::analytics::AnalysisResult;
use crate::config::RunConfig;
use crate::result::BacktestResult;
use macross_core::domain::{Bar, Symbol};
use macross_core::engine::{Engine, EngineError};
use macross_core::feed::{BarFeed, MemoryFeed, Resampler};

/// Annualization base for the Sharpe ratio (daily replay bars).
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Run one independent pipeline over the given per-instrument bar series.
///
/// Each call owns fresh state end to end: indicators, broker, and positions
/// are built here and dropped here, so concurrent callers share nothing.
pub fn run_backtest(
    config: &RunConfig,
    data: &[(Symbol, Vec<Bar>)],
) -> Result<BacktestResult, EngineError> {
    let engine = Engine::new(config.engine_config(), config.strategy_params())?;

    let feeds: Vec<(Symbol, Box<dyn BarFeed>)> = data
        .iter()
        .map(|(symbol, bars)| {
            let feed: Box<dyn BarFeed> = Box::new(Resampler::new(
                MemoryFeed::new(bars.clone()),
                config.replay_compression,
            ));
            (symbol.clone(), feed)
        })
        .collect();

    let run = engine.run(feeds)?;
    let analysis = AnalysisResult::compute(&run.equity_curve, &run.trades, PERIODS_PER_YEAR);

    Ok(BacktestResult {
        run_id: config.run_id(),
        short_period: config.short_period,
        long_period: config.long_period,
        equity_curve: run.equity_curve,
        trades: run.trades,
        analysis,
    })
}
