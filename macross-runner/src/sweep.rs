//! Parameter sweep: grid search over crossover period pairs.
//!
//! Every combination runs an independent pipeline (fresh indicators, broker,
//! positions) and combinations are embarrassingly parallel. Aggregation is
//! keyed by the stable grid index, never by completion order, so the chosen
//! parameters are identical however the runs are scheduled.

use rayon::prelude::*;

use crate::config::RunConfig;
use crate::result::BacktestResult;
use crate::runner::run_backtest;
use macross_core::domain::{Bar, Symbol};

/// Parameter grid specification.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub short_periods: Vec<usize>,
    pub long_periods: Vec<usize>,
}

/// One (short, long) pair with its position in the enumerated grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPoint {
    pub grid_index: usize,
    pub short_period: usize,
    pub long_period: usize,
}

impl ParamGrid {
    /// The reference sweep: short 5..50 step 5, long 20..200 step 10.
    pub fn ma_crossover_default() -> Self {
        Self {
            short_periods: (5..50).step_by(5).collect(),
            long_periods: (20..200).step_by(10).collect(),
        }
    }

    /// Enumerate valid combinations in grid order. Pairs with
    /// short >= long are skipped — not an error — and the index keeps
    /// counting over the full cartesian product so it stays stable
    /// whatever subset survives.
    pub fn combinations(&self) -> Vec<GridPoint> {
        let mut points = Vec::new();
        let mut grid_index = 0;
        for &short in &self.short_periods {
            for &long in &self.long_periods {
                if short < long {
                    points.push(GridPoint {
                        grid_index,
                        short_period: short,
                        long_period: long,
                    });
                }
                grid_index += 1;
            }
        }
        points
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(Box<BacktestResult>),
    /// The run aborted (e.g. a data integrity violation); the sweep carries
    /// on without it.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SweepRun {
    pub point: GridPoint,
    pub outcome: RunOutcome,
}

impl SweepRun {
    fn completed(&self) -> Option<&BacktestResult> {
        match &self.outcome {
            RunOutcome::Completed(result) => Some(result),
            RunOutcome::Failed(_) => None,
        }
    }
}

/// Results of a full sweep, in grid order.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub runs: Vec<SweepRun>,
}

impl SweepReport {
    /// Best run: among completed runs with at least one trade, the one
    /// maximizing SQN. An undefined SQN never beats a defined one, and ties
    /// go to the earliest grid index — selection is deterministic whatever
    /// order the runs finished in.
    pub fn best(&self) -> Option<&SweepRun> {
        let mut best: Option<(&SweepRun, f64)> = None;
        for run in &self.runs {
            let result = match run.completed() {
                Some(r) if r.trade_count() >= 1 => r,
                _ => continue,
            };
            let key = result.analysis.sqn.unwrap_or(f64::NEG_INFINITY);
            match best {
                Some((_, best_key)) if key <= best_key => {}
                _ => best = Some((run, key)),
            }
        }
        best.map(|(run, _)| run)
    }

    pub fn completed_count(&self) -> usize {
        self.runs.iter().filter(|r| r.completed().is_some()).count()
    }
}

/// Parameter sweep executor.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every valid grid point over the same data. Each worker clones the
    /// bars and owns its whole pipeline — no shared mutable state.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base_config: &RunConfig,
        data: &[(Symbol, Vec<Bar>)],
    ) -> SweepReport {
        let points = grid.combinations();

        let run_point = |point: &GridPoint| -> SweepRun {
            let config = base_config.with_periods(point.short_period, point.long_period);
            let outcome = match run_backtest(&config, data) {
                Ok(result) => RunOutcome::Completed(Box::new(result)),
                Err(err) => RunOutcome::Failed(err.to_string()),
            };
            SweepRun {
                point: *point,
                outcome,
            }
        };

        let mut runs: Vec<SweepRun> = if self.parallel {
            points.par_iter().map(run_point).collect()
        } else {
            points.iter().map(run_point).collect()
        };

        // Stable aggregation key, independent of completion order.
        runs.sort_by_key(|r| r.point.grid_index);
        SweepReport { runs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_skip_short_ge_long() {
        let grid = ParamGrid {
            short_periods: vec![10, 50, 100],
            long_periods: vec![50, 100],
        };
        let points = grid.combinations();

        // Valid: (10,50), (10,100), (50,100). Invalid pairs are skipped.
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.short_period < p.long_period));
    }

    #[test]
    fn grid_indices_are_stable_under_skips() {
        let grid = ParamGrid {
            short_periods: vec![10, 50],
            long_periods: vec![50, 100],
        };
        let points = grid.combinations();
        // Full product: (10,50)=0, (10,100)=1, (50,50)=2 skipped, (50,100)=3.
        let indices: Vec<usize> = points.iter().map(|p| p.grid_index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
    }

    #[test]
    fn default_grid_matches_reference_ranges() {
        let grid = ParamGrid::ma_crossover_default();
        assert_eq!(grid.short_periods.first(), Some(&5));
        assert_eq!(grid.short_periods.last(), Some(&45));
        assert_eq!(grid.long_periods.first(), Some(&20));
        assert_eq!(grid.long_periods.last(), Some(&190));
    }
}
