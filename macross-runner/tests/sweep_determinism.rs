//! Sweep determinism: the chosen parameters never depend on scheduling.

use chrono::{TimeZone, Utc};
use macross_core::domain::Bar;
use macross_runner::sweep::{GridPoint, RunOutcome, SweepRun};
use macross_runner::{AnalysisResult, BacktestResult, ParamGrid, ParamSweep, RunConfig};

fn make_wave_bars(symbol: &str, n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.35).sin() * 8.0 + i as f64 * 0.01;
            let open = close - 0.2;
            let high = open.max(close) + 1.5;
            let low = open.min(close) - 1.5;
            Bar {
                symbol: symbol.to_string(),
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn small_grid() -> ParamGrid {
    ParamGrid {
        short_periods: vec![2, 3, 5],
        long_periods: vec![4, 6, 9],
    }
}

fn base_config() -> RunConfig {
    RunConfig {
        atr_period: 5,
        rsi_period: 5,
        ..RunConfig::default()
    }
}

#[test]
fn parallel_and_sequential_sweeps_agree() {
    let data = vec![("BTC-USD".to_string(), make_wave_bars("BTC-USD", 400))];
    let grid = small_grid();
    let config = base_config();

    let parallel = ParamSweep::new().sweep(&grid, &config, &data);
    let sequential = ParamSweep::new()
        .with_parallelism(false)
        .sweep(&grid, &config, &data);

    assert_eq!(parallel.runs.len(), sequential.runs.len());
    for (p, s) in parallel.runs.iter().zip(&sequential.runs) {
        assert_eq!(p.point, s.point);
        match (&p.outcome, &s.outcome) {
            (RunOutcome::Completed(a), RunOutcome::Completed(b)) => assert_eq!(a, b),
            (RunOutcome::Failed(a), RunOutcome::Failed(b)) => assert_eq!(a, b),
            _ => panic!("outcome kind diverged at grid index {}", p.point.grid_index),
        }
    }

    let best_p = parallel.best().expect("grid should produce a traded run");
    let best_s = sequential.best().unwrap();
    assert_eq!(best_p.point, best_s.point);
}

#[test]
fn repeated_sweeps_choose_the_same_parameters() {
    let data = vec![("BTC-USD".to_string(), make_wave_bars("BTC-USD", 400))];
    let grid = small_grid();
    let config = base_config();

    let first = ParamSweep::new().sweep(&grid, &config, &data);
    let second = ParamSweep::new().sweep(&grid, &config, &data);
    assert_eq!(
        first.best().map(|r| r.point),
        second.best().map(|r| r.point)
    );
}

#[test]
fn failed_runs_do_not_abort_the_sweep() {
    // Corrupt data: every run hits the integrity error, the sweep still
    // reports all grid points and simply has no best run.
    let mut bars = make_wave_bars("BTC-USD", 60);
    bars[40].timestamp = bars[5].timestamp;
    let data = vec![("BTC-USD".to_string(), bars)];

    let report = ParamSweep::new().sweep(&small_grid(), &base_config(), &data);
    assert_eq!(report.runs.len(), small_grid().combinations().len());
    assert_eq!(report.completed_count(), 0);
    assert!(report.best().is_none());
    assert!(report
        .runs
        .iter()
        .all(|r| matches!(r.outcome, RunOutcome::Failed(_))));
}

// ── Selection rule on a hand-built report ────────────────────────────

fn stub_result(sqn: Option<f64>, trade_count: usize) -> BacktestResult {
    let equity_curve = vec![1_000_000.0, 1_000_100.0];
    let trades = vec![
        macross_core::domain::TradeRecord {
            symbol: "BTC-USD".into(),
            direction: macross_core::domain::TradeDirection::Long,
            quantity: 1.0,
            entry_price: 100.0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            exit_price: 101.0,
            exit_time: Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap(),
            commission: 0.0,
            net_pnl: 1.0,
        };
        trade_count
    ];
    BacktestResult {
        run_id: "stub".into(),
        short_period: 5,
        long_period: 20,
        analysis: AnalysisResult {
            final_equity: 1_000_100.0,
            total_return: 0.0001,
            max_drawdown: 0.0,
            sharpe: None,
            sqn,
            trade_count,
            returns: vec![0.0001],
        },
        equity_curve,
        trades,
    }
}

fn stub_run(grid_index: usize, sqn: Option<f64>, trade_count: usize) -> SweepRun {
    SweepRun {
        point: GridPoint {
            grid_index,
            short_period: 5,
            long_period: 20,
        },
        outcome: RunOutcome::Completed(Box::new(stub_result(sqn, trade_count))),
    }
}

#[test]
fn best_prefers_higher_sqn() {
    let report = macross_runner::SweepReport {
        runs: vec![
            stub_run(0, Some(1.0), 5),
            stub_run(1, Some(2.5), 5),
            stub_run(2, Some(2.0), 5),
        ],
    };
    assert_eq!(report.best().unwrap().point.grid_index, 1);
}

#[test]
fn best_breaks_ties_by_grid_order() {
    let report = macross_runner::SweepReport {
        runs: vec![
            stub_run(0, Some(2.0), 5),
            stub_run(1, Some(2.0), 5),
            stub_run(2, Some(2.0), 5),
        ],
    };
    assert_eq!(report.best().unwrap().point.grid_index, 0);
}

#[test]
fn best_ignores_untraded_runs() {
    let report = macross_runner::SweepReport {
        runs: vec![stub_run(0, None, 0), stub_run(1, Some(0.5), 2)],
    };
    assert_eq!(report.best().unwrap().point.grid_index, 1);
}

#[test]
fn undefined_sqn_never_beats_a_defined_one() {
    let report = macross_runner::SweepReport {
        runs: vec![stub_run(0, None, 1), stub_run(1, Some(-3.0), 2)],
    };
    assert_eq!(report.best().unwrap().point.grid_index, 1);
}
