//! Performance analytics — pure functions of the equity curve and trade log.
//!
//! Everything here is computed once at run end and feeds nothing back into
//! the simulation. Degenerate inputs (fewer than two samples, zero variance)
//! produce `None` — an explicit "undefined" — never NaN or a panic.

use macross_core::domain::TradeRecord;
use serde::{Deserialize, Serialize};

/// Variance below this is treated as zero.
const VARIANCE_FLOOR: f64 = 1e-15;

/// Read-only snapshot derived from one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub final_equity: f64,
    /// Total return as a fraction of starting equity.
    pub total_return: f64,
    /// Largest peak-to-trough loss as a fraction of the running peak.
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio; `None` when undefined.
    pub sharpe: Option<f64>,
    /// System Quality Number; `None` below two trades or at zero variance.
    pub sqn: Option<f64>,
    pub trade_count: usize,
    /// Per-period return series, for the external reporting collaborator.
    pub returns: Vec<f64>,
}

impl AnalysisResult {
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], periods_per_year: f64) -> Self {
        let returns = returns_series(equity_curve);
        Self {
            final_equity: equity_curve.last().copied().unwrap_or(0.0),
            total_return: total_return(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            sharpe: sharpe_ratio(&returns, periods_per_year),
            sqn: sqn(trades),
            trade_count: trades.len(),
            returns,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Per-period returns: (equity_t / equity_{t-1}) - 1.
pub fn returns_series(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Maximum drawdown as a positive fraction of the running peak
/// (e.g. 0.15 = a 15% drawdown). 0.0 for flat or monotonic equity.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized Sharpe ratio: mean(returns) / stdev(returns) * sqrt(periods
/// per year). `None` for fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let mean = mean_f64(returns);
    let std = std_dev(returns);
    if std < VARIANCE_FLOOR {
        return None;
    }
    Some(mean / std * periods_per_year.sqrt())
}

/// System Quality Number: mean(trade PnL) / stdev(trade PnL) * sqrt(count).
/// `None` below two trades or when the PnL series has zero variance.
pub fn sqn(trades: &[TradeRecord]) -> Option<f64> {
    if trades.len() < 2 {
        return None;
    }
    let pnls: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
    let mean = mean_f64(&pnls);
    let std = std_dev(&pnls);
    if std < VARIANCE_FLOOR {
        return None;
    }
    Some(mean / std * (pnls.len() as f64).sqrt())
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
