//! Incremental indicator implementations.
//!
//! Each indicator is a per-instrument accumulator updated exactly once per new
//! bar of that instrument, in O(1) amortized time. `update` returns `None`
//! until the seed window completes, then the new scalar. A value at bar t
//! depends only on bars <= t; the parity suite in `tests/indicator_parity.rs`
//! checks that incremental output equals recomputation from full history.

pub mod atr;
pub mod cross;
pub mod ema;
pub mod rsi;

pub use atr::Atr;
pub use cross::{Cross, CrossDetector};
pub use ema::Ema;
pub use rsi::Rsi;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
