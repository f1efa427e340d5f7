//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period) over the TR series.
//! The first bar only establishes prev_close (its high-low range is not a
//! proper true range), so the first value lands on bar index `period`.
//! Lookback: period.

use crate::domain::Bar;

/// Incremental ATR accumulator.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period
    }

    /// Feed the next bar. Returns the ATR once `period` true ranges have
    /// accumulated.
    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let prev_close = match self.prev_close {
            Some(pc) => pc,
            None => {
                self.prev_close = Some(bar.close);
                return None;
            }
        };

        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        self.prev_close = Some(bar.close);

        let next = match self.value {
            Some(prev) => {
                let alpha = 1.0 / self.period as f64;
                alpha * tr + (1.0 - alpha) * prev
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count < self.period {
                    return None;
                }
                self.seed_sum / self.period as f64
            }
        };
        self.value = Some(next);
        Some(next)
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
