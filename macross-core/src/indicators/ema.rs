//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! with alpha = 2 / (period + 1).
//! Seed: EMA[period-1] = SMA of first `period` close values.
//! Lookback: period - 1.

/// Incremental EMA accumulator.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// Feed the next close. Returns the EMA once the seed window is full.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let next = match self.value {
            Some(prev) => self.alpha * close + (1.0 - self.alpha) * prev,
            None => {
                self.seed_sum += close;
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

    /// Last computed value, if the seed window has completed.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
