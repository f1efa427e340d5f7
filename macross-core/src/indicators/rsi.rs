//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses over close-to-close
//! changes. RSI = 100 - 100 / (1 + avg_gain / avg_loss), bounded 0..=100.
//! Lookback: period.
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; no movement → 50.

/// Incremental RSI accumulator.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    seed_count: usize,
    averages: Option<(f64, f64)>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            seed_count: 0,
            averages: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period
    }

    /// Feed the next close. Returns the RSI once `period` changes have
    /// accumulated.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev_close = match self.prev_close {
            Some(pc) => pc,
            None => {
                self.prev_close = Some(close);
                return None;
            }
        };

        let change = close - prev_close;
        self.prev_close = Some(close);
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let (avg_gain, avg_loss) = match self.averages {
            Some((ag, al)) => {
                let alpha = 1.0 / self.period as f64;
                (
                    alpha * gain + (1.0 - alpha) * ag,
                    alpha * loss + (1.0 - alpha) * al,
                )
            }
            None => {
                self.seed_gain += gain;
                self.seed_loss += loss;
                self.seed_count += 1;
                if self.seed_count < self.period {
                    return None;
                }
                (
                    self.seed_gain / self.period as f64,
                    self.seed_loss / self.period as f64,
                )
            }
        };
        self.averages = Some((avg_gain, avg_loss));
        Some(compute_rsi(avg_gain, avg_loss))
    }

    pub fn value(&self) -> Option<f64> {
        self.averages.map(|(ag, al)| compute_rsi(ag, al))
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
