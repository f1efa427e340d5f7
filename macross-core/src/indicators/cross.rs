//! Crossover detection between two series.
//!
//! CrossUp fires exactly on the sample where A transitions from <= B to > B;
//! CrossDown on the >= B to < B transition. Detection needs two consecutive
//! samples, so the first sample of a pair can never signal, and up and down
//! can never fire together.

/// Cross signals for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cross {
    pub up: bool,
    pub down: bool,
}

impl Cross {
    pub const NONE: Cross = Cross {
        up: false,
        down: false,
    };
}

/// Per-pair crossover state.
#[derive(Debug, Clone, Default)]
pub struct CrossDetector {
    prev: Option<(f64, f64)>,
}

impl CrossDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next (a, b) sample pair.
    pub fn update(&mut self, a: f64, b: f64) -> Cross {
        let cross = match self.prev {
            Some((pa, pb)) => Cross {
                up: pa <= pb && a > b,
                down: pa >= pb && a < b,
            },
            None => Cross::NONE,
        };
        self.prev = Some((a, b));
        cross
    }
}
