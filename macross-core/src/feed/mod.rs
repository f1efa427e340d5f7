//! Bar feeds: ordered bar streams and timeframe resampling.
//!
//! A feed yields bars for one instrument with strictly increasing timestamps.
//! Ordering violations are data-integrity errors, fatal to the run that hit
//! them; the feed surfaces them as typed errors instead of silently
//! reordering.

mod resample;

pub use resample::Resampler;

use crate::domain::Bar;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("out-of-order bar for {symbol}: {current} follows {previous}")]
    OutOfOrder {
        symbol: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("duplicate bar timestamp for {symbol}: {timestamp}")]
    DuplicateTimestamp {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

/// An ordered bar stream. `Ok(None)` is end-of-stream.
pub trait BarFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, FeedError>;
}

/// Pre-loaded bar feed.
///
/// Ordering is validated as bars are consumed, so a violation surfaces at the
/// exact bar that introduced it.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    bars: std::vec::IntoIter<Bar>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryFeed {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars: bars.into_iter(),
            last_timestamp: None,
        }
    }
}

impl BarFeed for MemoryFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, FeedError> {
        let bar = match self.bars.next() {
            Some(bar) => bar,
            None => return Ok(None),
        };

        if let Some(prev) = self.last_timestamp {
            if bar.timestamp == prev {
                return Err(FeedError::DuplicateTimestamp {
                    symbol: bar.symbol,
                    timestamp: bar.timestamp,
                });
            }
            if bar.timestamp < prev {
                return Err(FeedError::OutOfOrder {
                    symbol: bar.symbol,
                    previous: prev,
                    current: bar.timestamp,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        Ok(Some(bar))
    }
}
