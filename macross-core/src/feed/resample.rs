//! Timeframe resampling: N base bars → one coarse bar.

use super::{BarFeed, FeedError};
use crate::domain::Bar;

/// Aggregates `compression` consecutive base bars into one coarse bar.
///
/// Aggregation: open = first open, high/low = extrema, close = last close,
/// volume = sum. The coarse bar carries the timestamp of its last base bar —
/// the moment the window closed — and is emitted only then; consumers never
/// see a partial window. A partial window at end-of-stream is discarded, and
/// gaps in the base feed propagate without interpolation.
#[derive(Debug)]
pub struct Resampler<F> {
    inner: F,
    compression: usize,
}

impl<F: BarFeed> Resampler<F> {
    pub fn new(inner: F, compression: usize) -> Self {
        assert!(compression >= 1, "compression must be >= 1");
        Self { inner, compression }
    }
}

impl<F: BarFeed> BarFeed for Resampler<F> {
    fn next_bar(&mut self) -> Result<Option<Bar>, FeedError> {
        if self.compression == 1 {
            return self.inner.next_bar();
        }

        let mut acc: Option<Bar> = None;
        let mut count = 0;

        while count < self.compression {
            let bar = match self.inner.next_bar()? {
                Some(bar) => bar,
                // End of stream mid-window: the window never closed.
                None => return Ok(None),
            };
            count += 1;

            match &mut acc {
                None => acc = Some(bar),
                Some(agg) => {
                    agg.high = agg.high.max(bar.high);
                    agg.low = agg.low.min(bar.low);
                    agg.close = bar.close;
                    agg.volume += bar.volume;
                    agg.timestamp = bar.timestamp;
                }
            }
        }

        Ok(acc)
    }
}
