use alloy::primitives::BlockNumber;
use tracing::debug;

use crate::scanner::BlockRange;

/// Default maximum number of blocks covered by a single `eth_getLogs` request.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 10_000;

/// Splits a [`BlockRange`] into consecutive chunks of at most `max_block_range` blocks,
/// oldest first.
#[derive(Debug, Clone)]
pub struct RangeIterator {
    current: BlockNumber,
    end: BlockNumber,
    range_size: u64,
    batch_count: u64,
    total_batches: u64,
}

impl RangeIterator {
    /// # Panics
    ///
    /// Panics if `max_block_range` is 0.
    #[must_use]
    pub const fn new(range: BlockRange, max_block_range: u64) -> Self {
        assert!(max_block_range >= 1, "max_block_range must be at least 1");
        let total_batches =
            if range.is_empty() { 0 } else { (range.to - range.from) / max_block_range + 1 };
        Self {
            current: range.from,
            end: range.to,
            range_size: max_block_range,
            batch_count: 0,
            total_batches,
        }
    }
}

impl Iterator for RangeIterator {
    type Item = BlockRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch_count >= self.total_batches {
            return None;
        }

        self.batch_count += 1;
        if self.batch_count % 10 == 0 {
            debug!(batch_count = self.batch_count, "Processed log query chunks");
        }

        let batch_start = self.current;
        let batch_end = batch_start.saturating_add(self.range_size - 1).min(self.end);
        self.current = batch_end.saturating_add(1);

        Some(BlockRange::new(batch_start, batch_end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.total_batches - self.batch_count) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}
