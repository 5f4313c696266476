use std::fmt;

use alloy::primitives::BlockNumber;
use tracing::{debug, warn};

/// An inclusive block range `[from, to]`.
///
/// A range with `from > to` is empty and means there is nothing to scan yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    pub from: BlockNumber,
    pub to: BlockNumber,
}

impl BlockRange {
    #[must_use]
    pub const fn new(from: BlockNumber, to: BlockNumber) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Number of blocks covered by the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        if self.is_empty() { 0 } else { self.to - self.from + 1 }
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Tracks the last block whose logs were fully processed.
///
/// Once set, the value only moves forward through [`ScanCursor::commit`] and only moves back
/// through [`ScanCursor::rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    last_confirmed_block: Option<BlockNumber>,
    confirmation_delay: u64,
    lookback_blocks: u64,
    rollback_step: u64,
}

impl ScanCursor {
    #[must_use]
    pub const fn new(confirmation_delay: u64, lookback_blocks: u64, rollback_step: u64) -> Self {
        Self { last_confirmed_block: None, confirmation_delay, lookback_blocks, rollback_step }
    }

    #[must_use]
    pub const fn last_confirmed_block(&self) -> Option<BlockNumber> {
        self.last_confirmed_block
    }

    /// Compute the next range to scan for the given chain head.
    ///
    /// On the first call the cursor is seeded `lookback_blocks` below the confirmed tip so that
    /// events emitted shortly before startup are not missed.
    pub fn next_range(&mut self, head: BlockNumber) -> BlockRange {
        let confirmed_tip = head.saturating_sub(self.confirmation_delay);
        let last = *self.last_confirmed_block.get_or_insert_with(|| {
            let start = confirmed_tip.saturating_sub(self.lookback_blocks);
            debug!(head, start, "Initialized scan cursor");
            start
        });

        BlockRange::new(last.saturating_add(1), confirmed_tip)
    }

    /// Record that every log up to and including `to` has been processed.
    pub fn commit(&mut self, to: BlockNumber) {
        if let Some(last) = self.last_confirmed_block
            && to < last
        {
            warn!(last, to, "Refusing to move scan cursor backwards on commit");
            return;
        }
        self.last_confirmed_block = Some(to);
    }

    /// Step back after a reorg was detected.
    ///
    /// Returns the new position, or `None` if the cursor was never initialized.
    pub fn rollback(&mut self) -> Option<BlockNumber> {
        let last = self.last_confirmed_block.as_mut()?;
        *last = last.saturating_sub(self.rollback_step);
        Some(*last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_seeds_lookback_below_confirmed_tip() {
        let mut cursor = ScanCursor::new(6, 10, 10);

        let range = cursor.next_range(1_000);

        assert_eq!(range, BlockRange::new(985, 994));
        assert_eq!(cursor.last_confirmed_block(), Some(984));
    }

    #[test]
    fn cold_start_on_young_chain_clamps_at_genesis() {
        let mut cursor = ScanCursor::new(6, 10, 10);

        let range = cursor.next_range(3);

        assert_eq!(cursor.last_confirmed_block(), Some(0));
        assert!(range.is_empty());
    }

    #[test]
    fn range_is_empty_until_head_moves_past_delay() {
        let mut cursor = ScanCursor::new(6, 10, 10);
        let first = cursor.next_range(1_000);
        cursor.commit(first.to);

        assert!(cursor.next_range(1_000).is_empty());
        assert_eq!(cursor.next_range(1_003), BlockRange::new(995, 997));
    }

    #[test]
    fn range_never_exceeds_confirmed_tip() {
        let mut cursor = ScanCursor::new(12, 0, 10);
        for head in [50, 60, 61, 100, 250, 251] {
            let range = cursor.next_range(head);
            assert!(range.to <= head - 12);
            if !range.is_empty() {
                cursor.commit(range.to);
            }
        }
    }

    #[test]
    fn committed_position_is_monotonic() {
        let mut cursor = ScanCursor::new(6, 10, 10);
        let mut previous = 0;
        for head in [100, 100, 120, 119, 150, 90, 200] {
            let range = cursor.next_range(head);
            if !range.is_empty() {
                cursor.commit(range.to);
            }
            let current = cursor.last_confirmed_block().unwrap_or_default();
            assert!(current >= previous, "cursor regressed from {previous} to {current}");
            previous = current;
        }
    }

    #[test]
    fn commit_does_not_move_backwards() {
        let mut cursor = ScanCursor::new(6, 10, 10);
        cursor.commit(500);

        cursor.commit(400);

        assert_eq!(cursor.last_confirmed_block(), Some(500));
    }

    #[test]
    fn rollback_steps_back_by_fixed_amount() {
        let mut cursor = ScanCursor::new(6, 10, 10);
        cursor.commit(500);

        assert_eq!(cursor.rollback(), Some(490));
        assert_eq!(cursor.next_range(600).from, 491);
    }

    #[test]
    fn rollback_clamps_at_zero() {
        let mut cursor = ScanCursor::new(6, 10, 10);
        cursor.commit(4);

        assert_eq!(cursor.rollback(), Some(0));
        assert_eq!(cursor.rollback(), Some(0));
    }

    #[test]
    fn rollback_on_uninitialized_cursor_is_noop() {
        let mut cursor = ScanCursor::new(6, 10, 10);

        assert_eq!(cursor.rollback(), None);
        assert_eq!(cursor.last_confirmed_block(), None);
    }

    #[test]
    fn block_range_helpers() {
        let range = BlockRange::new(10, 19);
        assert_eq!(range.len(), 10);
        assert!(!range.is_empty());
        assert_eq!(range.to_string(), "[10, 19]");

        let empty = BlockRange::new(20, 19);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }
}
