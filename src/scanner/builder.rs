use std::time::Duration;

use crate::{
    Dispatch, EventSource, ScannerError,
    abi::BRIDGE_TRANSFER_INITIATED,
    scanner::{
        BridgeScanner, DEFAULT_CONFIRMATION_DELAY, DEFAULT_DISPATCH_CONCURRENCY,
        DEFAULT_LOOKBACK_BLOCKS, DEFAULT_POLLING_INTERVAL, DEFAULT_REORG_ROLLBACK_BLOCKS,
        ScanState, cursor::ScanCursor,
    },
};

/// Builder/configuration for the bridge scan loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeScannerBuilder {
    /// Sleep between cycles, and the base unit of error backoff.
    pub polling_interval: Duration,
    /// Number of blocks a log must be buried under before it is relayed.
    pub confirmation_delay: u64,
    /// How far below the confirmed tip the first scan starts.
    pub lookback_blocks: u64,
    /// How far the cursor steps back when a reorg is detected.
    pub reorg_rollback_blocks: u64,
    /// Maximum number of attestations in flight within one cycle.
    pub dispatch_concurrency: usize,
}

impl Default for BridgeScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeScannerBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            reorg_rollback_blocks: DEFAULT_REORG_ROLLBACK_BLOCKS,
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
        }
    }

    /// Must be greater than 0.
    #[must_use]
    pub fn polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    #[must_use]
    pub fn confirmation_delay(mut self, confirmation_delay: u64) -> Self {
        self.confirmation_delay = confirmation_delay;
        self
    }

    #[must_use]
    pub fn lookback_blocks(mut self, lookback_blocks: u64) -> Self {
        self.lookback_blocks = lookback_blocks;
        self
    }

    #[must_use]
    pub fn reorg_rollback_blocks(mut self, reorg_rollback_blocks: u64) -> Self {
        self.reorg_rollback_blocks = reorg_rollback_blocks;
        self
    }

    /// Sets how many deliveries may run concurrently. `1` delivers sequentially.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn dispatch_concurrency(mut self, dispatch_concurrency: usize) -> Self {
        self.dispatch_concurrency = dispatch_concurrency;
        self
    }

    /// Assemble the scan loop from a source and a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the polling interval or dispatch concurrency is zero.
    pub fn build<S: EventSource, D: Dispatch>(
        self,
        source: S,
        dispatcher: D,
    ) -> Result<BridgeScanner<S, D>, ScannerError> {
        if self.polling_interval.is_zero() {
            return Err(ScannerError::InvalidPollingInterval);
        }
        if self.dispatch_concurrency == 0 {
            return Err(ScannerError::InvalidDispatchConcurrency);
        }

        Ok(BridgeScanner {
            source,
            dispatcher,
            cursor: ScanCursor::new(
                self.confirmation_delay,
                self.lookback_blocks,
                self.reorg_rollback_blocks,
            ),
            event_name: BRIDGE_TRANSFER_INITIATED,
            polling_interval: self.polling_interval,
            dispatch_concurrency: self.dispatch_concurrency,
            state: ScanState::Idle,
        })
    }
}
