//! The polling scan loop.
//!
//! [`BridgeScanner`] owns the [`ScanCursor`], an [`EventSource`] and a [`Dispatch`]er and moves
//! through four states:
//!
//! - `Idle`: about to start a cycle.
//! - `Scanning`: query the head, fetch the next confirmed range, normalize and deliver every
//!   event, then commit the cursor.
//! - `Waiting`: nothing more to do until the next polling interval.
//! - `Backoff`: the last cycle failed; sleep before scanning again.
//!
//! A missing block during `Scanning` is treated as a reorg: the cursor steps back and the loop
//! backs off for one polling interval. Any other source error backs off for twice the polling
//! interval and leaves the cursor untouched. Per-event failures (malformed logs, refused
//! deliveries) are logged and never prevent the cursor from advancing.
//!
//! # Example
//!
//! ```rust,no_run
//! use alloy::primitives::address;
//! use bridge_relayer::{
//!     BridgeScannerBuilder, OracleClient, OracleClientConfig, RpcEventSource,
//!     dispatcher::DEFAULT_DISPATCH_TIMEOUT,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source: RpcEventSource =
//!     RpcEventSource::builder(address!("0x1234567890123456789012345678901234567890"))
//!         .connect("http://localhost:8545")
//!         .await?;
//! let oracle = OracleClient::new(OracleClientConfig {
//!     endpoint: "https://oracle.example/attest".parse()?,
//!     api_key: "key".into(),
//!     timeout: DEFAULT_DISPATCH_TIMEOUT,
//! })?;
//!
//! let scanner = BridgeScannerBuilder::new().confirmation_delay(12).build(source, oracle)?;
//!
//! let shutdown = CancellationToken::new();
//! scanner.run(shutdown.clone()).await;
//! # Ok(()) }
//! ```

use std::time::Duration;

use futures::{StreamExt, stream};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{Dispatch, EventSource, error::SourceError, normalizer::normalize};

mod builder;
pub mod cursor;

pub use builder::BridgeScannerBuilder;
pub use cursor::{BlockRange, ScanCursor};

/// Default time between two scan cycles.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(15);
/// Default number of confirmations required before a block is scanned.
pub const DEFAULT_CONFIRMATION_DELAY: u64 = 6;
/// Default distance below the confirmed tip at which the first scan starts.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 10;
/// Default cursor rollback applied when a reorg is detected.
pub const DEFAULT_REORG_ROLLBACK_BLOCKS: u64 = 10;
/// Default number of concurrent attestation deliveries per cycle.
pub const DEFAULT_DISPATCH_CONCURRENCY: usize = 4;
/// Backoff after a connectivity failure, in polling intervals.
pub const ERROR_BACKOFF_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Waiting(Duration),
    Backoff(Duration),
}

/// Counters for one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub range: BlockRange,
    /// Logs returned by the source.
    pub found: usize,
    /// Events accepted by the oracle.
    pub dispatched: usize,
    /// Logs dropped because they could not be normalized.
    pub malformed: usize,
    /// Events whose delivery failed.
    pub failed: usize,
}

/// Result of a single scan cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The head has not moved past the confirmation delay since the last commit.
    NothingToScan { head: u64, range: BlockRange },
    /// The range was fetched, processed and committed.
    Scanned(CycleReport),
    /// A reorg was detected and the cursor stepped back.
    ReorgRollback { rolled_back_to: Option<u64> },
    /// The source failed; the cursor is unchanged.
    Failed(SourceError),
    /// Shutdown was requested before the cycle completed; nothing was committed.
    Cancelled,
}

impl CycleOutcome {
    /// State the loop moves to after this outcome, or `None` if it should stop.
    #[must_use]
    pub fn next_state(&self, polling_interval: Duration) -> Option<ScanState> {
        match self {
            CycleOutcome::NothingToScan { .. } | CycleOutcome::Scanned(_) => {
                Some(ScanState::Waiting(polling_interval))
            }
            CycleOutcome::ReorgRollback { .. } => Some(ScanState::Backoff(polling_interval)),
            CycleOutcome::Failed(_) => {
                Some(ScanState::Backoff(polling_interval.saturating_mul(ERROR_BACKOFF_MULTIPLIER)))
            }
            CycleOutcome::Cancelled => None,
        }
    }
}

/// Relays confirmed bridge events from an [`EventSource`] to a [`Dispatch`]er.
#[derive(Debug)]
pub struct BridgeScanner<S, D> {
    source: S,
    dispatcher: D,
    cursor: ScanCursor,
    event_name: &'static str,
    polling_interval: Duration,
    dispatch_concurrency: usize,
    state: ScanState,
}

impl<S: EventSource, D: Dispatch> BridgeScanner<S, D> {
    #[must_use]
    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Drive the loop until `shutdown` is cancelled.
    ///
    /// Every sleep and network call is raced against the token, so cancellation takes effect
    /// without waiting for the current interval to elapse.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            event = self.event_name,
            polling_interval_secs = self.polling_interval.as_secs(),
            dispatch_concurrency = self.dispatch_concurrency,
            "Bridge scanner started"
        );

        loop {
            match self.state {
                ScanState::Idle => self.state = ScanState::Scanning,
                ScanState::Scanning => {
                    let outcome = self.scan_cycle(&shutdown).await;
                    match outcome.next_state(self.polling_interval) {
                        Some(next) => self.state = next,
                        None => break,
                    }
                }
                ScanState::Waiting(duration) | ScanState::Backoff(duration) => {
                    debug!(state = ?self.state, "Sleeping before next cycle");
                    if cancellable(&shutdown, sleep(duration)).await.is_none() {
                        break;
                    }
                    self.state = match self.state {
                        ScanState::Waiting(_) => ScanState::Idle,
                        _ => ScanState::Scanning,
                    };
                }
            }
        }

        info!(
            last_confirmed_block = ?self.cursor.last_confirmed_block(),
            "Bridge scanner stopped"
        );
    }

    /// Run one scan cycle and report what happened.
    ///
    /// The cursor is committed only when the fetch for the computed range succeeded and every
    /// event in it was handled.
    pub async fn scan_cycle(&mut self, shutdown: &CancellationToken) -> CycleOutcome {
        let head = match cancellable(shutdown, self.source.current_head()).await {
            None => return CycleOutcome::Cancelled,
            Some(Ok(head)) => head,
            Some(Err(e)) => return self.handle_source_error(e, None),
        };

        let range = self.cursor.next_range(head);
        if range.is_empty() {
            debug!(head, block_range = %range, "No new confirmed blocks");
            return CycleOutcome::NothingToScan { head, range };
        }

        let fetch = self.source.fetch_logs(self.event_name, range);
        let logs = match cancellable(shutdown, fetch).await {
            None => return CycleOutcome::Cancelled,
            Some(Ok(logs)) => logs,
            Some(Err(e)) => return self.handle_source_error(e, Some(range)),
        };

        let mut report =
            CycleReport { range, found: logs.len(), dispatched: 0, malformed: 0, failed: 0 };

        let mut events = Vec::with_capacity(logs.len());
        for raw in &logs {
            match normalize(raw) {
                Ok(event) => events.push(event),
                Err(e) => {
                    report.malformed += 1;
                    warn!(
                        error = %e,
                        tx_hash = ?raw.tx_hash,
                        block_number = ?raw.block_number,
                        "Dropping malformed event"
                    );
                }
            }
        }

        if !events.is_empty() {
            let dispatcher = &self.dispatcher;
            let deliveries = stream::iter(events)
                .map(|event| async move {
                    match dispatcher.dispatch(&event).await {
                        Ok(_) => true,
                        Err(e) => {
                            error!(
                                error = %e,
                                tx_hash = %event.tx_hash,
                                nonce = %event.args.nonce,
                                "Failed to deliver attestation"
                            );
                            false
                        }
                    }
                })
                .buffer_unordered(self.dispatch_concurrency)
                .collect::<Vec<bool>>();

            let Some(delivered) = cancellable(shutdown, deliveries).await else {
                return CycleOutcome::Cancelled;
            };
            report.dispatched = delivered.iter().filter(|ok| **ok).count();
            report.failed = delivered.len() - report.dispatched;
        }

        self.cursor.commit(range.to);
        info!(
            block_range = %range,
            found = report.found,
            dispatched = report.dispatched,
            malformed = report.malformed,
            failed = report.failed,
            "Scan cycle complete"
        );

        CycleOutcome::Scanned(report)
    }

    fn handle_source_error(
        &mut self,
        error: SourceError,
        range: Option<BlockRange>,
    ) -> CycleOutcome {
        if error.is_reorg() {
            let rolled_back_to = self.cursor.rollback();
            warn!(
                error = %error,
                block_range = ?range,
                rolled_back_to = ?rolled_back_to,
                "Reorg detected, rolling back scan cursor"
            );
            return CycleOutcome::ReorgRollback { rolled_back_to };
        }

        error!(error = %error, block_range = ?range, "Scan cycle failed");
        CycleOutcome::Failed(error)
    }
}

/// Await `future` unless `shutdown` fires first. Cancellation wins ties.
async fn cancellable<F: Future>(shutdown: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => None,
        output = future => Some(output),
    }
}
