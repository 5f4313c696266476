//! In-memory collaborators and fixtures for exercising the scan loop without a node or an oracle.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alloy::{
    primitives::{Address, B256, U256, address, keccak256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use tokio::time::{Instant, sleep};

use crate::{
    Dispatch, EventSource,
    abi::{BRIDGE_TRANSFER_INITIATED, BridgeTransferInitiated},
    dispatcher::Ack,
    error::{DeliveryError, SourceError},
    normalizer::NormalizedEvent,
    scanner::BlockRange,
    types::{ArgValue, RawLogEvent},
};

pub const BRIDGE_CONTRACT: Address = address!("0x1234567890123456789012345678901234567890");
pub const SENDER: Address = address!("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
pub const RECIPIENT: Address = address!("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
pub const TOKEN: Address = address!("0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB");
pub const TRANSFER_AMOUNT: u64 = 1_000_000_000_000_000_000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct SourceState {
    head: u64,
    head_errors: VecDeque<SourceError>,
    fetch_results: VecDeque<Result<Vec<RawLogEvent>, SourceError>>,
    head_calls: Vec<Instant>,
    fetched_ranges: Vec<BlockRange>,
}

/// Scriptable [`EventSource`].
///
/// The head is sticky and returned by every call unless an error is queued. Log fetches pop
/// queued results in order and return no logs once the queue is empty.
#[derive(Debug, Default)]
pub struct MockEventSource {
    state: Mutex<SourceState>,
}

impl MockEventSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_head(self, head: u64) -> Self {
        self.set_head(head);
        self
    }

    pub fn set_head(&self, head: u64) {
        lock(&self.state).head = head;
    }

    pub fn push_head_error(&self, error: SourceError) {
        lock(&self.state).head_errors.push_back(error);
    }

    pub fn push_logs(&self, logs: Vec<RawLogEvent>) {
        lock(&self.state).fetch_results.push_back(Ok(logs));
    }

    pub fn push_fetch_error(&self, error: SourceError) {
        lock(&self.state).fetch_results.push_back(Err(error));
    }

    /// Number of head queries served so far.
    #[must_use]
    pub fn head_calls(&self) -> usize {
        lock(&self.state).head_calls.len()
    }

    /// When each head query happened, on the tokio clock.
    #[must_use]
    pub fn head_call_times(&self) -> Vec<Instant> {
        lock(&self.state).head_calls.clone()
    }

    #[must_use]
    pub fn fetched_ranges(&self) -> Vec<BlockRange> {
        lock(&self.state).fetched_ranges.clone()
    }
}

impl EventSource for MockEventSource {
    async fn current_head(&self) -> Result<u64, SourceError> {
        let mut state = lock(&self.state);
        state.head_calls.push(Instant::now());
        match state.head_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(state.head),
        }
    }

    async fn fetch_logs(
        &self,
        _event_name: &str,
        range: BlockRange,
    ) -> Result<Vec<RawLogEvent>, SourceError> {
        let mut state = lock(&self.state);
        state.fetched_ranges.push(range);
        state.fetch_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// [`Dispatch`] implementation that records every event it is handed.
///
/// Queued responses are returned in order; once exhausted every delivery succeeds with 200.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    responses: Mutex<VecDeque<Result<Ack, DeliveryError>>>,
    delivered: Mutex<Vec<NormalizedEvent>>,
    delay: Option<Duration>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery take `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: Result<Ack, DeliveryError>) {
        lock(&self.responses).push_back(response);
    }

    /// Events handed to the dispatcher whose delivery completed, in completion order.
    #[must_use]
    pub fn delivered(&self) -> Vec<NormalizedEvent> {
        lock(&self.delivered).clone()
    }
}

impl Dispatch for RecordingDispatcher {
    async fn dispatch(&self, event: &NormalizedEvent) -> Result<Ack, DeliveryError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        lock(&self.delivered).push(event.clone());
        lock(&self.responses).pop_front().unwrap_or(Ok(Ack { status: 200, body: None }))
    }
}

/// A well-formed bridge transfer as an [`EventSource`] would report it.
#[must_use]
pub fn transfer_event(nonce: u64, block_number: u64) -> RawLogEvent {
    RawLogEvent {
        tx_hash: Some(keccak256(nonce.to_be_bytes())),
        block_number: Some(block_number),
        event_name: BRIDGE_TRANSFER_INITIATED.to_owned(),
        args: vec![
            ("sender".into(), ArgValue::Address(SENDER)),
            ("destinationChain".into(), ArgValue::String("polygon".into())),
            ("recipient".into(), ArgValue::Address(RECIPIENT)),
            ("token".into(), ArgValue::Address(TOKEN)),
            ("amount".into(), ArgValue::Uint(U256::from(TRANSFER_AMOUNT))),
            ("nonce".into(), ArgValue::Uint(U256::from(nonce))),
        ],
    }
}

/// A bridge transfer from a pending log, which has no transaction hash.
#[must_use]
pub fn malformed_event(block_number: u64) -> RawLogEvent {
    RawLogEvent { tx_hash: None, ..transfer_event(0, block_number) }
}

/// The on-chain event matching [`transfer_event`].
#[must_use]
pub fn sample_transfer(nonce: u64) -> BridgeTransferInitiated {
    BridgeTransferInitiated {
        sender: SENDER,
        destinationChain: keccak256("polygon"),
        recipient: RECIPIENT,
        token: TOKEN,
        amount: U256::from(TRANSFER_AMOUNT),
        nonce: U256::from(nonce),
    }
}

/// Wrap an encoded bridge event in an RPC log emitted by [`BRIDGE_CONTRACT`].
#[must_use]
pub fn bridge_log(event: &BridgeTransferInitiated, block_number: u64, tx_hash: B256) -> Log {
    Log {
        inner: alloy::primitives::Log { address: BRIDGE_CONTRACT, data: event.encode_log_data() },
        block_number: Some(block_number),
        transaction_hash: Some(tx_hash),
        ..Default::default()
    }
}
