//! Bridge relayer: forwards confirmed `BridgeTransferInitiated` events from an EVM chain to an
//! oracle attestation API.
//!
//! The main entry point is [`BridgeScanner`], built via [`BridgeScannerBuilder`] from an
//! [`EventSource`] and a [`Dispatch`] implementation. The binary wires it to an
//! [`RpcEventSource`] and an [`OracleClient`].
//!
//! # Pipeline
//!
//! Each polling cycle queries the chain head, computes the next confirmed [`BlockRange`] with the
//! [`ScanCursor`], fetches the bridge logs in that range, [`normalize`]s every log and delivers
//! the result to the oracle. The cursor is committed once every event of the range was handled.
//!
//! # Delivery guarantees
//!
//! Delivery is at-least-once. Events are never retried individually, but a reorg rolls the
//! cursor back by a fixed number of blocks and the events in that window are delivered again.
//! The oracle is expected to de-duplicate on the transfer `nonce`.
//!
//! # Failure handling
//!
//! - A malformed log is dropped and logged.
//! - A refused or failed delivery is logged; the cursor still advances.
//! - A missing block is treated as a reorg and rolls the cursor back.
//! - Any other source error backs off for two polling intervals and retries the same range.
//!
//! Only configuration errors stop the process.

pub mod abi;
pub mod config;
pub mod dispatcher;
pub mod event_source;
pub mod logging;
pub mod normalizer;
pub mod robust_provider;
pub mod scanner;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
mod types;

pub use error::{ConfigError, DeliveryError, MalformedEventError, ScannerError, SourceError};
pub use types::{ArgValue, RawLogEvent};

pub use config::{RelayerConfig, ValidatedConfig};
pub use dispatcher::{Ack, AttestationPayload, Dispatch, OracleClient, OracleClientConfig};
pub use event_source::{EventSource, RpcEventSource, RpcEventSourceBuilder};
pub use normalizer::{NormalizedEvent, TransferArgs, normalize};
pub use scanner::{
    BlockRange, BridgeScanner, BridgeScannerBuilder, CycleOutcome, CycleReport,
    DEFAULT_CONFIRMATION_DELAY, DEFAULT_POLLING_INTERVAL, ScanCursor, ScanState,
};
