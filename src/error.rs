use std::sync::Arc;

use alloy::{
    eips::BlockId,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::robust_provider::provider::Error as RobustProviderError;

/// Errors returned by an [`EventSource`](crate::EventSource).
///
/// [`SourceError::BlockNotFound`] is a chain-state error and signals a reorganization; every
/// other variant is a connectivity problem with the node.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    /// A timeout elapsed while waiting for an RPC response.
    #[error("Operation timed out")]
    Timeout,

    /// A block inside the requested range is no longer known to the node.
    #[error("Block not found, Block Id: {0}")]
    BlockNotFound(BlockId),

    /// The source does not know how to filter for the requested event.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

impl SourceError {
    /// Returns `true` if the error signals a chain reorganization rather than an outage.
    #[must_use]
    pub fn is_reorg(&self) -> bool {
        matches!(self, SourceError::BlockNotFound(_))
    }
}

impl From<RobustProviderError> for SourceError {
    fn from(error: RobustProviderError) -> SourceError {
        match error {
            RobustProviderError::Timeout => SourceError::Timeout,
            RobustProviderError::RpcError(err) => SourceError::Rpc(err),
            RobustProviderError::BlockNotFound(block) => SourceError::BlockNotFound(block),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for SourceError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        SourceError::Rpc(Arc::new(error))
    }
}

impl From<Elapsed> for SourceError {
    fn from(_: Elapsed) -> Self {
        SourceError::Timeout
    }
}

/// A raw log could not be turned into a [`NormalizedEvent`](crate::NormalizedEvent).
///
/// Malformed data will not become valid on retry, so the event is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEventError {
    #[error("log has no transaction hash")]
    MissingTransactionHash,

    #[error("log has no block number")]
    MissingBlockNumber,

    #[error("missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("argument `{name}` has the wrong shape: expected {expected}, got {found}")]
    WrongShape { name: &'static str, expected: &'static str, found: &'static str },
}

/// Failure to deliver a single attestation to the oracle API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The oracle rejected the request (4xx, or any other non-2xx that is not a 5xx).
    #[error("oracle rejected attestation with status {status}: {body}")]
    ClientError { status: u16, body: String },

    /// The oracle failed to process the request (5xx).
    #[error("oracle failed with status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("attestation request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Connection(error.to_string())
        }
    }
}

/// Errors raised while building a scanner or its event source.
#[derive(Error, Debug, Clone)]
pub enum ScannerError {
    /// The polling interval must be greater than zero.
    #[error("Polling interval must be greater than 0")]
    InvalidPollingInterval,

    /// The configured dispatch concurrency must be greater than zero.
    #[error("Dispatch concurrency must be greater than 0")]
    InvalidDispatchConcurrency,

    /// The configured maximum block range per log query must be greater than zero.
    #[error("Max block range must be greater than 0")]
    InvalidMaxBlockRange,

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl From<RobustProviderError> for ScannerError {
    fn from(error: RobustProviderError) -> ScannerError {
        ScannerError::Source(error.into())
    }
}

/// Fatal startup errors; the process does not start when one is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid SOURCE_CHAIN_RPC_URL provided: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid BRIDGE_CONTRACT_ADDRESS provided: {0}")]
    InvalidContractAddress(String),

    #[error("Invalid DESTINATION_ORACLE_API provided: {0}")]
    InvalidOracleUrl(String),

    #[error("Invalid ORACLE_API_KEY provided: key is not a valid header value")]
    InvalidApiKey,

    #[error("{0} must be greater than 0")]
    NonPositive(&'static str),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
