//! Delivery of normalized events to the oracle attestation API.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::DeliveryError,
    normalizer::{NormalizedEvent, TransferArgs},
};

mod oracle_client;

pub use oracle_client::{DEFAULT_DISPATCH_TIMEOUT, OracleClient, OracleClientConfig};

/// Acknowledgement returned by the oracle for an accepted attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
    /// Response body, when the oracle answered with JSON.
    pub body: Option<serde_json::Value>,
}

/// Delivers a single event. One call is one attempt; retries are not the dispatcher's concern.
pub trait Dispatch: Send + Sync {
    fn dispatch(
        &self,
        event: &NormalizedEvent,
    ) -> impl Future<Output = Result<Ack, DeliveryError>> + Send;
}

impl<T: Dispatch> Dispatch for Arc<T> {
    fn dispatch(
        &self,
        event: &NormalizedEvent,
    ) -> impl Future<Output = Result<Ack, DeliveryError>> + Send {
        self.as_ref().dispatch(event)
    }
}

/// Request body sent to the oracle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload<'a> {
    pub source_transaction_hash: &'a str,
    pub source_block_number: u64,
    pub payload: &'a TransferArgs,
}

impl<'a> From<&'a NormalizedEvent> for AttestationPayload<'a> {
    fn from(event: &'a NormalizedEvent) -> Self {
        Self {
            source_transaction_hash: &event.tx_hash,
            source_block_number: event.block_number,
            payload: &event.args,
        }
    }
}
