//! Contract ABI of the bridge and a lenient decoder for its logs.

use alloy::{
    primitives::{Address, B256},
    rpc::types::Log,
    sol,
    sol_types::{SolEvent, SolType, sol_data},
};
use tracing::debug;

use crate::types::{ArgValue, RawLogEvent};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    event BridgeTransferInitiated(
        address indexed sender,
        string indexed destinationChain,
        address indexed recipient,
        address token,
        uint256 amount,
        uint256 nonce
    );
}

/// Name of the only event the relayer forwards.
pub const BRIDGE_TRANSFER_INITIATED: &str = "BridgeTransferInitiated";

type TransferData = (sol_data::Address, sol_data::Uint<256>, sol_data::Uint<256>);

/// Returns topic0 for a known event name.
#[must_use]
pub fn event_topic(event_name: &str) -> Option<B256> {
    (event_name == BRIDGE_TRANSFER_INITIATED).then_some(BridgeTransferInitiated::SIGNATURE_HASH)
}

/// Decode a bridge log into a [`RawLogEvent`] without rejecting it.
///
/// Indexed fields come from topics 1..=3, the rest from the data section. Any field that is
/// missing or does not decode is left out of `args`.
#[must_use]
pub fn decode_log(log: &Log) -> RawLogEvent {
    let topics = log.inner.data.topics();
    let mut event = RawLogEvent {
        tx_hash: log.transaction_hash,
        block_number: log.block_number,
        event_name: String::new(),
        args: Vec::with_capacity(6),
    };

    if topics.first() != Some(&BridgeTransferInitiated::SIGNATURE_HASH) {
        debug!(tx_hash = ?log.transaction_hash, "Log does not carry the bridge event signature");
        return event;
    }
    event.event_name = BRIDGE_TRANSFER_INITIATED.to_owned();

    if let Some(sender) = topics.get(1).and_then(topic_address) {
        event.args.push(("sender".into(), ArgValue::Address(sender)));
    }
    if let Some(chain) = topics.get(2) {
        event.args.push(("destinationChain".into(), ArgValue::Topic(*chain)));
    }
    if let Some(recipient) = topics.get(3).and_then(topic_address) {
        event.args.push(("recipient".into(), ArgValue::Address(recipient)));
    }

    match TransferData::abi_decode_params(&log.inner.data.data) {
        Ok((token, amount, nonce)) => {
            event.args.push(("token".into(), ArgValue::Address(token)));
            event.args.push(("amount".into(), ArgValue::Uint(amount)));
            event.args.push(("nonce".into(), ArgValue::Uint(nonce)));
        }
        Err(e) => {
            debug!(error = %e, tx_hash = ?log.transaction_hash, "Failed to decode log data");
        }
    }

    event
}

/// An address topic is left-padded with 12 zero bytes.
fn topic_address(topic: &B256) -> Option<Address> {
    topic[..12].iter().all(|b| *b == 0).then(|| Address::from_word(*topic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bridge_log, sample_transfer};
    use alloy::primitives::{Bytes, LogData, U256, address, keccak256};

    #[test]
    fn signature_matches_contract_declaration() {
        assert_eq!(
            BridgeTransferInitiated::SIGNATURE,
            "BridgeTransferInitiated(address,string,address,address,uint256,uint256)"
        );
        assert_eq!(
            event_topic(BRIDGE_TRANSFER_INITIATED),
            Some(keccak256(BridgeTransferInitiated::SIGNATURE))
        );
        assert_eq!(event_topic("Transfer"), None);
    }

    #[test]
    fn decodes_well_formed_log() {
        let transfer = sample_transfer(7);
        let log = bridge_log(&transfer, 120, B256::repeat_byte(0xab));

        let event = decode_log(&log);

        assert_eq!(event.event_name, BRIDGE_TRANSFER_INITIATED);
        assert_eq!(event.block_number, Some(120));
        assert_eq!(event.tx_hash, Some(B256::repeat_byte(0xab)));
        assert_eq!(event.arg("sender"), Some(&ArgValue::Address(transfer.sender)));
        assert_eq!(event.arg("recipient"), Some(&ArgValue::Address(transfer.recipient)));
        assert_eq!(
            event.arg("destinationChain"),
            Some(&ArgValue::Topic(transfer.destinationChain))
        );
        assert_eq!(event.arg("token"), Some(&ArgValue::Address(transfer.token)));
        assert_eq!(event.arg("amount"), Some(&ArgValue::Uint(transfer.amount)));
        assert_eq!(event.arg("nonce"), Some(&ArgValue::Uint(U256::from(7))));
    }

    #[test]
    fn truncated_data_leaves_fields_out() {
        let transfer = sample_transfer(1);
        let mut log = bridge_log(&transfer, 1, B256::ZERO);
        let topics = log.inner.data.topics().to_vec();
        log.inner.data = LogData::new_unchecked(topics, Bytes::from(vec![0u8; 20]));

        let event = decode_log(&log);

        assert_eq!(event.event_name, BRIDGE_TRANSFER_INITIATED);
        assert!(event.arg("sender").is_some());
        assert!(event.arg("token").is_none());
        assert!(event.arg("amount").is_none());
        assert!(event.arg("nonce").is_none());
    }

    #[test]
    fn foreign_signature_yields_no_args() {
        let transfer = sample_transfer(1);
        let mut log = bridge_log(&transfer, 1, B256::ZERO);
        let data = log.inner.data.data.clone();
        log.inner.data = LogData::new_unchecked(vec![B256::repeat_byte(1)], data);

        let event = decode_log(&log);

        assert!(event.event_name.is_empty());
        assert!(event.args.is_empty());
    }

    #[test]
    fn dirty_address_topic_is_rejected() {
        let mut topic = address!("0x00000000000000000000000000000000000000aa").into_word();
        topic.0[0] = 1;

        assert_eq!(topic_address(&topic), None);
    }
}
