//! Conversion of raw logs into the canonical record delivered to the oracle.

use alloy::primitives::{Address, U256, hex};
use serde::{Serialize, Serializer};

use crate::{
    error::MalformedEventError,
    types::{ArgValue, RawLogEvent},
};

/// A validated bridge transfer, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub tx_hash: String,
    pub block_number: u64,
    pub event_name: String,
    pub args: TransferArgs,
}

/// Arguments of `BridgeTransferInitiated`.
///
/// Addresses are EIP-55 checksummed. `nonce` is the key the oracle de-duplicates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferArgs {
    pub sender: String,
    pub destination_chain: String,
    pub recipient: String,
    pub token: String,
    #[serde(serialize_with = "serialize_uint")]
    pub amount: U256,
    #[serde(serialize_with = "serialize_uint")]
    pub nonce: U256,
}

/// JSON number when the value fits in 128 bits, decimal string otherwise.
fn serialize_uint<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    match u128::try_from(*value) {
        Ok(small) => serializer.serialize_u128(small),
        Err(_) => serializer.serialize_str(&value.to_string()),
    }
}

/// Validate a [`RawLogEvent`] and project it into a [`NormalizedEvent`].
///
/// The function is pure: the same input always produces the same output.
pub fn normalize(raw: &RawLogEvent) -> Result<NormalizedEvent, MalformedEventError> {
    let tx_hash = raw.tx_hash.ok_or(MalformedEventError::MissingTransactionHash)?;
    let block_number = raw.block_number.ok_or(MalformedEventError::MissingBlockNumber)?;

    let args = TransferArgs {
        sender: address_arg(raw, "sender")?.to_checksum(None),
        destination_chain: chain_arg(raw, "destinationChain")?,
        recipient: address_arg(raw, "recipient")?.to_checksum(None),
        token: address_arg(raw, "token")?.to_checksum(None),
        amount: uint_arg(raw, "amount")?,
        nonce: uint_arg(raw, "nonce")?,
    };

    Ok(NormalizedEvent {
        tx_hash: hex::encode_prefixed(tx_hash),
        block_number,
        event_name: raw.event_name.clone(),
        args,
    })
}

fn required<'a>(
    raw: &'a RawLogEvent,
    name: &'static str,
) -> Result<&'a ArgValue, MalformedEventError> {
    raw.arg(name).ok_or(MalformedEventError::MissingArgument(name))
}

fn address_arg(raw: &RawLogEvent, name: &'static str) -> Result<Address, MalformedEventError> {
    match required(raw, name)? {
        ArgValue::Address(address) => Ok(*address),
        other => {
            Err(MalformedEventError::WrongShape { name, expected: "address", found: other.kind() })
        }
    }
}

fn uint_arg(raw: &RawLogEvent, name: &'static str) -> Result<U256, MalformedEventError> {
    match required(raw, name)? {
        ArgValue::Uint(value) => Ok(*value),
        other => {
            Err(MalformedEventError::WrongShape { name, expected: "uint", found: other.kind() })
        }
    }
}

// Indexed strings only reach us as their keccak hash.
fn chain_arg(raw: &RawLogEvent, name: &'static str) -> Result<String, MalformedEventError> {
    match required(raw, name)? {
        ArgValue::String(chain) => Ok(chain.clone()),
        ArgValue::Topic(hash) => Ok(hex::encode_prefixed(hash)),
        other => Err(MalformedEventError::WrongShape {
            name,
            expected: "string or topic",
            found: other.kind(),
        }),
    }
}
