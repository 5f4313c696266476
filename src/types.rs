use alloy::primitives::{Address, B256, U256};

/// A single decoded event argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    String(String),
    /// An indexed dynamic value, only available as its keccak hash.
    Topic(B256),
}

impl ArgValue {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Address(_) => "address",
            ArgValue::Uint(_) => "uint",
            ArgValue::String(_) => "string",
            ArgValue::Topic(_) => "topic",
        }
    }
}

/// A log as returned by an [`EventSource`](crate::EventSource), before validation.
///
/// Every field that may be absent on the wire is optional here; the
/// [`normalizer`](crate::normalizer) decides whether the event is usable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawLogEvent {
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub event_name: String,
    pub args: Vec<(String, ArgValue)>,
}

impl RawLogEvent {
    /// Look up an argument by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|(arg, _)| arg == name).map(|(_, value)| value)
    }
}
