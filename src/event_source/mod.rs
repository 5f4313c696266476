//! Read access to the source chain.
//!
//! The scan loop only depends on the [`EventSource`] trait. [`RpcEventSource`] implements it over
//! a [`RobustProvider`](crate::robust_provider::RobustProvider); tests substitute an in-memory
//! source.

use std::sync::Arc;

use crate::{error::SourceError, scanner::BlockRange, types::RawLogEvent};

mod range_iterator;
mod rpc;

pub use range_iterator::{DEFAULT_MAX_BLOCK_RANGE, RangeIterator};
pub use rpc::{RpcEventSource, RpcEventSourceBuilder};

/// A chain that can report its head and return confirmed logs.
///
/// Implementations must not retry internally; the scan loop owns retry policy. A block that the
/// node no longer knows about must be reported as [`SourceError::BlockNotFound`], not as a
/// connectivity error, since the loop treats it as a reorg.
pub trait EventSource: Send + Sync {
    /// Current chain head height.
    fn current_head(&self) -> impl Future<Output = Result<u64, SourceError>> + Send;

    /// All logs of `event_name` emitted in `range`, in chain order.
    fn fetch_logs(
        &self,
        event_name: &str,
        range: BlockRange,
    ) -> impl Future<Output = Result<Vec<RawLogEvent>, SourceError>> + Send;
}

impl<T: EventSource> EventSource for Arc<T> {
    fn current_head(&self) -> impl Future<Output = Result<u64, SourceError>> + Send {
        self.as_ref().current_head()
    }

    fn fetch_logs(
        &self,
        event_name: &str,
        range: BlockRange,
    ) -> impl Future<Output = Result<Vec<RawLogEvent>, SourceError>> + Send {
        self.as_ref().fetch_logs(event_name, range)
    }
}
