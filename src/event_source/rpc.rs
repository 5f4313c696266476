use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, Network},
    primitives::Address,
    rpc::types::Filter,
};
use tracing::{debug, error, info};

use crate::{
    abi::{decode_log, event_topic},
    error::{ScannerError, SourceError},
    event_source::{DEFAULT_MAX_BLOCK_RANGE, EventSource, RangeIterator},
    robust_provider::{
        Error as RobustProviderError, IntoRobustProvider, RobustProvider,
        provider::is_missing_block_error,
    },
    scanner::BlockRange,
    types::RawLogEvent,
};

/// Builder for [`RpcEventSource`].
#[derive(Debug, Clone)]
pub struct RpcEventSourceBuilder {
    contract_address: Address,
    max_block_range: u64,
}

impl RpcEventSourceBuilder {
    /// Sets the maximum number of blocks covered by a single `eth_getLogs` request.
    ///
    /// Larger ranges are split into consecutive queries.
    #[must_use]
    pub fn max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range;
        self
    }

    /// Connects to an existing provider.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The provider connection fails
    /// * The max block range is zero
    pub async fn connect<N: Network>(
        self,
        provider: impl IntoRobustProvider<N>,
    ) -> Result<RpcEventSource<N>, ScannerError> {
        if self.max_block_range == 0 {
            return Err(ScannerError::InvalidMaxBlockRange);
        }
        let provider = provider.into_robust_provider().await?;
        Ok(RpcEventSource {
            provider,
            contract_address: self.contract_address,
            max_block_range: self.max_block_range,
        })
    }
}

/// [`EventSource`] backed by a JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcEventSource<N: Network = Ethereum> {
    provider: RobustProvider<N>,
    contract_address: Address,
    max_block_range: u64,
}

impl RpcEventSource {
    /// Start building a source that watches `contract_address`.
    #[must_use]
    pub fn builder(contract_address: Address) -> RpcEventSourceBuilder {
        RpcEventSourceBuilder { contract_address, max_block_range: DEFAULT_MAX_BLOCK_RANGE }
    }
}

/// Translates provider errors, treating a missing block inside `range` as a reorg.
fn classify(error: RobustProviderError, range: BlockRange) -> SourceError {
    match error {
        RobustProviderError::RpcError(err) if is_missing_block_error(&err) => {
            SourceError::BlockNotFound(range.to.into())
        }
        other => other.into(),
    }
}

impl<N: Network> EventSource for RpcEventSource<N> {
    async fn current_head(&self) -> Result<u64, SourceError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn fetch_logs(
        &self,
        event_name: &str,
        range: BlockRange,
    ) -> Result<Vec<RawLogEvent>, SourceError> {
        let topic =
            event_topic(event_name).ok_or_else(|| SourceError::UnknownEvent(event_name.into()))?;

        // The node must still know the upper bound, otherwise the range was reorganized away.
        self.provider
            .get_block_by_number(BlockNumberOrTag::Number(range.to))
            .await
            .map_err(|e| classify(e, range))?;

        let base_filter = Filter::new().address(self.contract_address).event_signature(topic);
        let mut events = Vec::new();

        for chunk in RangeIterator::new(range, self.max_block_range) {
            let filter = base_filter.clone().from_block(chunk.from).to_block(chunk.to);
            match self.provider.get_logs(&filter).await {
                Ok(logs) => {
                    if !logs.is_empty() {
                        info!(
                            event = event_name,
                            log_count = logs.len(),
                            block_range = %chunk,
                            "found logs for event in block range"
                        );
                    }
                    events.extend(logs.iter().map(decode_log));
                }
                Err(e) => {
                    error!(
                        event = event_name,
                        error = %e,
                        block_range = %chunk,
                        "failed to get logs for block range"
                    );
                    return Err(classify(e, range));
                }
            }
        }

        debug!(block_range = %range, event_count = events.len(), "Fetched logs");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        abi::BRIDGE_TRANSFER_INITIATED,
        test_utils::{bridge_log, sample_transfer},
    };
    use alloy::{
        primitives::{B256, U64, address},
        providers::{RootProvider, mock::Asserter},
        rpc::{
            client::RpcClient,
            json_rpc::ErrorPayload,
            types::{Block as RpcBlock, Header, Log, Transaction},
        },
    };
    use serde_json::Value;

    const CONTRACT: Address = address!("0x1234567890123456789012345678901234567890");

    async fn mocked_source(asserter: &Asserter, max_block_range: u64) -> RpcEventSource {
        let root = RootProvider::<Ethereum>::new(RpcClient::mocked(asserter.clone()));
        RpcEventSource::builder(CONTRACT)
            .max_block_range(max_block_range)
            .connect(root)
            .await
            .expect("mocked provider connects")
    }

    fn mock_block(number: u64) -> RpcBlock<Transaction, Header> {
        let mut block: RpcBlock<Transaction, Header> = RpcBlock::default();
        block.header.number = number;
        block
    }

    #[tokio::test]
    async fn zero_max_block_range_is_rejected() {
        let root = RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()));

        let result = RpcEventSource::builder(CONTRACT).max_block_range(0).connect(root).await;

        assert!(matches!(result, Err(ScannerError::InvalidMaxBlockRange)));
    }

    #[tokio::test]
    async fn current_head_reads_block_number() -> anyhow::Result<()> {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(2_000));
        let source = mocked_source(&asserter, 100).await;

        assert_eq!(source.current_head().await?, 2_000);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_logs_decodes_bridge_events() -> anyhow::Result<()> {
        let asserter = Asserter::new();
        asserter.push_success(&mock_block(994));
        asserter.push_success(&vec![bridge_log(&sample_transfer(1), 990, B256::repeat_byte(1))]);
        let source = mocked_source(&asserter, 100).await;

        let events =
            source.fetch_logs(BRIDGE_TRANSFER_INITIATED, BlockRange::new(985, 994)).await?;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block_number, Some(990));
        assert_eq!(events[0].event_name, BRIDGE_TRANSFER_INITIATED);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_logs_queries_chunks_in_order() -> anyhow::Result<()> {
        let asserter = Asserter::new();
        asserter.push_success(&mock_block(29));
        asserter.push_success(&vec![bridge_log(&sample_transfer(1), 5, B256::repeat_byte(1))]);
        asserter.push_success(&Vec::<Log>::new());
        asserter.push_success(&vec![bridge_log(&sample_transfer(2), 25, B256::repeat_byte(2))]);
        let source = mocked_source(&asserter, 10).await;

        let events = source.fetch_logs(BRIDGE_TRANSFER_INITIATED, BlockRange::new(0, 29)).await?;

        let blocks: Vec<_> = events.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![Some(5), Some(25)]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_upper_block_is_reported_as_reorg() {
        let asserter = Asserter::new();
        asserter.push_success(&Value::Null);
        let source = mocked_source(&asserter, 100).await;

        let result = source.fetch_logs(BRIDGE_TRANSFER_INITIATED, BlockRange::new(491, 500)).await;

        assert!(matches!(result, Err(ref e) if e.is_reorg()));
    }

    #[tokio::test]
    async fn header_not_found_on_get_logs_is_reported_as_reorg() {
        let asserter = Asserter::new();
        asserter.push_success(&mock_block(500));
        asserter.push_failure(ErrorPayload::internal_error_message("header not found".into()));
        let source = mocked_source(&asserter, 100).await;

        let result = source.fetch_logs(BRIDGE_TRANSFER_INITIATED, BlockRange::new(491, 500)).await;

        assert!(matches!(result, Err(SourceError::BlockNotFound(_))));
    }

    #[tokio::test]
    async fn other_rpc_errors_are_connectivity_errors() {
        let asserter = Asserter::new();
        asserter.push_success(&mock_block(500));
        asserter.push_failure(ErrorPayload::internal_error_message("rate limited".into()));
        let source = mocked_source(&asserter, 100).await;

        let result = source.fetch_logs(BRIDGE_TRANSFER_INITIATED, BlockRange::new(491, 500)).await;

        assert!(matches!(result, Err(SourceError::Rpc(_))));
    }

    #[tokio::test]
    async fn unknown_event_is_rejected_before_any_call() {
        let asserter = Asserter::new();
        let source = mocked_source(&asserter, 100).await;

        let result = source.fetch_logs("Transfer", BlockRange::new(1, 2)).await;

        assert!(matches!(result, Err(SourceError::UnknownEvent(name)) if name == "Transfer"));
    }
}
