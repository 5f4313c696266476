use std::{sync::Arc, time::Duration};

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    network::{Ethereum, Network},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, error};

/// Node error messages that mean "the block you referenced does not exist (anymore)".
const MISSING_BLOCK_PATTERNS: [&str; 3] = ["header not found", "unknown block", "block not found"];

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Operation timed out")]
    Timeout,
    #[error("RPC call failed: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
    #[error("Block not found, Block Id: {0}")]
    BlockNotFound(BlockId),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::RpcError(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}

/// Returns `true` if the node answered with an error reporting a missing block or header.
#[must_use]
pub fn is_missing_block_error(err: &RpcError<TransportErrorKind>) -> bool {
    match err {
        RpcError::ErrorResp(payload) => {
            let message = payload.message.to_lowercase();
            MISSING_BLOCK_PATTERNS.iter().any(|pattern| message.contains(pattern))
        }
        _ => false,
    }
}

/// Provider wrapper with a bounded timeout on every call.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) call_timeout: Duration,
}

impl<N: Network> RobustProvider<N> {
    /// Fetch a block by [`BlockNumberOrTag`].
    ///
    /// A `null` answer from the node is reported as [`Error::BlockNotFound`].
    pub async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<N::BlockResponse, Error> {
        debug!(block = %number, "eth_getBlockByNumber called");
        let result = self
            .try_operation(move |provider| async move {
                provider.get_block_by_number(number).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getBlockByNumber failed");
        }

        result?.ok_or_else(|| Error::BlockNotFound(number.into()))
    }

    /// Fetch the latest block number.
    pub async fn get_block_number(&self) -> Result<u64, Error> {
        debug!("eth_blockNumber called");
        let result = self
            .try_operation(move |provider| async move { provider.get_block_number().await })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_blockNumber failed");
        }
        result
    }

    /// Fetch the chain id of the connected node.
    pub async fn get_chain_id(&self) -> Result<u64, Error> {
        debug!("eth_chainId called");
        let result = self
            .try_operation(move |provider| async move { provider.get_chain_id().await })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_chainId failed");
        }
        result
    }

    /// Fetch logs for the given [`Filter`].
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        debug!("eth_getLogs called");
        let result = self
            .try_operation(move |provider| async move { provider.get_logs(filter).await })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }

    /// Execute `operation` once, bounded by `call_timeout`.
    pub(crate) async fn try_operation<T, F, Fut>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        timeout(self.call_timeout, operation(self.primary_provider.clone()))
            .await
            .map_err(Error::from)?
            .map_err(Error::from)
    }
}
