use std::time::Duration;

use alloy::network::Network;
use tracing::{debug, info};

use crate::robust_provider::{IntoRootProvider, RobustProvider, provider::Error};

/// Default timeout used by `RobustProvider`
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for constructing a [`RobustProvider`].
pub struct RobustProviderBuilder<N: Network, P: IntoRootProvider<N>> {
    provider: P,
    call_timeout: Duration,
    _network: std::marker::PhantomData<N>,
}

impl<N: Network, P: IntoRootProvider<N>> RobustProviderBuilder<N, P> {
    /// Create a new builder with default settings.
    ///
    /// Any type implementing [`IntoRootProvider`] can be used.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider, call_timeout: DEFAULT_CALL_TIMEOUT, _network: std::marker::PhantomData }
    }

    /// Set the maximum timeout for RPC operations.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Build the `RobustProvider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to connect.
    pub async fn build(self) -> Result<RobustProvider<N>, Error> {
        debug!(call_timeout_ms = self.call_timeout.as_millis(), "Building RobustProvider");

        let primary_provider = self.provider.into_root_provider().await?;

        info!("RobustProvider initialized");

        Ok(RobustProvider { primary_provider, call_timeout: self.call_timeout })
    }
}
