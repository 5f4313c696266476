use alloy::{
    network::{Ethereum, Network},
    providers::RootProvider,
};

use crate::robust_provider::{RobustProvider, RobustProviderBuilder, provider::Error};

/// Conversion trait for types that can be turned into an Alloy [`RootProvider`].
///
/// Used by [`RobustProviderBuilder`] to accept both ready providers and connection strings.
pub trait IntoRootProvider<N: Network = Ethereum> {
    /// Convert `self` into a [`RootProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying provider cannot be constructed or connected.
    fn into_root_provider(self) -> impl Future<Output = Result<RootProvider<N>, Error>> + Send;
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self)
    }
}

impl<N: Network> IntoRootProvider<N> for &str {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(RootProvider::connect(self).await?)
    }
}

/// Conversion trait for types that can be turned into a [`RobustProvider`].
///
/// An existing [`RobustProvider`] is passed through unchanged so that its configured call timeout
/// survives the conversion. Everything else is wrapped with default settings.
pub trait IntoRobustProvider<N: Network = Ethereum> {
    /// Convert `self` into a [`RobustProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to connect.
    fn into_robust_provider(self) -> impl Future<Output = Result<RobustProvider<N>, Error>> + Send;
}

impl<N: Network> IntoRobustProvider<N> for RobustProvider<N> {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        Ok(self)
    }
}

impl<N: Network> IntoRobustProvider<N> for RootProvider<N> {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}

impl<N: Network> IntoRobustProvider<N> for &str {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use alloy::{providers::mock::Asserter, rpc::client::RpcClient};

    #[tokio::test]
    async fn robust_provider_keeps_its_call_timeout() -> anyhow::Result<()> {
        let root = RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()));
        let robust = RobustProviderBuilder::new(root)
            .call_timeout(Duration::from_millis(250))
            .build()
            .await?;

        let converted = robust.into_robust_provider().await?;

        assert_eq!(converted.call_timeout, Duration::from_millis(250));
        Ok(())
    }

    #[tokio::test]
    async fn root_provider_is_wrapped_with_defaults() -> anyhow::Result<()> {
        let root = RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()));

        let robust = root.into_robust_provider().await?;

        assert_eq!(robust.call_timeout, crate::robust_provider::DEFAULT_CALL_TIMEOUT);
        Ok(())
    }
}
