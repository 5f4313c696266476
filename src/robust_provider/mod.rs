//! Timeout-bounded wrapper around Alloy providers.
//!
//! [`RobustProvider`] wraps an Alloy [`RootProvider`](alloy::providers::RootProvider) and adds:
//! * a bounded per-call timeout
//! * uniform error classification (timeout, RPC failure, missing block)
//!
//! It intentionally performs no retries. Retry and backoff belong to the scan loop, which decides
//! between waiting, backing off and rolling back based on the error it receives.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bridge_relayer::robust_provider::{RobustProvider, RobustProviderBuilder};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let robust: RobustProvider = RobustProviderBuilder::new("http://localhost:8545")
//!     .call_timeout(Duration::from_secs(30))
//!     .build()
//!     .await?;
//!
//! let block_number = robust.get_block_number().await?;
//! println!("Current block: {block_number}");
//! # Ok(()) }
//! ```

pub mod builder;
pub mod provider;
pub mod provider_conversion;

pub use builder::*;
pub use provider::{Error, RobustProvider};
pub use provider_conversion::{IntoRobustProvider, IntoRootProvider};
