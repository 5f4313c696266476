//! Runtime configuration, read from the command line or the environment.
//!
//! Every option has an environment variable so the relayer can be configured entirely from a
//! `.env` file. [`RelayerConfig::validate`] turns the raw strings into typed values and rejects
//! anything the relayer cannot run with.

use std::{fmt, time::Duration};

use alloy::primitives::Address;
use clap::Parser;
use reqwest::Url;

use crate::{
    dispatcher::OracleClientConfig, error::ConfigError, logging::LogFormat,
    scanner::BridgeScannerBuilder,
};

#[derive(Clone, Parser)]
#[command(name = "bridge-relayer", version, about, args_override_self = true)]
pub struct RelayerConfig {
    /// JSON-RPC endpoint of the source chain (http, https, ws or wss).
    #[arg(long, env = "SOURCE_CHAIN_RPC_URL", default_value = "https://rpc.sepolia.org")]
    pub rpc_url: String,

    /// Address of the bridge contract emitting `BridgeTransferInitiated`.
    #[arg(
        long,
        env = "BRIDGE_CONTRACT_ADDRESS",
        default_value = "0x1234567890123456789012345678901234567890"
    )]
    pub contract_address: String,

    /// Attestation endpoint of the destination oracle.
    #[arg(
        long,
        env = "DESTINATION_ORACLE_API",
        default_value = "https://api.destination-chain.com/attest"
    )]
    pub oracle_api_url: String,

    /// Bearer token sent to the oracle.
    #[arg(
        long,
        env = "ORACLE_API_KEY",
        default_value = "your-secret-api-key",
        hide_env_values = true
    )]
    pub oracle_api_key: String,

    #[arg(long, env = "POLLING_INTERVAL_SECONDS", default_value_t = 15)]
    pub polling_interval_secs: u64,

    /// Blocks a log must be buried under before it is relayed.
    #[arg(long, env = "BLOCK_CONFIRMATION_DELAY", default_value_t = 6)]
    pub confirmation_delay: u64,

    /// How far below the confirmed tip the first scan starts.
    #[arg(long, env = "LOOKBACK_BLOCKS", default_value_t = 10)]
    pub lookback_blocks: u64,

    /// How far the scan cursor steps back when a reorg is detected.
    #[arg(long, env = "REORG_ROLLBACK_BLOCKS", default_value_t = 10)]
    pub reorg_rollback_blocks: u64,

    /// Maximum number of blocks covered by a single `eth_getLogs` request.
    #[arg(long, env = "MAX_BLOCK_RANGE", default_value_t = 10_000)]
    pub max_block_range: u64,

    /// Attestations delivered concurrently within one cycle.
    #[arg(long, env = "DISPATCH_CONCURRENCY", default_value_t = 4)]
    pub dispatch_concurrency: usize,

    #[arg(long, env = "DISPATCH_TIMEOUT_SECONDS", default_value_t = 10)]
    pub dispatch_timeout_secs: u64,

    #[arg(long, env = "RPC_TIMEOUT_SECONDS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl fmt::Debug for RelayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("oracle_api_url", &self.oracle_api_url)
            .field("oracle_api_key", &"<redacted>")
            .field("polling_interval_secs", &self.polling_interval_secs)
            .field("confirmation_delay", &self.confirmation_delay)
            .field("lookback_blocks", &self.lookback_blocks)
            .field("reorg_rollback_blocks", &self.reorg_rollback_blocks)
            .field("max_block_range", &self.max_block_range)
            .field("dispatch_concurrency", &self.dispatch_concurrency)
            .field("dispatch_timeout_secs", &self.dispatch_timeout_secs)
            .field("rpc_timeout_secs", &self.rpc_timeout_secs)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Configuration after validation, with every value in its final type.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub rpc_url: Url,
    pub contract_address: Address,
    pub rpc_timeout: Duration,
    pub max_block_range: u64,
    pub scanner: BridgeScannerBuilder,
    pub oracle: OracleClientConfig,
}

impl RelayerConfig {
    /// Check every option and convert it to its typed form.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let rpc_url = parse_rpc_url(&self.rpc_url)?;
        let contract_address = parse_contract_address(&self.contract_address)?;
        let oracle_url = parse_oracle_url(&self.oracle_api_url)?;

        let polling_interval = positive("POLLING_INTERVAL_SECONDS", self.polling_interval_secs)?;
        let max_block_range = positive("MAX_BLOCK_RANGE", self.max_block_range)?;
        let dispatch_timeout = positive("DISPATCH_TIMEOUT_SECONDS", self.dispatch_timeout_secs)?;
        let rpc_timeout = positive("RPC_TIMEOUT_SECONDS", self.rpc_timeout_secs)?;
        if self.dispatch_concurrency == 0 {
            return Err(ConfigError::NonPositive("DISPATCH_CONCURRENCY"));
        }

        let scanner = BridgeScannerBuilder::new()
            .polling_interval(Duration::from_secs(polling_interval))
            .confirmation_delay(self.confirmation_delay)
            .lookback_blocks(self.lookback_blocks)
            .reorg_rollback_blocks(self.reorg_rollback_blocks)
            .dispatch_concurrency(self.dispatch_concurrency);

        Ok(ValidatedConfig {
            rpc_url,
            contract_address,
            rpc_timeout: Duration::from_secs(rpc_timeout),
            max_block_range,
            scanner,
            oracle: OracleClientConfig {
                endpoint: oracle_url,
                api_key: self.oracle_api_key.clone(),
                timeout: Duration::from_secs(dispatch_timeout),
            },
        })
    }
}

fn positive(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 { Err(ConfigError::NonPositive(name)) } else { Ok(value) }
}

fn parse_rpc_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidRpcUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(url),
        scheme => Err(ConfigError::InvalidRpcUrl(format!("{raw}: unsupported scheme `{scheme}`"))),
    }
}

fn parse_oracle_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidOracleUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => {
            Err(ConfigError::InvalidOracleUrl(format!("{raw}: unsupported scheme `{scheme}`")))
        }
    }
}

/// Mixed-case input must carry a valid EIP-55 checksum; all-lower or all-upper input is accepted.
fn parse_contract_address(raw: &str) -> Result<Address, ConfigError> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    let mixed_case =
        hex.chars().any(|c| c.is_ascii_lowercase()) && hex.chars().any(|c| c.is_ascii_uppercase());

    let parsed = if mixed_case {
        Address::parse_checksummed(raw, None).map_err(|e| e.to_string())
    } else {
        raw.parse::<Address>().map_err(|e| e.to_string())
    };
    parsed.map_err(|e| ConfigError::InvalidContractAddress(format!("{raw}: {e}")))
}
