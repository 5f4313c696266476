//! Logger initialization for the relayer binary.
//!
//! `RUST_LOG` takes precedence over the configured level.

use clap::ValueEnum;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line, for log aggregation systems.
    Json,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber was already installed.
pub fn init(level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => {
            let fmt_layer = fmt::layer().with_target(true).with_thread_ids(false);
            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer().json();
            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
    }
}
