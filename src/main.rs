use std::{process::ExitCode, time::Duration};

use anyhow::Context;
use bridge_relayer::{
    OracleClient, RelayerConfig, RpcEventSource, ValidatedConfig, logging,
    robust_provider::{RobustProvider, RobustProviderBuilder},
};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long the scan loop gets to finish its in-flight work after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = RelayerConfig::parse();

    if let Err(e) = logging::init(&config.log_level, config.log_format) {
        eprintln!("failed to initialize logging: {e}");
    }

    let validated = match config.validate() {
        Ok(validated) => validated,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(validated).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Relayer failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ValidatedConfig) -> anyhow::Result<()> {
    let provider: RobustProvider = RobustProviderBuilder::new(config.rpc_url.as_str())
        .call_timeout(config.rpc_timeout)
        .build()
        .await
        .with_context(|| format!("failed to connect to {}", config.rpc_url))?;

    match provider.get_chain_id().await {
        Ok(chain_id) => info!(rpc_url = %config.rpc_url, chain_id, "Connected to source chain"),
        Err(e) => {
            warn!(rpc_url = %config.rpc_url, error = %e, "Could not read chain id, continuing");
        }
    }

    let source = RpcEventSource::builder(config.contract_address)
        .max_block_range(config.max_block_range)
        .connect(provider)
        .await?;
    let oracle = OracleClient::new(config.oracle.clone())?;

    info!(
        contract = %config.contract_address,
        oracle = %config.oracle.endpoint,
        polling_interval_secs = config.scanner.polling_interval.as_secs(),
        confirmation_delay = config.scanner.confirmation_delay,
        "Starting bridge relayer"
    );

    let scanner = config.scanner.build(source, oracle)?;
    let shutdown = CancellationToken::new();
    let mut handle = tokio::spawn(scanner.run(shutdown.clone()));

    tokio::select! {
        () = wait_for_signal() => {}
        result = &mut handle => {
            if let Err(e) = result {
                error!(error = ?e, "Scan loop terminated unexpectedly");
            }
            return Ok(());
        }
    }

    shutdown.cancel();
    wait_for_shutdown(&mut handle).await;
    info!("Bridge relayer stopped");
    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => log_ctrl_c(result),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler, listening for SIGINT only");
                log_ctrl_c(tokio::signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    log_ctrl_c(tokio::signal::ctrl_c().await);
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received SIGINT"),
        Err(e) => error!(error = %e, "Failed to listen for SIGINT, shutting down"),
    }
}

async fn wait_for_shutdown(handle: &mut JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = ?e, "Scan loop panicked during shutdown"),
        Err(_) => {
            warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Shutdown timeout reached, aborting scan loop"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}
