//! loragate - LoRa serial receiver to HTTP backend gateway
//!
//! Opens the serial receiver, forwards every authenticated event to the
//! backend and exits on SIGINT/SIGTERM. The process exits non-zero only
//! when the configuration is unusable or the serial device cannot be
//! opened.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use loragate_gateway::{Gateway, GatewayConfig};
use loragate_hardware::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// loragate - LoRa to HTTP backend gateway
#[derive(Parser, Debug)]
#[command(name = "loragate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "loragate.toml")]
    config: PathBuf,

    /// Serial device path (overrides `serial.port`)
    #[arg(long)]
    port: Option<String>,

    /// Backend events URL (overrides `backend.url`)
    #[arg(long)]
    backend_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut config = GatewayConfig::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(url) = args.backend_url {
        config.backend.url = url;
    }
    config.validate()?;

    let mut gateway = Gateway::from_config(&config)?;
    if gateway.keys().is_empty() {
        warn!("No devices configured, every event will be dropped");
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    let serial = config.serial_config();
    info!(
        port = %serial.port,
        baud_rate = serial.baud_rate,
        version = env!("CARGO_PKG_VERSION"),
        "Starting loragate"
    );

    gateway
        .run(|| SerialTransport::open(&serial), cancel)
        .await
        .context("gateway failed")?;

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

#[cfg(unix)]
async fn shutdown_on_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to register signal handlers, falling back to Ctrl-C");
            cancel_on_ctrl_c(tokio::signal::ctrl_c(), &cancel).await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }

    cancel.cancel();
}

#[cfg(not(unix))]
async fn shutdown_on_signal(cancel: CancellationToken) {
    cancel_on_ctrl_c(tokio::signal::ctrl_c(), &cancel).await;
}

/// Cancel once `ctrl_c` fires.
///
/// If listening fails this never returns, so the gateway keeps running
/// instead of shutting down on a signal that never arrived.
async fn cancel_on_ctrl_c<F>(ctrl_c: F, cancel: &CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match ctrl_c.await {
        Ok(()) => {
            info!("Received Ctrl-C");
            cancel.cancel();
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_ctrl_c_cancels() {
        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(async { Ok(()) }, &cancel).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_c_listen_failure_keeps_running() {
        let cancel = CancellationToken::new();
        let failed = async { Err(std::io::Error::other("no signal driver")) };

        let waited =
            tokio::time::timeout(Duration::from_secs(60), cancel_on_ctrl_c(failed, &cancel)).await;

        assert!(waited.is_err());
        assert!(!cancel.is_cancelled());
    }
}
