use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use saphid::config::{Config, LoggingConfig, format_diagnostics};
use saphid::device::{DeviceClient, HttpTransport, PingProber, UdpWaker};
use saphid::tv::{DeviceState, Poller, Television, WatchPublisher};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Control daemon for a networked television
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config files, merged in order (earlier files win)
    #[arg(default_value = "saphid.toml")]
    config: Vec<PathBuf>,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = logging
        .overrides
        .iter()
        .fold(
            Targets::new().with_default(LevelFilter::from(logging.level)),
            |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
        );

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, diagnostics) = Config::from_files(&args.config)?;

    init_logging(&config.logging);

    tracing::info!("saphid starting");
    if !diagnostics.is_empty() {
        tracing::warn!("Config warnings:\n{}", format_diagnostics(&diagnostics));
    }

    let tv_config = config.tv;
    tracing::info!(
        "Controlling '{}' at {}",
        tv_config.name,
        tv_config.base_url()
    );

    let transport = HttpTransport::new(tv_config.base_url(), tv_config.timeout)
        .context("Failed to set up device transport")?;
    let (publisher, published) = WatchPublisher::channel();

    let tv = Arc::new(Television::new(
        tv_config,
        DeviceClient::new(Arc::new(transport)),
        Arc::new(UdpWaker::default()),
        Arc::new(PingProber),
        Arc::new(DeviceState::default()),
        Arc::new(publisher),
    ));

    let poller = Poller::new(tv.clone()).spawn();

    let api = if config.api.enabled {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let listen = config.api.listen.clone();
        let port = config.api.port;
        let hooks = tv.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = saphid::api::serve(listen, port, hooks, published, shutdown_rx).await {
                tracing::error!("HTTP API server failed: {:#}", e);
            }
        });
        Some((shutdown_tx, task))
    } else {
        tracing::info!("HTTP API disabled");
        None
    };

    tracing::info!("Press Ctrl+C to exit");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    poller.stop().await;

    if let Some((shutdown_tx, task)) = api {
        // The server may already have exited on its own
        let _ = shutdown_tx.send(());
        if let Err(e) = task.await {
            tracing::error!("HTTP API task failed: {}", e);
        }
    }

    tracing::info!("saphid shutdown complete");

    Ok(())
}
