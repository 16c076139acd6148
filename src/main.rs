//! nodes-sync entry point.

use clap::Parser;
use log::{error, info};
use tokio::signal;

mod config;
mod error;
mod membership;
mod nodes;
mod persist;
mod reconcile;
mod types;

use config::{Args, Config};
use membership::KubeMembership;
use reconcile::Reconciler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load configuration
    let cfg = Config::load(Args::parse())?;
    info!("Starting nodes-sync with config: {:?}", cfg);

    // Cluster access is required; without it there is nothing to watch.
    let membership = KubeMembership::connect(&cfg.namespace, cfg.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create kubernetes client: {}", e))?;

    let mut reconciler = Reconciler::new(membership, &cfg);

    tokio::select! {
        _ = reconciler.run() => {}
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down...");
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
