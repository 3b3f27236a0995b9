//! Polkadot Controller
//!
//! Keeps the dependents of every `Polkadot` resource in sync with its spec:
//! - Deployment running `spec.size` polkadot nodes at `spec.version`
//! - NodePort Service for p2p, RPC and websocket traffic
//! - PersistentVolumeClaim holding chain data
//! - NetworkPolicy isolating validator pods (`kind: sentry-and-validator`)
//!
//! Dependents carry a controller owner reference, so Kubernetes garbage
//! collection removes them together with their parent.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
mod status;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::error::ControllerError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Polkadot Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        config.namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  Image repository: {}", config.template.image_repository);
    info!(
        "  Storage: {} ({})",
        config.template.storage_size, config.template.storage_class
    );
    info!("  Concurrency: {}", config.concurrency);
    info!("  Metrics port: {}", config.metrics_port);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
