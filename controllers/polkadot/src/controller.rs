//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the cluster
//! client, reconciler, watcher and the metrics/probe server together.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{start_server, ServerState};
use crate::watcher::{Context, Watcher};
use cluster_client::{ClusterClientTrait, KubeClusterClient};
use kube::Client;
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main controller for Polkadot resources.
pub struct Controller {
    polkadot_watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Polkadot Controller");

        let registry = Registry::new();
        let metrics = Metrics::register(&registry)?;
        let server_state = ServerState::new(registry);

        let server = {
            let state = server_state.clone();
            let port = config.metrics_port;
            tokio::spawn(async move { start_server(port, state).await })
        };

        let kube_client = Client::try_default().await?;
        let cluster_client = KubeClusterClient::new(kube_client.clone());

        info!("Validating Kubernetes API connectivity...");
        cluster_client.validate_connectivity().await.map_err(|e| {
            error!("Failed to reach the Kubernetes API server: {}", e);
            ControllerError::Cluster(e)
        })?;

        let reconciler = Reconciler::new(cluster_client, config.template.clone()).with_metrics(metrics.clone());
        let context = Arc::new(Context {
            reconciler,
            backoff: BackoffTracker::new(config.backoff_min, config.backoff_max),
            metrics,
        });

        let watcher = Watcher::new(
            context,
            kube_client,
            config.namespace.clone(),
            config.concurrency,
            config.debounce,
        );
        let polkadot_watcher = tokio::spawn(async move { watcher.watch_polkadots().await });

        server_state.set_ready(true);

        Ok(Self {
            polkadot_watcher,
            server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Polkadot Controller running");

        tokio::select! {
            result = &mut self.polkadot_watcher => {
                self.server.abort();
                result.map_err(|e| ControllerError::Watch(format!("Polkadot watcher panicked: {}", e)))??;
            }
            result = &mut self.server => {
                self.polkadot_watcher.abort();
                result.map_err(|e| ControllerError::Watch(format!("HTTP server task panicked: {}", e)))??;
                return Err(ControllerError::Watch("HTTP server stopped unexpectedly".to_string()));
            }
        }

        Ok(())
    }
}
