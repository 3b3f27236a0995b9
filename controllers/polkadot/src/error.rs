//! Controller-specific error types.
//!
//! Platform failures from the reconciliation core arrive as
//! [`ClusterError`]; this module wraps them with the dependent kind that failed
//! and adds the errors of the controller process itself.

use cluster_client::{ClusterError, DependentKind};
use thiserror::Error;

/// Errors that can occur in the Polkadot Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Cluster call failed outside any dependent (parent fetch, connectivity)
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Synchronizing one dependent failed
    #[error("Failed to reconcile {kind}: {source}")]
    Dependent {
        kind: DependentKind,
        #[source]
        source: ClusterError,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics/probe server failed
    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),

    /// Metric registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<kube::Error> for ControllerError {
    fn from(error: kube::Error) -> Self {
        ControllerError::Cluster(ClusterError::Kube(error))
    }
}
