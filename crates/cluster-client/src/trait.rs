//! ClusterClient trait for mocking
//!
//! This trait abstracts the Kubernetes API so the reconciler can be unit tested
//! against an in-memory cluster. The concrete `KubeClusterClient` implements it
//! on top of `kube::Api`.

use crate::error::ClusterError;
use crate::object::{DependentKind, DependentObject};
use crds::{Polkadot, PolkadotStatus};

/// Read/write operations the reconciler needs from the cluster.
///
/// Lookups return `Ok(None)` for objects that do not exist.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Check that the API server is reachable with the configured credentials
    async fn validate_connectivity(&self) -> Result<(), ClusterError>;

    async fn get_parent(&self, namespace: &str, name: &str) -> Result<Option<Polkadot>, ClusterError>;

    async fn get_dependent(
        &self,
        kind: DependentKind,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DependentObject>, ClusterError>;

    async fn create_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError>;

    /// Replace an existing dependent. The object must carry the `resourceVersion`
    /// it was read with; a concurrent modification surfaces as an error.
    async fn update_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError>;

    /// Attach the controller reference to `parent` onto `child` before it is created
    fn set_ownership(&self, parent: &Polkadot, child: &mut DependentObject) -> Result<(), ClusterError>;

    async fn patch_parent_status(
        &self,
        namespace: &str,
        name: &str,
        status: &PolkadotStatus,
    ) -> Result<(), ClusterError>;
}
