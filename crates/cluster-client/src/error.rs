//! Cluster client errors

use crate::object::DependentKind;
use thiserror::Error;

/// Errors that can occur when reading or writing cluster state.
///
/// A missing object is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API error (network, timeout, optimistic-concurrency conflict)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Transient failure not originating from the kube client
    #[error("Transient cluster failure: {0}")]
    Transient(String),

    /// Controller reference could not be attached to a dependent
    #[error("Ownership assignment failed: {0}")]
    Ownership(String),

    /// The cluster returned a different kind than the one requested
    #[error("Kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: DependentKind,
        found: DependentKind,
    },

    /// Object is missing a metadata field required for the call
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),
}
