//! Per-kind builder and diff pairs driving the generic synchronizer.

use super::builder;
use super::diff::{apply_workload_drift, diff_workload, Diff, DriftField};
use crate::config::DependentTemplate;
use cluster_client::{ClusterError, DependentKind, DependentObject};
use crds::Polkadot;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;

/// How one dependent kind is derived from the parent and compared.
///
/// Adding a kind means one implementation here plus one arm in the
/// orchestrator.
pub trait DependentPolicy {
    type Object: Clone
        + Into<DependentObject>
        + TryFrom<DependentObject, Error = ClusterError>
        + Send
        + Sync;

    const KIND: DependentKind;

    /// Desired state of this kind for `parent`, as produced by [`builder::build`].
    ///
    /// # Errors
    ///
    /// [`ClusterError::KindMismatch`] when the builder returns another kind.
    fn desired(parent: &Polkadot, template: &DependentTemplate) -> Result<Self::Object, ClusterError> {
        Self::Object::try_from(builder::build(parent, Self::KIND, template))
    }

    /// Presence-only kinds keep this default: once the object exists it matches.
    fn diff(_observed: &Self::Object, _desired: &Self::Object) -> Diff {
        Diff::Equivalent
    }

    /// Returns a clone of `observed` with `fields` taken from `desired`.
    fn apply_drift(observed: &Self::Object, _desired: &Self::Object, _fields: &[DriftField]) -> Self::Object {
        observed.clone()
    }
}

/// Node workload. Replicas and version are kept in sync.
#[derive(Debug)]
pub struct WorkloadPolicy;

impl DependentPolicy for WorkloadPolicy {
    type Object = Deployment;
    const KIND: DependentKind = DependentKind::Workload;

    fn diff(observed: &Deployment, desired: &Deployment) -> Diff {
        diff_workload(observed, desired)
    }

    fn apply_drift(observed: &Deployment, desired: &Deployment, fields: &[DriftField]) -> Deployment {
        apply_workload_drift(observed, desired, fields)
    }
}

/// Node endpoint. Ports and selector are not compared yet.
#[derive(Debug)]
pub struct EndpointPolicy;

impl DependentPolicy for EndpointPolicy {
    type Object = Service;
    const KIND: DependentKind = DependentKind::Endpoint;
}

/// Chain data claim. Claims are immutable after creation, resizing is unsupported.
#[derive(Debug)]
pub struct StorageClaimPolicy;

impl DependentPolicy for StorageClaimPolicy {
    type Object = PersistentVolumeClaim;
    const KIND: DependentKind = DependentKind::StorageClaim;
}

/// Validator isolation. Presence only.
#[derive(Debug)]
pub struct NetworkIsolationPolicy;

impl DependentPolicy for NetworkIsolationPolicy {
    type Object = NetworkPolicy;
    const KIND: DependentKind = DependentKind::NetworkPolicy;
}
