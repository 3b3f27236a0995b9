//! Mock ClusterClient for unit testing
//!
//! In-memory cluster that implements [`ClusterClientTrait`] without an API
//! server. Every trait call is recorded in order so tests can assert on the
//! exact sequence of reads and writes a reconciliation pass performed.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::object::{DependentKind, DependentObject};
use crate::ownership::attach_controller_reference;
use crds::{Polkadot, PolkadotStatus};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    GetParent { namespace: String, name: String },
    GetDependent { kind: DependentKind, name: String },
    SetOwnership { kind: DependentKind, name: String },
    CreateDependent { kind: DependentKind, name: String },
    UpdateDependent { kind: DependentKind, name: String },
    PatchParentStatus { namespace: String, name: String },
}

impl ClusterCall {
    /// Whether this call wrote a dependent object
    pub fn is_dependent_write(&self) -> bool {
        matches!(
            self,
            ClusterCall::CreateDependent { .. } | ClusterCall::UpdateDependent { .. }
        )
    }

    /// Whether this call touched a dependent object at all
    pub fn is_dependent_call(&self) -> bool {
        !matches!(
            self,
            ClusterCall::GetParent { .. } | ClusterCall::PatchParentStatus { .. }
        )
    }
}

/// Operation that can be configured to fail via [`MockClusterClient::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetParent,
    GetDependent,
    SetOwnership,
    CreateDependent,
    UpdateDependent,
    PatchParentStatus,
}

type ParentKey = (String, String);
type DependentKey = (DependentKind, String, String);
type FailureKey = (MockOperation, Option<DependentKind>);

/// Mock ClusterClient for testing
///
/// Created objects get a uid and a `resourceVersion`; updates must carry the
/// current `resourceVersion` or fail with a conflict, like the API server.
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    parents: Arc<Mutex<HashMap<ParentKey, Polkadot>>>,
    dependents: Arc<Mutex<HashMap<DependentKey, DependentObject>>>,
    calls: Arc<Mutex<Vec<ClusterCall>>>,
    failures: Arc<Mutex<HashSet<FailureKey>>>,
    // Counter for resourceVersion values
    next_version: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parent to the mock store (for test setup)
    pub fn add_parent(&self, parent: Polkadot) {
        let key = (
            parent.metadata.namespace.clone().unwrap_or_default(),
            parent.metadata.name.clone().unwrap_or_default(),
        );
        lock(&self.parents).insert(key, parent);
    }

    /// Add a dependent to the mock store (for test setup)
    ///
    /// Objects without a `resourceVersion` get one assigned.
    pub fn add_dependent(&self, mut object: DependentObject) {
        if object.metadata().resource_version.is_none() {
            object.metadata_mut().resource_version = Some(self.next_version());
        }
        let key = Self::dependent_key(&object);
        lock(&self.dependents).insert(key, object);
    }

    /// Current stored state of a dependent
    pub fn dependent(&self, kind: DependentKind, namespace: &str, name: &str) -> Option<DependentObject> {
        lock(&self.dependents)
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Current stored state of a parent, including patched status
    pub fn parent(&self, namespace: &str, name: &str) -> Option<Polkadot> {
        lock(&self.parents)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored dependents
    pub fn dependent_count(&self) -> usize {
        lock(&self.dependents).len()
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<ClusterCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Make `operation` fail. `kind = None` fails it for every kind.
    pub fn fail_on(&self, operation: MockOperation, kind: Option<DependentKind>) {
        lock(&self.failures).insert((operation, kind));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    fn record(&self, call: ClusterCall) {
        lock(&self.calls).push(call);
    }

    fn check_failure(&self, operation: MockOperation, kind: Option<DependentKind>) -> Result<(), ClusterError> {
        let failures = lock(&self.failures);
        if failures.contains(&(operation, None)) || (kind.is_some() && failures.contains(&(operation, kind))) {
            return Err(ClusterError::Transient(format!("injected {operation:?} failure")));
        }
        Ok(())
    }

    fn next_version(&self) -> String {
        let mut version = lock(&self.next_version);
        *version += 1;
        version.to_string()
    }

    fn dependent_key(object: &DependentObject) -> DependentKey {
        (
            object.kind(),
            object.namespace().unwrap_or_default().to_string(),
            object.name().unwrap_or_default().to_string(),
        )
    }

    /// Fill in the fields the API server would default on create
    fn apply_server_defaults(object: &mut DependentObject) {
        match object {
            DependentObject::Endpoint(service) => {
                if let Some(spec) = service.spec.as_mut() {
                    spec.cluster_ip.get_or_insert_with(|| "10.96.0.10".to_string());
                    spec.session_affinity.get_or_insert_with(|| "None".to_string());
                }
            }
            DependentObject::Workload(deployment) => {
                if let Some(spec) = deployment.spec.as_mut() {
                    spec.revision_history_limit.get_or_insert(10);
                    spec.progress_deadline_seconds.get_or_insert(600);
                }
                deployment.status = Some(DeploymentStatus {
                    observed_generation: Some(1),
                    ..Default::default()
                });
            }
            DependentObject::StorageClaim(_) | DependentObject::NetworkPolicy(_) => {}
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn validate_connectivity(&self) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn get_parent(&self, namespace: &str, name: &str) -> Result<Option<Polkadot>, ClusterError> {
        self.record(ClusterCall::GetParent {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        self.check_failure(MockOperation::GetParent, None)?;
        Ok(self.parent(namespace, name))
    }

    async fn get_dependent(
        &self,
        kind: DependentKind,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DependentObject>, ClusterError> {
        self.record(ClusterCall::GetDependent {
            kind,
            name: name.to_string(),
        });
        self.check_failure(MockOperation::GetDependent, Some(kind))?;
        Ok(self.dependent(kind, namespace, name))
    }

    async fn create_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError> {
        let (name, _) = resource.object_key()?;
        self.record(ClusterCall::CreateDependent {
            kind: resource.kind(),
            name: name.to_string(),
        });
        self.check_failure(MockOperation::CreateDependent, Some(resource.kind()))?;

        let key = Self::dependent_key(resource);
        let mut dependents = lock(&self.dependents);
        if dependents.contains_key(&key) {
            return Err(ClusterError::Transient(format!(
                "{} {} already exists",
                resource.kind(),
                name
            )));
        }

        let mut created = resource.clone();
        let metadata = created.metadata_mut();
        metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        metadata.resource_version = Some(self.next_version());
        metadata.generation = Some(1);
        Self::apply_server_defaults(&mut created);
        dependents.insert(key, created.clone());
        Ok(created)
    }

    async fn update_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError> {
        let (name, _) = resource.object_key()?;
        self.record(ClusterCall::UpdateDependent {
            kind: resource.kind(),
            name: name.to_string(),
        });
        self.check_failure(MockOperation::UpdateDependent, Some(resource.kind()))?;

        let key = Self::dependent_key(resource);
        let mut dependents = lock(&self.dependents);
        let stored = dependents.get(&key).ok_or_else(|| {
            ClusterError::Transient(format!("{} {} not found", resource.kind(), name))
        })?;
        if stored.metadata().resource_version != resource.metadata().resource_version {
            return Err(ClusterError::Transient(format!(
                "conflict updating {} {}: resourceVersion is stale",
                resource.kind(),
                name
            )));
        }

        let mut updated = resource.clone();
        let metadata = updated.metadata_mut();
        metadata.resource_version = Some(self.next_version());
        metadata.generation = Some(metadata.generation.unwrap_or(1) + 1);
        dependents.insert(key, updated.clone());
        Ok(updated)
    }

    fn set_ownership(&self, parent: &Polkadot, child: &mut DependentObject) -> Result<(), ClusterError> {
        self.record(ClusterCall::SetOwnership {
            kind: child.kind(),
            name: child.name().unwrap_or_default().to_string(),
        });
        self.check_failure(MockOperation::SetOwnership, Some(child.kind()))?;
        attach_controller_reference(parent, child.metadata_mut())
    }

    async fn patch_parent_status(
        &self,
        namespace: &str,
        name: &str,
        status: &PolkadotStatus,
    ) -> Result<(), ClusterError> {
        self.record(ClusterCall::PatchParentStatus {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        self.check_failure(MockOperation::PatchParentStatus, None)?;

        let mut parents = lock(&self.parents);
        let parent = parents
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::Transient(format!("Polkadot {namespace}/{name} not found")))?;
        parent.status = Some(status.clone());
        Ok(())
    }
}
