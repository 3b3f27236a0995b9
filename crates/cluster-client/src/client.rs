//! Kubernetes implementation of [`ClusterClientTrait`].

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::object::{DependentKind, DependentObject};
use crate::ownership::attach_controller_reference;
use crds::{Polkadot, PolkadotStatus};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use tracing::{debug, info};

/// Cluster client backed by `kube::Api`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn validate_connectivity(&self) -> Result<(), ClusterError> {
        let version = self.client.apiserver_version().await?;
        info!("Connected to Kubernetes API server {}", version.git_version);
        Ok(())
    }

    async fn get_parent(&self, namespace: &str, name: &str) -> Result<Option<Polkadot>, ClusterError> {
        Ok(self.api::<Polkadot>(namespace).get_opt(name).await?)
    }

    async fn get_dependent(
        &self,
        kind: DependentKind,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DependentObject>, ClusterError> {
        debug!("Fetching {} {}/{}", kind, namespace, name);
        let found = match kind {
            DependentKind::Workload => self
                .api::<Deployment>(namespace)
                .get_opt(name)
                .await?
                .map(DependentObject::Workload),
            DependentKind::Endpoint => self
                .api::<Service>(namespace)
                .get_opt(name)
                .await?
                .map(DependentObject::Endpoint),
            DependentKind::StorageClaim => self
                .api::<PersistentVolumeClaim>(namespace)
                .get_opt(name)
                .await?
                .map(DependentObject::StorageClaim),
            DependentKind::NetworkPolicy => self
                .api::<NetworkPolicy>(namespace)
                .get_opt(name)
                .await?
                .map(DependentObject::NetworkPolicy),
        };
        Ok(found)
    }

    async fn create_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError> {
        let (_, namespace) = resource.object_key()?;
        let pp = PostParams::default();
        let created = match resource {
            DependentObject::Workload(o) => {
                DependentObject::Workload(self.api::<Deployment>(namespace).create(&pp, o).await?)
            }
            DependentObject::Endpoint(o) => {
                DependentObject::Endpoint(self.api::<Service>(namespace).create(&pp, o).await?)
            }
            DependentObject::StorageClaim(o) => DependentObject::StorageClaim(
                self.api::<PersistentVolumeClaim>(namespace).create(&pp, o).await?,
            ),
            DependentObject::NetworkPolicy(o) => DependentObject::NetworkPolicy(
                self.api::<NetworkPolicy>(namespace).create(&pp, o).await?,
            ),
        };
        Ok(created)
    }

    async fn update_dependent(&self, resource: &DependentObject) -> Result<DependentObject, ClusterError> {
        let (name, namespace) = resource.object_key()?;
        let pp = PostParams::default();
        let updated = match resource {
            DependentObject::Workload(o) => {
                DependentObject::Workload(self.api::<Deployment>(namespace).replace(name, &pp, o).await?)
            }
            DependentObject::Endpoint(o) => {
                DependentObject::Endpoint(self.api::<Service>(namespace).replace(name, &pp, o).await?)
            }
            DependentObject::StorageClaim(o) => DependentObject::StorageClaim(
                self.api::<PersistentVolumeClaim>(namespace)
                    .replace(name, &pp, o)
                    .await?,
            ),
            DependentObject::NetworkPolicy(o) => DependentObject::NetworkPolicy(
                self.api::<NetworkPolicy>(namespace).replace(name, &pp, o).await?,
            ),
        };
        Ok(updated)
    }

    fn set_ownership(&self, parent: &Polkadot, child: &mut DependentObject) -> Result<(), ClusterError> {
        attach_controller_reference(parent, child.metadata_mut())
    }

    async fn patch_parent_status(
        &self,
        namespace: &str,
        name: &str,
        status: &PolkadotStatus,
    ) -> Result<(), ClusterError> {
        let status_patch = serde_json::json!({ "status": status });
        let pp = PatchParams::default();
        self.api::<Polkadot>(namespace)
            .patch_status(name, &pp, &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }
}
