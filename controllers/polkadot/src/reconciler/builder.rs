//! Desired-state builders.
//!
//! Pure functions from a `Polkadot` parent (plus the static
//! [`DependentTemplate`]) to the dependent objects it should own. Identical
//! inputs always produce equal objects; nothing here touches the cluster.

use crate::config::DependentTemplate;
use cluster_client::{DependentKind, DependentObject};
use crds::Polkadot;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
    Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const LABEL_APP: &str = "app";
pub const LABEL_APP_CR: &str = "app_cr";
pub const LABEL_VERSION: &str = "version";

pub const CONTAINER_NAME: &str = "polkadot";
const VOLUME_NAME: &str = "polkadot-data";
const DATA_MOUNT_PATH: &str = "/data";

const P2P_PORT: i32 = 30333;
const RPC_HTTP_PORT: i32 = 9933;
const RPC_WS_PORT: i32 = 9944;

/// `{app, app_cr}` labels selecting the parent's pods
pub fn selector_labels(parent: &Polkadot) -> BTreeMap<String, String> {
    let name = parent.name_any();
    BTreeMap::from([
        (LABEL_APP.to_string(), name.clone()),
        (LABEL_APP_CR.to_string(), name),
    ])
}

/// Selector labels plus the `version` label carried by the workload
pub fn versioned_labels(parent: &Polkadot) -> BTreeMap<String, String> {
    let mut labels = selector_labels(parent);
    labels.insert(LABEL_VERSION.to_string(), parent.spec.version.clone());
    labels
}

/// Container image for a client version
pub fn image(template: &DependentTemplate, version: &str) -> String {
    format!("{}:{}", template.image_repository, version)
}

fn object_meta(parent: &Polkadot, kind: DependentKind, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(kind.dependent_name(&parent.name_any())),
        namespace: parent.namespace(),
        labels: Some(labels),
        ..Default::default()
    }
}

fn selector(parent: &Polkadot) -> LabelSelector {
    LabelSelector {
        match_labels: Some(selector_labels(parent)),
        ..Default::default()
    }
}

/// Node `Deployment`: `spec.size` replicas of the polkadot container with the data volume mounted
pub fn workload(parent: &Polkadot, template: &DependentTemplate) -> Deployment {
    let parent_name = parent.name_any();
    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(image(template, &parent.spec.version)),
        command: Some(vec![
            "polkadot".to_string(),
            "--name".to_string(),
            parent_name.clone(),
            "--rpc-external".to_string(),
            "--rpc-cors=all".to_string(),
        ]),
        ports: Some(
            [P2P_PORT, RPC_HTTP_PORT, RPC_WS_PORT]
                .into_iter()
                .map(|port| ContainerPort {
                    container_port: port,
                    ..Default::default()
                })
                .collect(),
        ),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_NAME.to_string(),
            mount_path: DATA_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(parent, DependentKind::Workload, versioned_labels(parent)),
        spec: Some(DeploymentSpec {
            replicas: Some(parent.spec.size),
            selector: selector(parent),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(parent)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![Volume {
                        name: VOLUME_NAME.to_string(),
                        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                            claim_name: DependentKind::StorageClaim.dependent_name(&parent_name),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// NodePort `Service` exposing the p2p, RPC and websocket ports
pub fn endpoint(parent: &Polkadot) -> Service {
    let port = |name: &str, number: i32| ServicePort {
        name: Some(name.to_string()),
        port: number,
        target_port: Some(IntOrString::Int(number)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    };

    Service {
        metadata: object_meta(parent, DependentKind::Endpoint, selector_labels(parent)),
        spec: Some(ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![
                port("p2p", P2P_PORT),
                port("rpc-http", RPC_HTTP_PORT),
                port("rpc-ws", RPC_WS_PORT),
            ]),
            selector: Some(selector_labels(parent)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Chain data claim mounted by the workload
pub fn storage_claim(parent: &Polkadot, template: &DependentTemplate) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: object_meta(parent, DependentKind::StorageClaim, selector_labels(parent)),
        spec: Some(PersistentVolumeClaimSpec {
            storage_class_name: Some(template.storage_class.clone()),
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(template.storage_size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Isolates a validator: its pods only talk to pods of the same parent
pub fn network_policy(parent: &Polkadot) -> NetworkPolicy {
    let peers = || {
        Some(vec![NetworkPolicyPeer {
            pod_selector: Some(selector(parent)),
            ..Default::default()
        }])
    };

    NetworkPolicy {
        metadata: object_meta(parent, DependentKind::NetworkPolicy, selector_labels(parent)),
        spec: Some(NetworkPolicySpec {
            pod_selector: Some(selector(parent)),
            policy_types: Some(vec!["Ingress".to_string(), "Egress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: peers(),
                ..Default::default()
            }]),
            egress: Some(vec![NetworkPolicyEgressRule {
                to: peers(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired object of `kind` for `parent`
pub fn build(parent: &Polkadot, kind: DependentKind, template: &DependentTemplate) -> DependentObject {
    match kind {
        DependentKind::Workload => workload(parent, template).into(),
        DependentKind::Endpoint => endpoint(parent).into(),
        DependentKind::StorageClaim => storage_claim(parent, template).into(),
        DependentKind::NetworkPolicy => network_policy(parent).into(),
    }
}
