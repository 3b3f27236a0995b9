//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test parents and for faking the
//! fields the API server fills in on stored objects.

#[cfg(test)]
use crate::config::DependentTemplate;
#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use cluster_client::MockClusterClient;
#[cfg(test)]
use crds::{NodeKind, Polkadot, PolkadotSpec};
#[cfg(test)]
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Helper to create a persisted `Polkadot` parent (uid and generation set)
#[cfg(test)]
pub fn create_test_polkadot(name: &str, namespace: &str, size: i32, version: &str) -> Polkadot {
    Polkadot {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{namespace}-{name}")),
            generation: Some(1),
            ..Default::default()
        },
        spec: PolkadotSpec {
            size,
            version: version.to_string(),
            kind: NodeKind::Default,
        },
        status: None,
    }
}

/// Switch a parent to the sentry/validator topology
#[cfg(test)]
pub fn sentry_and_validator(mut parent: Polkadot) -> Polkadot {
    parent.spec.kind = NodeKind::SentryAndValidator;
    parent
}

/// Fill in fields the API server and the deployment controller own
#[cfg(test)]
pub fn simulate_server_fields(deployment: &mut Deployment) {
    deployment.metadata.uid = Some("uid-deployment".to_string());
    deployment.metadata.resource_version = Some("4711".to_string());
    deployment.metadata.generation = Some(3);
    if let Some(spec) = deployment.spec.as_mut() {
        spec.revision_history_limit = Some(10);
        spec.progress_deadline_seconds = Some(600);
        if let Some(pod) = spec.template.spec.as_mut() {
            pod.restart_policy = Some("Always".to_string());
            pod.dns_policy = Some("ClusterFirst".to_string());
            for container in &mut pod.containers {
                container.termination_message_path = Some("/dev/termination-log".to_string());
                container.image_pull_policy = Some("IfNotPresent".to_string());
            }
        }
    }
    deployment.status = Some(DeploymentStatus {
        available_replicas: Some(1),
        observed_generation: Some(3),
        ..Default::default()
    });
}

/// Reconciler over a mock cluster containing `parents`
#[cfg(test)]
pub fn create_test_reconciler(parents: &[Polkadot]) -> (Reconciler, MockClusterClient) {
    let client = MockClusterClient::new();
    for parent in parents {
        client.add_parent(parent.clone());
    }
    let reconciler = Reconciler::new(client.clone(), DependentTemplate::default());
    (reconciler, client)
}
