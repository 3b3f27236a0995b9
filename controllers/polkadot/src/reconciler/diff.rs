//! Drift detection between observed and desired dependents.
//!
//! Comparisons are deliberately narrow: only fields the controller owns are
//! inspected, so server-populated fields (status, cluster IPs, defaulted
//! values, `resourceVersion`) never count as drift.

use super::builder::{CONTAINER_NAME, LABEL_VERSION};
use k8s_openapi::api::apps::v1::Deployment;

/// A field of a dependent the controller keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriftField {
    /// Workload replica count (`spec.size`)
    Replicas,
    /// Workload `version` label and container image (`spec.version`)
    Version,
}

/// Result of comparing an observed dependent with its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff {
    Equivalent,
    NeedsUpdate(Vec<DriftField>),
}

impl Diff {
    fn from_fields(fields: Vec<DriftField>) -> Self {
        if fields.is_empty() {
            Diff::Equivalent
        } else {
            Diff::NeedsUpdate(fields)
        }
    }
}

fn replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|spec| spec.replicas)
}

fn version_label(deployment: &Deployment) -> Option<&str> {
    deployment
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_VERSION))
        .map(String::as_str)
}

fn container_image(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.iter().find(|c| c.name == CONTAINER_NAME))
        .and_then(|container| container.image.as_deref())
}

/// Compare replica count and version label of a workload.
pub fn diff_workload(observed: &Deployment, desired: &Deployment) -> Diff {
    let mut fields = Vec::new();
    if replicas(observed) != replicas(desired) {
        fields.push(DriftField::Replicas);
    }
    if version_label(observed) != version_label(desired) {
        fields.push(DriftField::Version);
    }
    Diff::from_fields(fields)
}

/// Copy `fields` from `desired` onto a clone of `observed`.
///
/// Everything else, `resourceVersion` included, is kept from `observed`.
pub fn apply_workload_drift(observed: &Deployment, desired: &Deployment, fields: &[DriftField]) -> Deployment {
    let mut updated = observed.clone();
    for field in fields {
        match field {
            DriftField::Replicas => {
                let replicas = replicas(desired);
                match updated.spec.as_mut() {
                    Some(spec) => spec.replicas = replicas,
                    None => updated.spec = desired.spec.clone(),
                }
            }
            DriftField::Version => {
                if let Some(version) = version_label(desired) {
                    updated
                        .metadata
                        .labels
                        .get_or_insert_with(Default::default)
                        .insert(LABEL_VERSION.to_string(), version.to_string());
                }
                set_container_image(&mut updated, desired);
            }
        }
    }
    updated
}

fn set_container_image(updated: &mut Deployment, desired: &Deployment) {
    let Some(image) = container_image(desired).map(str::to_string) else {
        return;
    };
    let Some(pod) = updated
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
    else {
        updated.spec = desired.spec.clone();
        return;
    };
    match pod.containers.iter_mut().find(|c| c.name == CONTAINER_NAME) {
        Some(container) => container.image = Some(image),
        None => {
            let desired_container = desired
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref())
                .and_then(|pod| pod.containers.iter().find(|c| c.name == CONTAINER_NAME))
                .cloned();
            pod.containers.extend(desired_container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependentTemplate;
    use crate::reconciler::builder::workload;
    use crate::test_utils::{create_test_polkadot, simulate_server_fields};

    fn desired(size: i32, version: &str) -> Deployment {
        workload(
            &create_test_polkadot("alice", "default", size, version),
            &DependentTemplate::default(),
        )
    }

    #[test]
    fn test_identical_workloads_are_equivalent() {
        assert_eq!(diff_workload(&desired(3, "v1"), &desired(3, "v1")), Diff::Equivalent);
    }

    #[test]
    fn test_server_fields_are_not_drift() {
        let mut observed = desired(3, "v1");
        simulate_server_fields(&mut observed);
        assert_eq!(diff_workload(&observed, &desired(3, "v1")), Diff::Equivalent);
    }

    #[test]
    fn test_replica_drift_detected() {
        assert_eq!(
            diff_workload(&desired(2, "v1"), &desired(5, "v1")),
            Diff::NeedsUpdate(vec![DriftField::Replicas])
        );
    }

    #[test]
    fn test_version_drift_detected() {
        assert_eq!(
            diff_workload(&desired(3, "v1"), &desired(3, "v2")),
            Diff::NeedsUpdate(vec![DriftField::Version])
        );
        assert_eq!(
            diff_workload(&desired(1, "v1"), &desired(3, "v2")),
            Diff::NeedsUpdate(vec![DriftField::Replicas, DriftField::Version])
        );
    }

    #[test]
    fn test_apply_replicas_keeps_everything_else() {
        let mut observed = desired(2, "v1");
        simulate_server_fields(&mut observed);

        let updated = apply_workload_drift(&observed, &desired(5, "v1"), &[DriftField::Replicas]);
        assert_eq!(replicas(&updated), Some(5));
        assert_eq!(updated.metadata.resource_version, observed.metadata.resource_version);
        assert_eq!(updated.status, observed.status);

        let mut expected = observed.clone();
        expected.spec.as_mut().unwrap().replicas = Some(5);
        assert_eq!(updated, expected);
    }

    #[test]
    fn test_apply_version_rewrites_label_and_image() {
        let observed = desired(3, "v1");
        let updated = apply_workload_drift(&observed, &desired(3, "v2"), &[DriftField::Version]);
        assert_eq!(version_label(&updated), Some("v2"));
        assert_eq!(container_image(&updated), Some("chevdor/polkadot:v2"));
        assert_eq!(replicas(&updated), Some(3));
        assert_eq!(diff_workload(&updated, &desired(3, "v2")), Diff::Equivalent);
    }
}
