//! Controller owner references.
//!
//! Every dependent carries exactly one controller reference pointing at its
//! `Polkadot` parent, which lets the Kubernetes garbage collector remove the
//! dependent when the parent is deleted.

use crate::error::ClusterError;
use crds::Polkadot;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

/// Attach a controller reference to `parent` onto `child`.
///
/// Idempotent when the child is already controlled by the same parent.
///
/// # Errors
///
/// Returns [`ClusterError::Ownership`] when the parent has no uid yet (it was
/// never persisted) or when the child is already controlled by another owner.
pub fn attach_controller_reference(
    parent: &Polkadot,
    child: &mut ObjectMeta,
) -> Result<(), ClusterError> {
    let owner = parent.controller_owner_ref(&()).ok_or_else(|| {
        ClusterError::Ownership(format!(
            "Polkadot {} has no uid, cannot be used as owner",
            parent.name_any()
        ))
    })?;

    let references = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = references.iter().find(|r| r.controller == Some(true)) {
        if existing.uid == owner.uid {
            return Ok(());
        }
        return Err(ClusterError::Ownership(format!(
            "{} is already controlled by {} {}",
            child.name.as_deref().unwrap_or("<unnamed>"),
            existing.kind,
            existing.name
        )));
    }

    references.push(owner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{NodeKind, PolkadotSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn parent(uid: Option<&str>) -> Polkadot {
        let mut parent = Polkadot::new(
            "alice",
            PolkadotSpec {
                size: 1,
                version: "latest".to_string(),
                kind: NodeKind::Default,
            },
        );
        parent.metadata.namespace = Some("default".to_string());
        parent.metadata.uid = uid.map(str::to_string);
        parent
    }

    #[test]
    fn test_attaches_single_controller_reference() {
        let mut child = ObjectMeta {
            name: Some("alice-deployment".to_string()),
            ..Default::default()
        };
        attach_controller_reference(&parent(Some("uid-1")), &mut child).unwrap();

        let refs = child.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "uid-1");
        assert_eq!(refs[0].kind, "Polkadot");
        assert_eq!(refs[0].name, "alice");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_attach_is_idempotent_for_same_parent() {
        let owner = parent(Some("uid-1"));
        let mut child = ObjectMeta::default();
        attach_controller_reference(&owner, &mut child).unwrap();
        attach_controller_reference(&owner, &mut child).unwrap();
        assert_eq!(child.owner_references.unwrap().len(), 1);
    }

    #[test]
    fn test_parent_without_uid_is_rejected() {
        let mut child = ObjectMeta::default();
        let result = attach_controller_reference(&parent(None), &mut child);
        assert!(matches!(result, Err(ClusterError::Ownership(_))));
    }

    #[test]
    fn test_foreign_controller_is_rejected() {
        let mut child = ObjectMeta {
            name: Some("alice-service".to_string()),
            owner_references: Some(vec![OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "ReplicaSet".to_string(),
                name: "other".to_string(),
                uid: "uid-other".to_string(),
                controller: Some(true),
                block_owner_deletion: None,
            }]),
            ..Default::default()
        };
        let result = attach_controller_reference(&parent(Some("uid-1")), &mut child);
        assert!(matches!(result, Err(ClusterError::Ownership(_))));
    }
}
