//! Generic fetch, create-or-diff, maybe-update procedure for one dependent.

use super::diff::Diff;
use super::outcome::ReconcileOutcome;
use super::policy::DependentPolicy;
use crate::config::DependentTemplate;
use cluster_client::{ClusterClientTrait, DependentObject};
use crds::Polkadot;
use tracing::{debug, info, warn};

/// Bring the `P::KIND` dependent of `parent` in line with its desired state.
///
/// Issues at most one write. Errors are returned as [`ReconcileOutcome::Failed`]
/// without retrying.
pub async fn sync<P: DependentPolicy>(
    client: &dyn ClusterClientTrait,
    parent: &Polkadot,
    template: &DependentTemplate,
) -> ReconcileOutcome {
    let desired = match P::desired(parent, template) {
        Ok(desired) => desired,
        Err(e) => return ReconcileOutcome::Failed(e),
    };
    let mut desired_object: DependentObject = desired.clone().into();
    let (name, namespace) = match desired_object.object_key() {
        Ok((name, namespace)) => (name.to_string(), namespace.to_string()),
        Err(e) => return ReconcileOutcome::Failed(e),
    };

    let observed = match client.get_dependent(P::KIND, &name, &namespace).await {
        Ok(observed) => observed,
        Err(e) => {
            warn!("Failed to fetch {} {}/{}: {}", P::KIND, namespace, name, e);
            return ReconcileOutcome::Failed(e);
        }
    };

    let Some(observed) = observed else {
        info!("{} {}/{} not found, creating", P::KIND, namespace, name);
        if let Err(e) = client.set_ownership(parent, &mut desired_object) {
            warn!("Failed to set ownership on {} {}/{}: {}", P::KIND, namespace, name, e);
            return ReconcileOutcome::Failed(e);
        }
        return match client.create_dependent(&desired_object).await {
            Ok(_) => {
                info!("Created {} {}/{}", P::KIND, namespace, name);
                ReconcileOutcome::Created
            }
            Err(e) => {
                warn!("Failed to create {} {}/{}: {}", P::KIND, namespace, name, e);
                ReconcileOutcome::Failed(e)
            }
        };
    };

    let observed = match P::Object::try_from(observed) {
        Ok(observed) => observed,
        Err(e) => return ReconcileOutcome::Failed(e),
    };

    match P::diff(&observed, &desired) {
        Diff::Equivalent => {
            debug!("{} {}/{} is up to date", P::KIND, namespace, name);
            ReconcileOutcome::Unchanged
        }
        Diff::NeedsUpdate(fields) => {
            info!("{} {}/{} drifted on {:?}, updating", P::KIND, namespace, name, fields);
            let updated: DependentObject = P::apply_drift(&observed, &desired, &fields).into();
            match client.update_dependent(&updated).await {
                Ok(_) => ReconcileOutcome::UpdatedFields(fields),
                Err(e) => {
                    warn!("Failed to update {} {}/{}: {}", P::KIND, namespace, name, e);
                    ReconcileOutcome::Failed(e)
                }
            }
        }
    }
}
