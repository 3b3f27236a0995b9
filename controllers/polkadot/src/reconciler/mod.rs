//! Reconciliation logic for `Polkadot` resources.
//!
//! One pass reads the parent, then synchronizes its dependents in a fixed
//! order (workload, endpoint, storage claim, and for validator topologies the
//! network policy). The pass stops at the first dependent that was created or
//! failed and reports how the platform should requeue it.
//!
//! - `builder`: desired state per dependent kind
//! - `diff`: drift detection and field write-back
//! - `policy`: builder/diff pair per kind
//! - `sync`: generic create-or-update of one dependent
//! - `outcome`: per-dependent outcomes and the pass state machine

pub mod builder;
pub mod diff;
pub mod outcome;
pub mod policy;
pub mod sync;

#[cfg(test)]
mod reconciler_test;

pub use outcome::{AggregateResult, Flow, ReconcileOutcome, ReconcilePass, StopReason};

use crate::config::DependentTemplate;
use crate::metrics::Metrics;
use cluster_client::{ClusterClientTrait, DependentKind};
use crds::{Polkadot, PolkadotSpec};
use kube::ResourceExt;
use policy::{EndpointPolicy, NetworkIsolationPolicy, StorageClaimPolicy, WorkloadPolicy};
use std::fmt;
use tracing::{debug, info, info_span, Instrument};

/// Names the parent a pass works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Request for a parent delivered by the watch; `None` for cluster-scoped objects
    pub fn for_parent(parent: &Polkadot) -> Option<Self> {
        Some(Self::new(parent.namespace()?, parent.name_any()))
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reconciles `Polkadot` parents against their dependents.
pub struct Reconciler {
    pub(crate) client: Box<dyn ClusterClientTrait + Send + Sync>,
    template: DependentTemplate,
    metrics: Option<Metrics>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(client: impl ClusterClientTrait + 'static, template: DependentTemplate) -> Self {
        Self {
            client: Box::new(client),
            template,
            metrics: None,
        }
    }

    /// Count dependent outcomes in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Dependent kinds of a parent, in processing order
    pub fn dependent_kinds(spec: &PolkadotSpec) -> Vec<DependentKind> {
        let mut kinds = DependentKind::BASELINE.to_vec();
        if spec.kind.requires_network_policy() {
            kinds.push(DependentKind::NetworkPolicy);
        }
        kinds
    }

    /// Run one reconciliation pass for the parent named by `request`.
    pub async fn reconcile(&self, request: &ReconcileRequest) -> AggregateResult {
        let span = info_span!("reconcile", namespace = %request.namespace, name = %request.name);
        self.run_pass(request).instrument(span).await
    }

    async fn run_pass(&self, request: &ReconcileRequest) -> AggregateResult {
        let mut pass = ReconcilePass::new();

        let parent = match self.client.get_parent(&request.namespace, &request.name).await {
            Ok(Some(parent)) => parent,
            Ok(None) => {
                info!("Polkadot {} not found, nothing to reconcile", request);
                pass.stop(StopReason::ParentNotFound);
                return pass.finish();
            }
            Err(e) => {
                pass.fail(e);
                return pass.finish();
            }
        };

        pass.start();
        for kind in Self::dependent_kinds(&parent.spec) {
            let outcome = self
                .sync_kind(kind, &parent)
                .instrument(info_span!("dependent", kind = %kind))
                .await;
            match &outcome {
                ReconcileOutcome::UpdatedFields(fields) => info!("Updated {} fields {:?}", kind, fields),
                other => debug!("{} outcome: {}", kind, other.label()),
            }
            if let Some(metrics) = &self.metrics {
                metrics.observe_outcome(kind, &outcome);
            }
            if pass.observe(kind, outcome) == Flow::Halt {
                break;
            }
        }
        pass.finish()
    }

    async fn sync_kind(&self, kind: DependentKind, parent: &Polkadot) -> ReconcileOutcome {
        let client = self.client.as_ref();
        match kind {
            DependentKind::Workload => sync::sync::<WorkloadPolicy>(client, parent, &self.template).await,
            DependentKind::Endpoint => sync::sync::<EndpointPolicy>(client, parent, &self.template).await,
            DependentKind::StorageClaim => {
                sync::sync::<StorageClaimPolicy>(client, parent, &self.template).await
            }
            DependentKind::NetworkPolicy => {
                sync::sync::<NetworkIsolationPolicy>(client, parent, &self.template).await
            }
        }
    }
}
