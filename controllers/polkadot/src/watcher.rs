//! Kubernetes resource watcher.
//!
//! Runs a `kube_runtime::Controller` over `Polkadot` parents that also owns
//! their Deployments, Services, PVCs and NetworkPolicies, so a change to any
//! dependent re-runs the pass of its parent. Parent events pass a generation
//! predicate, so the status this adapter writes does not trigger another pass.
//! Pass results are mapped onto controller actions here; failures go through
//! the per-parent Fibonacci backoff in the error policy.

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{AggregateResult, ReconcileRequest, Reconciler};
use crate::status::{desired_status, status_needs_update};
use cluster_client::ClusterError;
use crds::Polkadot;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::{
    Controller, WatchStreamExt, predicates, reflector, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile and error policy call
pub struct Context {
    pub reconciler: Reconciler,
    pub backoff: BackoffTracker,
    pub metrics: Metrics,
}

/// Map a pass result onto the action the controller runtime should take.
pub fn action_for(result: AggregateResult) -> Result<Action, ControllerError> {
    match result {
        AggregateResult::Stop(_) => Ok(Action::await_change()),
        AggregateResult::RequeueImmediate { .. } => Ok(Action::requeue(Duration::ZERO)),
        AggregateResult::RequeueWithError {
            kind: Some(kind),
            cause,
        } => Err(ControllerError::Dependent {
            kind,
            source: cause,
        }),
        AggregateResult::RequeueWithError { kind: None, cause } => Err(ControllerError::Cluster(cause)),
    }
}

fn resource_key(parent: &Polkadot) -> String {
    format!(
        "{}/{}",
        parent.namespace().unwrap_or_default(),
        parent.name_any()
    )
}

async fn reconcile(parent: Arc<Polkadot>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let request = ReconcileRequest::for_parent(&parent)
        .ok_or(ControllerError::Cluster(ClusterError::MissingMetadata("namespace")))?;
    debug!("Reconciling Polkadot {}", request);

    let started = Instant::now();
    let result = ctx.reconciler.reconcile(&request).await;
    ctx.metrics.observe_pass(&result, started.elapsed());

    report_status(&ctx, &parent, &request, &result).await;

    if result.is_success() {
        ctx.backoff.reset(&resource_key(&parent));
    }
    action_for(result)
}

/// Patch the parent status when the pass changed it. Failures are logged only.
async fn report_status(ctx: &Context, parent: &Polkadot, request: &ReconcileRequest, result: &AggregateResult) {
    let current = parent.status.as_ref();
    let Some(status) = desired_status(result, parent, current, chrono::Utc::now()) else {
        return;
    };
    if !status_needs_update(current, &status) {
        return;
    }
    match ctx
        .reconciler
        .client
        .patch_parent_status(&request.namespace, &request.name, &status)
        .await
    {
        Ok(()) => info!("Polkadot {} is {}", request, status.phase.as_str()),
        Err(e) => warn!("Failed to update status of Polkadot {}: {}", request, e),
    }
}

fn error_policy(parent: Arc<Polkadot>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = resource_key(&parent);
    let (delay, error_count) = ctx.backoff.next_backoff_for_resource(&key);
    error!(
        "Reconciliation error for Polkadot {} (attempt {}): {}, retrying in {}s",
        key,
        error_count,
        error,
        delay.as_secs()
    );
    Action::requeue(delay)
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watches `Polkadot` resources and their dependents.
pub struct Watcher {
    context: Arc<Context>,
    client: Client,
    namespace: Option<String>,
    controller_config: ControllerConfig,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context>,
        client: Client,
        namespace: Option<String>,
        concurrency: u16,
        debounce: Duration,
    ) -> Self {
        Self {
            context,
            client,
            namespace,
            controller_config: ControllerConfig::default()
                .debounce(debounce)
                .concurrency(concurrency),
        }
    }

    /// Starts watching Polkadot resources. Returns when the controller shuts down.
    pub async fn watch_polkadots(&self) -> Result<(), ControllerError> {
        let ns = self.namespace.as_deref();
        info!(
            "Starting Polkadot watcher ({})",
            ns.unwrap_or("all namespaces")
        );

        let parents: Api<Polkadot> = scoped_api(&self.client, ns);
        let wc = watcher::Config::default();

        let (reader, writer) = reflector::store();
        let parent_events = watcher(parents, wc.clone())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(predicates::generation);

        Controller::for_stream(parent_events, reader)
            .owns(scoped_api::<Deployment>(&self.client, ns), wc.clone())
            .owns(scoped_api::<Service>(&self.client, ns), wc.clone())
            .owns(scoped_api::<PersistentVolumeClaim>(&self.client, ns), wc.clone())
            .owns(scoped_api::<NetworkPolicy>(&self.client, ns), wc)
            .with_config(self.controller_config.clone())
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.context.clone())
            .for_each(|res| async move {
                match res {
                    Ok((object, _)) => debug!("Reconciled Polkadot {}", object.name),
                    Err(e) => warn!("Controller error for Polkadot: {}", e),
                }
            })
            .await;

        info!("Polkadot watcher stopped");
        Ok(())
    }
}
