//! Reconciliation pass tests against the in-memory cluster

use super::*;
use crate::test_utils::{create_test_polkadot, create_test_reconciler, sentry_and_validator};
use cluster_client::{ClusterCall, ClusterError, DependentObject, MockOperation};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::networking::v1::NetworkPolicy;

/// Run passes until one does not ask for an immediate requeue
async fn converge(reconciler: &Reconciler, request: &ReconcileRequest) -> AggregateResult {
    for _ in 0..10 {
        let result = reconciler.reconcile(request).await;
        if !matches!(result, AggregateResult::RequeueImmediate { .. }) {
            return result;
        }
    }
    panic!("reconciliation did not converge");
}

fn request() -> ReconcileRequest {
    ReconcileRequest::new("default", "alice")
}

#[tokio::test]
async fn test_first_pass_creates_workload_and_requeues() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(
        result,
        AggregateResult::RequeueImmediate {
            kind: DependentKind::Workload
        }
    ));
    assert_eq!(client.dependent_count(), 1);
    assert!(
        client
            .dependent(DependentKind::Workload, "default", "alice-deployment")
            .is_some()
    );
}

#[tokio::test]
async fn test_passes_converge_after_creating_each_dependent() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);

    let mut created = Vec::new();
    loop {
        match reconciler.reconcile(&request()).await {
            AggregateResult::RequeueImmediate { kind } => created.push(kind),
            AggregateResult::Stop(StopReason::Converged) => break,
            other => panic!("unexpected result {other:?}"),
        }
    }
    assert_eq!(
        created,
        vec![
            DependentKind::Workload,
            DependentKind::Endpoint,
            DependentKind::StorageClaim
        ]
    );
    assert_eq!(client.dependent_count(), 3);
    assert!(
        client
            .dependent(DependentKind::NetworkPolicy, "default", "alice-networkpolicy")
            .is_none()
    );
}

#[tokio::test]
async fn test_sentry_and_validator_adds_network_policy() {
    let parent = sentry_and_validator(create_test_polkadot("alice", "default", 1, "v1"));
    let (reconciler, client) = create_test_reconciler(&[parent]);

    let result = converge(&reconciler, &request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));
    assert_eq!(client.dependent_count(), 4);
    assert!(
        client
            .dependent(DependentKind::NetworkPolicy, "default", "alice-networkpolicy")
            .is_some()
    );
}

#[tokio::test]
async fn test_scaled_down_validator_converges_without_rewrites() {
    let parent = sentry_and_validator(create_test_polkadot("alice", "default", 0, "v1"));
    let (reconciler, client) = create_test_reconciler(&[parent.clone()]);

    let result = converge(&reconciler, &request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));

    let policy: NetworkPolicy = client
        .dependent(DependentKind::NetworkPolicy, "default", "alice-networkpolicy")
        .unwrap()
        .try_into()
        .unwrap();
    let pod_selector = policy.spec.unwrap().pod_selector.unwrap();
    assert_eq!(
        pod_selector.match_labels,
        Some(builder::selector_labels(&parent))
    );

    client.clear_calls();
    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));
    assert!(!client.calls().iter().any(ClusterCall::is_dependent_write));
}

#[tokio::test]
async fn test_converged_pass_is_idempotent() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    converge(&reconciler, &request()).await;
    client.clear_calls();

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));
    assert!(!client.calls().iter().any(ClusterCall::is_dependent_write));
}

#[tokio::test]
async fn test_replica_drift_is_corrected_with_single_update() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    converge(&reconciler, &request()).await;

    client.add_parent(create_test_polkadot("alice", "default", 5, "v1"));
    client.clear_calls();

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));

    let writes: Vec<ClusterCall> = client
        .calls()
        .into_iter()
        .filter(ClusterCall::is_dependent_write)
        .collect();
    assert_eq!(
        writes,
        vec![ClusterCall::UpdateDependent {
            kind: DependentKind::Workload,
            name: "alice-deployment".to_string(),
        }]
    );

    let stored: Deployment = client
        .dependent(DependentKind::Workload, "default", "alice-deployment")
        .unwrap()
        .try_into()
        .unwrap();
    let spec = stored.spec.unwrap();
    assert_eq!(spec.replicas, Some(5));
    let labels = stored.metadata.labels.unwrap();
    assert_eq!(labels["version"], "v1");
    assert_eq!(
        spec.template.spec.unwrap().containers[0].image.as_deref(),
        Some("chevdor/polkadot:v1")
    );
}

#[tokio::test]
async fn test_version_change_updates_label_and_image() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    converge(&reconciler, &request()).await;

    client.add_parent(create_test_polkadot("alice", "default", 2, "v2"));
    reconciler.reconcile(&request()).await;

    let stored: Deployment = client
        .dependent(DependentKind::Workload, "default", "alice-deployment")
        .unwrap()
        .try_into()
        .unwrap();
    assert_eq!(stored.metadata.labels.unwrap()["version"], "v2");
    assert_eq!(
        stored.spec.unwrap().template.spec.unwrap().containers[0].image.as_deref(),
        Some("chevdor/polkadot:v2")
    );
}

#[tokio::test]
async fn test_server_populated_fields_cause_no_update() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    converge(&reconciler, &request()).await;

    // Cluster IP and defaults were filled in by the mock on create
    let DependentObject::Endpoint(service) = client
        .dependent(DependentKind::Endpoint, "default", "alice-service")
        .unwrap()
    else {
        panic!("expected a Service");
    };
    assert!(service.spec.unwrap().cluster_ip.is_some());

    client.clear_calls();
    reconciler.reconcile(&request()).await;
    assert!(!client.calls().iter().any(ClusterCall::is_dependent_write));
}

#[tokio::test]
async fn test_missing_parent_stops_without_dependent_calls() {
    let (reconciler, client) = create_test_reconciler(&[]);

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::ParentNotFound)));
    assert!(!client.calls().iter().any(ClusterCall::is_dependent_call));
}

#[tokio::test]
async fn test_parent_fetch_error_requeues_with_error() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    client.fail_on(MockOperation::GetParent, None);

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(
        result,
        AggregateResult::RequeueWithError { kind: None, .. }
    ));
    assert!(!client.calls().iter().any(ClusterCall::is_dependent_call));
}

#[tokio::test]
async fn test_dependent_failure_halts_pass() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    client.fail_on(MockOperation::CreateDependent, Some(DependentKind::Endpoint));

    // Workload is created first
    reconciler.reconcile(&request()).await;
    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(
        result,
        AggregateResult::RequeueWithError {
            kind: Some(DependentKind::Endpoint),
            cause: ClusterError::Transient(_),
        }
    ));
    assert!(
        !client
            .calls()
            .iter()
            .any(|call| matches!(call, ClusterCall::GetDependent { kind: DependentKind::StorageClaim, .. }))
    );

    client.clear_failures();
    let result = converge(&reconciler, &request()).await;
    assert!(matches!(result, AggregateResult::Stop(StopReason::Converged)));
}

#[tokio::test]
async fn test_every_create_is_preceded_by_ownership() {
    let parent = sentry_and_validator(create_test_polkadot("alice", "default", 1, "v1"));
    let (reconciler, client) = create_test_reconciler(&[parent]);
    converge(&reconciler, &request()).await;

    let calls = client.calls();
    for (index, call) in calls.iter().enumerate() {
        if let ClusterCall::CreateDependent { kind, name } = call {
            assert!(index > 0, "create without preceding call");
            assert_eq!(
                calls[index - 1],
                ClusterCall::SetOwnership {
                    kind: *kind,
                    name: name.clone(),
                }
            );
        }
    }

    let validator = sentry_and_validator(create_test_polkadot("alice", "default", 1, "v1"));
    for kind in Reconciler::dependent_kinds(&validator.spec) {
        let stored = client
            .dependent(kind, "default", &kind.dependent_name("alice"))
            .unwrap();
        let owners = stored.metadata().owner_references.clone().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "uid-default-alice");
        assert_eq!(owners[0].controller, Some(true));
    }
}

#[tokio::test]
async fn test_concurrent_update_conflict_requeues_with_error() {
    let (reconciler, client) = create_test_reconciler(&[create_test_polkadot("alice", "default", 2, "v1")]);
    converge(&reconciler, &request()).await;
    client.fail_on(MockOperation::UpdateDependent, Some(DependentKind::Workload));
    client.add_parent(create_test_polkadot("alice", "default", 3, "v1"));

    let result = reconciler.reconcile(&request()).await;
    assert!(matches!(
        result,
        AggregateResult::RequeueWithError {
            kind: Some(DependentKind::Workload),
            ..
        }
    ));
}

#[test]
fn test_dependent_kinds_order() {
    let parent = create_test_polkadot("alice", "default", 1, "v1");
    assert_eq!(
        Reconciler::dependent_kinds(&parent.spec),
        DependentKind::BASELINE.to_vec()
    );
    let validator = sentry_and_validator(parent);
    assert_eq!(
        Reconciler::dependent_kinds(&validator.spec).last(),
        Some(&DependentKind::NetworkPolicy)
    );
}

#[test]
fn test_request_for_parent() {
    let parent = create_test_polkadot("alice", "chains", 1, "v1");
    let request = ReconcileRequest::for_parent(&parent).unwrap();
    assert_eq!(request, ReconcileRequest::new("chains", "alice"));
    assert_eq!(request.to_string(), "chains/alice");
}
