//! `Polkadot` status derived from the result of a reconciliation pass.
//!
//! Status is only written when the phase, message or observed generation
//! changes. Writing on every pass would trigger a new watch event per pass
//! and keep the parent in a reconcile loop.

use crate::reconciler::{AggregateResult, StopReason};
use chrono::{DateTime, Utc};
use crds::{Polkadot, PolkadotPhase, PolkadotStatus};

/// Status a pass result should leave on the parent.
///
/// `None` when the parent is gone. `last_transition_time` is carried over
/// from `previous` unless the phase changes.
pub fn desired_status(
    result: &AggregateResult,
    parent: &Polkadot,
    previous: Option<&PolkadotStatus>,
    now: DateTime<Utc>,
) -> Option<PolkadotStatus> {
    let (phase, message) = match result {
        AggregateResult::Stop(StopReason::ParentNotFound) => return None,
        AggregateResult::Stop(StopReason::Converged) => (
            PolkadotPhase::Ready,
            "All dependents match the spec".to_string(),
        ),
        AggregateResult::RequeueImmediate { kind } => {
            (PolkadotPhase::Provisioning, format!("Created {kind}"))
        }
        AggregateResult::RequeueWithError { kind: Some(kind), cause } => {
            (PolkadotPhase::Degraded, format!("Failed to reconcile {kind}: {cause}"))
        }
        AggregateResult::RequeueWithError { kind: None, cause } => {
            (PolkadotPhase::Degraded, format!("Failed to read parent: {cause}"))
        }
    };

    let last_transition_time = match previous {
        Some(previous) if previous.phase == phase => previous.last_transition_time.or(Some(now)),
        _ => Some(now),
    };

    Some(PolkadotStatus {
        phase,
        message: Some(message),
        observed_generation: parent.metadata.generation,
        last_transition_time,
    })
}

/// Whether `desired` differs from `current` in a field worth a write.
///
/// `last_transition_time` is ignored; it only changes together with the phase.
pub fn status_needs_update(current: Option<&PolkadotStatus>, desired: &PolkadotStatus) -> bool {
    match current {
        None => true,
        Some(current) => {
            current.phase != desired.phase
                || current.message != desired.message
                || current.observed_generation != desired.observed_generation
        }
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod status_test;
