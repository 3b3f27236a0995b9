//! Outcome of synchronizing one dependent and the pass-level state machine
//! that folds those outcomes into a requeue decision.

use super::diff::DriftField;
use cluster_client::{ClusterError, DependentKind};

/// Result of synchronizing one dependent.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The dependent was absent and has been created
    Created,
    /// The dependent drifted; these fields were written back
    UpdatedFields(Vec<DriftField>),
    /// The dependent already matched
    Unchanged,
    /// A platform call failed
    Failed(ClusterError),
}

impl ReconcileOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::UpdatedFields(_) => "updated",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every dependent exists and matches
    Converged,
    /// The parent is gone; dependents are left to garbage collection
    ParentNotFound,
}

/// Classification of a whole pass, handed to the platform adapter.
#[derive(Debug)]
pub enum AggregateResult {
    /// Nothing more to do until the next change
    Stop(StopReason),
    /// `kind` was just created; run the pass again right away
    RequeueImmediate { kind: DependentKind },
    /// The pass failed; retry after backoff. `kind` is `None` when the parent fetch failed.
    RequeueWithError {
        kind: Option<DependentKind>,
        cause: ClusterError,
    },
}

impl AggregateResult {
    /// `Stop` and `RequeueImmediate` are success terminals
    pub fn is_success(&self) -> bool {
        !matches!(self, AggregateResult::RequeueWithError { .. })
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            AggregateResult::Stop(StopReason::Converged) => "converged",
            AggregateResult::Stop(StopReason::ParentNotFound) => "parent_not_found",
            AggregateResult::RequeueImmediate { .. } => "requeue",
            AggregateResult::RequeueWithError { .. } => "error",
        }
    }
}

/// Whether the orchestrator should go on to the next dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

#[derive(Debug)]
enum PassState {
    Idle,
    Running,
    Done(AggregateResult),
}

/// State machine of one reconciliation pass.
///
/// `Idle` until the parent has been read, `Running` while dependents are
/// synchronized, then one of the three terminals. The first outcome that
/// requires a requeue ends the pass; later observations are ignored.
#[derive(Debug)]
pub struct ReconcilePass {
    state: PassState,
}

impl Default for ReconcilePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcilePass {
    pub fn new() -> Self {
        Self {
            state: PassState::Idle,
        }
    }

    /// Parent was read; dependents are about to be processed
    pub fn start(&mut self) {
        if matches!(self.state, PassState::Idle) {
            self.state = PassState::Running;
        }
    }

    /// End the pass successfully before any dependent is touched
    pub fn stop(&mut self, reason: StopReason) {
        if !self.is_done() {
            self.state = PassState::Done(AggregateResult::Stop(reason));
        }
    }

    /// End the pass with an error not attributable to a dependent
    pub fn fail(&mut self, cause: ClusterError) {
        if !self.is_done() {
            self.state = PassState::Done(AggregateResult::RequeueWithError { kind: None, cause });
        }
    }

    /// Fold one dependent's outcome into the pass
    pub fn observe(&mut self, kind: DependentKind, outcome: ReconcileOutcome) -> Flow {
        if self.is_done() {
            return Flow::Halt;
        }
        self.start();

        match outcome {
            ReconcileOutcome::Created => {
                self.state = PassState::Done(AggregateResult::RequeueImmediate { kind });
                Flow::Halt
            }
            ReconcileOutcome::Failed(cause) => {
                self.state = PassState::Done(AggregateResult::RequeueWithError {
                    kind: Some(kind),
                    cause,
                });
                Flow::Halt
            }
            ReconcileOutcome::Unchanged | ReconcileOutcome::UpdatedFields(_) => Flow::Continue,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, PassState::Done(_))
    }

    /// Final result; a pass that ran out of dependents has converged
    pub fn finish(self) -> AggregateResult {
        match self.state {
            PassState::Done(result) => result,
            PassState::Idle | PassState::Running => AggregateResult::Stop(StopReason::Converged),
        }
    }
}
