//! Prometheus metrics for reconciliation passes and dependent outcomes.

use crate::reconciler::{AggregateResult, ReconcileOutcome};
use cluster_client::DependentKind;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Collectors registered on an injected registry.
#[derive(Clone)]
pub struct Metrics {
    passes: IntCounterVec,
    dependent_outcomes: IntCounterVec,
    pass_duration: HistogramVec,
}

impl Metrics {
    /// Create the collectors and register them with `registry`
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let passes = IntCounterVec::new(
            Opts::new(
                "polkadot_reconcile_passes_total",
                "Reconciliation passes by result",
            ),
            &["result"],
        )?;
        let dependent_outcomes = IntCounterVec::new(
            Opts::new(
                "polkadot_dependent_outcomes_total",
                "Dependent synchronization outcomes by kind",
            ),
            &["kind", "outcome"],
        )?;
        let pass_duration = HistogramVec::new(
            HistogramOpts::new(
                "polkadot_reconcile_duration_seconds",
                "Duration of reconciliation passes",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["result"],
        )?;

        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(dependent_outcomes.clone()))?;
        registry.register(Box::new(pass_duration.clone()))?;

        Ok(Self {
            passes,
            dependent_outcomes,
            pass_duration,
        })
    }

    pub fn observe_pass(&self, result: &AggregateResult, elapsed: Duration) {
        let label = result.label();
        self.passes.with_label_values(&[label]).inc();
        self.pass_duration
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_outcome(&self, kind: DependentKind, outcome: &ReconcileOutcome) {
        self.dependent_outcomes
            .with_label_values(&[kind.as_str(), outcome.label()])
            .inc();
    }
}

/// Render `registry` in the Prometheus text exposition format
pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
