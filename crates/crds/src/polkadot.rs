//! Polkadot CRD
//!
//! Declares a Polkadot node: how many replicas to run, which client version,
//! and which topology (plain node or sentry/validator pair) applies.
//!
//! The operator derives a Deployment, a Service, a PersistentVolumeClaim and,
//! for validator topologies, a NetworkPolicy from this spec.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "polkadot.microscaler.io",
    version = "v1alpha1",
    kind = "Polkadot",
    namespaced,
    status = "PolkadotStatus",
    shortname = "dot",
    printcolumn = r#"{"name":"Size", "type":"integer", "jsonPath":".spec.size"}"#,
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PolkadotSpec {
    /// Desired replica count of the node workload (zero scales the workload down)
    #[schemars(range(min = 0))]
    pub size: i32,

    /// Client version, used as the container image tag
    pub version: String,

    /// Node topology
    #[serde(default)]
    pub kind: NodeKind,
}

/// Topology of a Polkadot deployment.
///
/// Selects which dependent resources the operator manages in addition to the
/// workload, endpoint and storage claim that every node gets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Single full node, no traffic isolation
    #[default]
    Default,

    /// Validator shielded behind sentry nodes; traffic is restricted by a NetworkPolicy
    SentryAndValidator,
}

impl NodeKind {
    /// Whether this topology needs a NetworkPolicy isolating the node pods
    pub fn requires_network_policy(self) -> bool {
        matches!(self, NodeKind::SentryAndValidator)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolkadotStatus {
    /// Coarse lifecycle phase derived from the last reconciliation pass
    pub phase: PolkadotPhase,

    /// Human readable detail for the phase (created dependent, error cause)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// `metadata.generation` the phase was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Set only when the phase changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum PolkadotPhase {
    /// Not reconciled yet
    #[default]
    Pending,

    /// Dependents are still being created
    Provisioning,

    /// All dependents exist and match the spec
    Ready,

    /// Last pass failed and will be retried with backoff
    Degraded,
}

impl PolkadotPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            PolkadotPhase::Pending => "Pending",
            PolkadotPhase::Provisioning => "Provisioning",
            PolkadotPhase::Ready => "Ready",
            PolkadotPhase::Degraded => "Degraded",
        }
    }
}
