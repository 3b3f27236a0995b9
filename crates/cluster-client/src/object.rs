//! Dependent object kinds and the type-erased object passed across the client boundary.

use crate::error::ClusterError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;

/// Kind of a resource owned by a `Polkadot` parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependentKind {
    /// Node workload (`Deployment`)
    Workload,
    /// Network endpoint (`Service`)
    Endpoint,
    /// Chain data volume (`PersistentVolumeClaim`)
    StorageClaim,
    /// Traffic isolation for validators (`NetworkPolicy`)
    NetworkPolicy,
}

impl DependentKind {
    /// Kinds every parent owns, in processing order.
    pub const BASELINE: [DependentKind; 3] = [
        DependentKind::Workload,
        DependentKind::Endpoint,
        DependentKind::StorageClaim,
    ];

    /// Suffix appended to the parent name to form the dependent's name
    pub fn suffix(self) -> &'static str {
        match self {
            DependentKind::Workload => "deployment",
            DependentKind::Endpoint => "service",
            DependentKind::StorageClaim => "pvc",
            DependentKind::NetworkPolicy => "networkpolicy",
        }
    }

    /// Kubernetes kind name
    pub fn as_str(self) -> &'static str {
        match self {
            DependentKind::Workload => "Deployment",
            DependentKind::Endpoint => "Service",
            DependentKind::StorageClaim => "PersistentVolumeClaim",
            DependentKind::NetworkPolicy => "NetworkPolicy",
        }
    }

    /// Deterministic dependent name for a parent
    pub fn dependent_name(self, parent_name: &str) -> String {
        format!("{}-{}", parent_name, self.suffix())
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependent object of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DependentObject {
    Workload(Deployment),
    Endpoint(Service),
    StorageClaim(PersistentVolumeClaim),
    NetworkPolicy(NetworkPolicy),
}

impl DependentObject {
    pub fn kind(&self) -> DependentKind {
        match self {
            DependentObject::Workload(_) => DependentKind::Workload,
            DependentObject::Endpoint(_) => DependentKind::Endpoint,
            DependentObject::StorageClaim(_) => DependentKind::StorageClaim,
            DependentObject::NetworkPolicy(_) => DependentKind::NetworkPolicy,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DependentObject::Workload(o) => &o.metadata,
            DependentObject::Endpoint(o) => &o.metadata,
            DependentObject::StorageClaim(o) => &o.metadata,
            DependentObject::NetworkPolicy(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            DependentObject::Workload(o) => &mut o.metadata,
            DependentObject::Endpoint(o) => &mut o.metadata,
            DependentObject::StorageClaim(o) => &mut o.metadata,
            DependentObject::NetworkPolicy(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Name and namespace, or the first missing field
    pub fn object_key(&self) -> Result<(&str, &str), ClusterError> {
        let name = self.name().ok_or(ClusterError::MissingMetadata("name"))?;
        let namespace = self
            .namespace()
            .ok_or(ClusterError::MissingMetadata("namespace"))?;
        Ok((name, namespace))
    }
}

macro_rules! dependent_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DependentObject {
                fn from(value: $ty) -> Self {
                    DependentObject::$variant(value)
                }
            }

            impl TryFrom<DependentObject> for $ty {
                type Error = ClusterError;

                fn try_from(value: DependentObject) -> Result<Self, Self::Error> {
                    match value {
                        DependentObject::$variant(inner) => Ok(inner),
                        other => Err(ClusterError::KindMismatch {
                            expected: DependentKind::$variant,
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

dependent_conversions! {
    Workload => Deployment,
    Endpoint => Service,
    StorageClaim => PersistentVolumeClaim,
    NetworkPolicy => NetworkPolicy,
}
