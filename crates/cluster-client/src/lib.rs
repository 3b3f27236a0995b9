//! Cluster client for the Polkadot operator
//!
//! The reconciler only talks to Kubernetes through [`ClusterClientTrait`]:
//! fetch the parent `Polkadot`, fetch/create/update one dependent object,
//! attach the ownership linkage, and report status.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, DependentKind, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//! client.validate_connectivity().await?;
//!
//! let deployment = client
//!     .get_dependent(DependentKind::Workload, "alice-deployment", "default")
//!     .await?;
//! println!("present: {}", deployment.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-util`: enables [`MockClusterClient`], an in-memory cluster that
//!   records every call for assertions.

pub mod client;
pub mod error;
pub mod object;
pub mod ownership;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use object::{DependentKind, DependentObject};
pub use ownership::attach_controller_reference;
#[cfg(feature = "test-util")]
pub use mock::{ClusterCall, MockClusterClient, MockOperation};
