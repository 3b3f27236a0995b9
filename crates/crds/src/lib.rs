//! Polkadot operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Polkadot operator.

pub mod polkadot;

pub use polkadot::*;
