//! Process configuration loaded from environment variables.

use crate::error::ControllerError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Static inputs to the desired-state builders.
///
/// Part of the process configuration, never read from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentTemplate {
    /// Image repository; the tag comes from `spec.version`
    pub image_repository: String,
    pub storage_class: String,
    /// Storage request of the data volume, as a Kubernetes quantity
    pub storage_size: String,
}

impl Default for DependentTemplate {
    fn default() -> Self {
        Self {
            image_repository: "chevdor/polkadot".to_string(),
            storage_class: "polkadot".to_string(),
            storage_size: "2Gi".to_string(),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, all namespaces when `None`
    pub namespace: Option<String>,
    pub template: DependentTemplate,
    /// Maximum number of parents reconciled concurrently
    pub concurrency: u16,
    pub debounce: Duration,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub metrics_port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            template: DependentTemplate::default(),
            concurrency: 1,
            debounce: Duration::ZERO,
            backoff_min: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
            metrics_port: 8080,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string_or = |key: &str, default: String| {
            lookup(key).filter(|value| !value.is_empty()).unwrap_or(default)
        };

        let config = Self {
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            template: DependentTemplate {
                image_repository: string_or("POLKADOT_IMAGE", defaults.template.image_repository),
                storage_class: string_or("POLKADOT_STORAGE_CLASS", defaults.template.storage_class),
                storage_size: string_or("POLKADOT_STORAGE_SIZE", defaults.template.storage_size),
            },
            concurrency: parse_var(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?,
            debounce: Duration::from_secs(parse_var(
                &lookup,
                "RECONCILE_DEBOUNCE_SECONDS",
                defaults.debounce.as_secs(),
            )?),
            backoff_min: Duration::from_secs(parse_var(
                &lookup,
                "BACKOFF_MIN_SECONDS",
                defaults.backoff_min.as_secs(),
            )?),
            backoff_max: Duration::from_secs(parse_var(
                &lookup,
                "BACKOFF_MAX_SECONDS",
                defaults.backoff_max.as_secs(),
            )?),
            metrics_port: parse_var(&lookup, "METRICS_PORT", defaults.metrics_port)?,
        };

        if config.backoff_min.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "BACKOFF_MIN_SECONDS must be greater than zero".to_string(),
            ));
        }
        if config.backoff_min > config.backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MIN_SECONDS ({}) exceeds BACKOFF_MAX_SECONDS ({})",
                config.backoff_min.as_secs(),
                config.backoff_max.as_secs()
            )));
        }
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{key}={raw:?} is not valid: {e}"))
        }),
        _ => Ok(default),
    }
}
