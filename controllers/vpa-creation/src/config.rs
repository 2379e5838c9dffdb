//! Controller configuration.
//!
//! All settings come from environment variables and are read once at start-up.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Listen address for `/metrics`, `/healthz` and `/readyz`
    pub metrics_addr: SocketAddr,
    /// Period of the orphan sweep
    pub sweep_interval: Duration,
    /// Requeue delay while the VPA CRD is not installed
    pub capability_retry: Duration,
    /// Concurrent reconciles per workload kind
    pub concurrency: u16,
    /// Quiet period before a burst of events is reconciled
    pub debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            sweep_interval: Duration::from_secs(300),
            capability_retry: Duration::from_secs(60),
            concurrency: 3,
            debounce: Duration::from_secs(1),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let metrics_addr = parse_or(&lookup, "METRICS_ADDR", defaults.metrics_addr)?;
        let sweep_interval = parse_secs(&lookup, "SWEEP_INTERVAL_SECS", defaults.sweep_interval)?;
        let capability_retry = parse_secs(&lookup, "CAPABILITY_RETRY_SECS", defaults.capability_retry)?;
        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        let debounce = lookup("RECONCILE_DEBOUNCE_SECS")
            .map(|raw| parse_value::<u64>("RECONCILE_DEBOUNCE_SECS", &raw).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(defaults.debounce);

        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            namespace,
            metrics_addr,
            sweep_interval,
            capability_retry,
            concurrency,
            debounce,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ControllerError> {
    raw.trim().parse::<T>().map_err(|_| {
        ControllerError::InvalidConfig(format!("{} has invalid value '{}'", key, raw))
    })
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Parse a whole number of seconds that must be non-zero
fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(raw) => parse_value::<u64>(key, &raw)?,
        None => return Ok(default),
    };
    if secs == 0 {
        return Err(ControllerError::InvalidConfig(format!("{} must be greater than 0", key)));
    }
    Ok(Duration::from_secs(secs))
}
