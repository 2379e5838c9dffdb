//! VPA Creation Controller
//!
//! Creates an advisory VerticalPodAutoscaler (update mode `Off`) for every
//! Deployment, DaemonSet and StatefulSet annotated with
//! `k8s.autoscaling.vpacreation/vpa-enabled: "true"`, and deletes VPAs that
//! have lost all their owner references.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube uses rustls; pin the ring provider before the first client is built
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting VPA Creation Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Metrics address: {}", config.metrics_addr);
    info!("  Sweep interval: {}s", config.sweep_interval.as_secs());
    info!("  Capability retry: {}s", config.capability_retry.as_secs());
    info!("  Concurrency: {}, debounce: {}s", config.concurrency, config.debounce.as_secs());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
