//! Controller metrics.
//!
//! The reconciler reports through the `MetricsSink` trait, which is handed to
//! it at construction. The binary uses `ControllerMetrics`, backed by its own
//! Prometheus registry; tests use a recording sink.

use crate::error::ControllerError;
use kube_store::WorkloadKind;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counter sink used by the reconciler
pub trait MetricsSink: Send + Sync {
    /// A VPA was created for a workload of `kind` in `namespace`
    fn vpa_created(&self, kind: WorkloadKind, namespace: &str);

    /// An orphaned VPA was deleted from `namespace`
    fn orphan_deleted(&self, namespace: &str);
}

/// Prometheus-backed metrics
#[derive(Clone)]
pub struct ControllerMetrics {
    registry: Registry,
    vpa_created: IntCounterVec,
    vpa_deleted: IntCounterVec,
}

impl ControllerMetrics {
    /// Create the collectors and register them with a fresh registry
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let vpa_created = IntCounterVec::new(
            Opts::new(
                "vpactrl_created_vpa_total",
                "Number of VPAs successfully created by the controller",
            ),
            &["kind", "namespace"],
        )?;
        let vpa_deleted = IntCounterVec::new(
            Opts::new(
                "vpactrl_deleted_orphaned_vpa_total",
                "Number of orphaned VPAs deleted by the controller",
            ),
            &["namespace"],
        )?;

        registry.register(Box::new(vpa_created.clone()))?;
        registry.register(Box::new(vpa_deleted.clone()))?;

        Ok(Self {
            registry,
            vpa_created,
            vpa_deleted,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, ControllerError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ControllerError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

impl MetricsSink for ControllerMetrics {
    fn vpa_created(&self, kind: WorkloadKind, namespace: &str) {
        self.vpa_created
            .with_label_values(&[kind.as_str(), namespace])
            .inc();
    }

    fn orphan_deleted(&self, namespace: &str) {
        self.vpa_deleted.with_label_values(&[namespace]).inc();
    }
}
