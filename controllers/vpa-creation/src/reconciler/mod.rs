//! Reconciliation logic for advisory VPAs.
//!
//! One entry point, `Reconciler::reconcile`, handles two kinds of trigger:
//! - the sweep key runs the orphan collector
//! - a (namespace, name) key is resolved to a workload, checked against the
//!   opt-in annotation and, when enabled, given its VPA
//!
//! The reconciler holds no mutable state. Every decision is made from fresh
//! store reads, so concurrent or repeated reconciles of the same key are safe.

pub mod lifecycle;
#[cfg(test)]
mod lifecycle_test;
pub mod naming;
pub mod orphan;
pub mod policy;
pub mod trigger;

use crate::error::ControllerError;
use crate::metrics::MetricsSink;
use kube::ResourceExt;
use kube_store::{KubeStoreTrait, WorkloadKind};
use lifecycle::LifecycleOutcome;
use orphan::{SweepOutcome, SweepReport};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Key identifying what to reconcile
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReconcileKey {
    /// Global orphan sweep
    Sweep,
    /// A named object; its kind is resolved at reconcile time
    Object { namespace: String, name: String },
}

impl ReconcileKey {
    /// Key for a (namespace, name) pair. An empty or `*` name is the sweep key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() || name == "*" {
            return Self::Sweep;
        }
        Self::Object {
            namespace: namespace.into(),
            name,
        }
    }

    /// Key for a watched object
    pub fn for_resource<K: ResourceExt>(resource: &K) -> Self {
        Self::new(
            resource.namespace().unwrap_or_else(|| "default".to_string()),
            resource.name_any(),
        )
    }
}

impl fmt::Display for ReconcileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sweep => f.write_str("*"),
            Self::Object { namespace, name } => write!(f, "{}/{}", namespace, name),
        }
    }
}

/// How a reconcile ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The orphan sweep ran
    Swept(SweepReport),
    /// The key names no supported workload
    NoMatch,
    /// The workload is not opted in
    NotOptedIn { kind: WorkloadKind },
    /// The workload already had its VPA (possibly created by a racing writer)
    AdvisoryPresent { kind: WorkloadKind },
    /// This reconcile created the workload's VPA
    AdvisoryCreated { kind: WorkloadKind },
    /// The VPA kind is not installed; try again later
    CapabilityUnavailable,
}

/// Reconciles advisory VPAs against workloads.
pub struct Reconciler {
    pub(crate) store: Box<dyn KubeStoreTrait + Send + Sync>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    /// Namespace the sweep lists; `None` for all namespaces
    pub(crate) sweep_namespace: Option<String>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: Box<dyn KubeStoreTrait + Send + Sync>,
        metrics: Arc<dyn MetricsSink>,
        sweep_namespace: Option<String>,
    ) -> Self {
        Self {
            store,
            metrics,
            sweep_namespace,
        }
    }

    /// Reconcile one key.
    ///
    /// Errors are store failures that should be retried with backoff. Absence,
    /// create conflicts and a missing VPA kind are not errors.
    pub async fn reconcile(&self, key: &ReconcileKey) -> Result<ReconcileOutcome, ControllerError> {
        match key {
            ReconcileKey::Sweep => self.sweep().await,
            ReconcileKey::Object { namespace, name } => self.reconcile_object(namespace, name).await,
        }
    }

    async fn sweep(&self) -> Result<ReconcileOutcome, ControllerError> {
        let outcome = orphan::collect_orphans(
            self.store.as_ref(),
            self.metrics.as_ref(),
            self.sweep_namespace.as_deref(),
        )
        .await?;

        Ok(match outcome {
            SweepOutcome::Completed(report) => {
                if report.orphans > 0 {
                    info!(
                        "Orphan sweep deleted {} of {} orphaned VPAs ({} scanned)",
                        report.deleted, report.orphans, report.scanned
                    );
                }
                ReconcileOutcome::Swept(report)
            }
            SweepOutcome::KindNotRegistered => ReconcileOutcome::CapabilityUnavailable,
        })
    }

    async fn reconcile_object(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        debug!(namespace, name, "Reconciling");

        let Some(workload) = trigger::resolve(self.store.as_ref(), namespace, name).await? else {
            return Ok(ReconcileOutcome::NoMatch);
        };
        let kind = workload.kind;

        if !policy::is_enabled(&workload.annotations) {
            debug!(kind = %kind, namespace, name, "Workload not opted in");
            return Ok(ReconcileOutcome::NotOptedIn { kind });
        }

        let outcome =
            lifecycle::ensure_advisory(self.store.as_ref(), self.metrics.as_ref(), &workload).await?;

        Ok(match outcome {
            LifecycleOutcome::Created => ReconcileOutcome::AdvisoryCreated { kind },
            LifecycleOutcome::Present | LifecycleOutcome::CreatedConcurrently => {
                ReconcileOutcome::AdvisoryPresent { kind }
            }
            LifecycleOutcome::KindNotRegistered => ReconcileOutcome::CapabilityUnavailable,
        })
    }
}
