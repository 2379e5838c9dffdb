//! Orphaned VPA collection.
//!
//! A VPA with an empty owner-reference list is deleted. VPAs that list any
//! owner are left alone, even if that owner is gone: dependents of deleted
//! owners are the API server garbage collector's job.

use super::naming::workload_name;
use crate::metrics::MetricsSink;
use kube_store::{KubeStoreTrait, StoreError};
use tracing::{debug, info, warn};

/// Counts from one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// VPAs listed
    pub scanned: usize,
    /// VPAs without owner references
    pub orphans: usize,
    /// Orphans deleted by this sweep
    pub deleted: usize,
    /// Orphans that were already gone when deleted
    pub already_gone: usize,
    /// Orphans whose delete failed; retried on the next sweep
    pub failed: usize,
}

/// Result of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// The VPA kind is not installed, so there is nothing to collect yet
    KindNotRegistered,
}

/// Delete every VPA that has no owner reference.
///
/// Individual delete failures are logged and counted, and the sweep moves on.
/// Only a failure to list aborts the sweep.
pub async fn collect_orphans(
    store: &dyn KubeStoreTrait,
    metrics: &dyn MetricsSink,
    namespace: Option<&str>,
) -> Result<SweepOutcome, StoreError> {
    let vpas = match store.list_vpas(namespace).await {
        Ok(vpas) => vpas,
        Err(e) if e.is_kind_not_registered() => {
            info!("VPA CRD not found, skipping orphan sweep");
            return Ok(SweepOutcome::KindNotRegistered);
        }
        Err(e) => {
            warn!("Failed to list VPAs for orphan sweep: {}", e);
            return Err(e);
        }
    };

    let mut report = SweepReport {
        scanned: vpas.len(),
        ..Default::default()
    };

    for vpa in vpas.iter().filter(|vpa| vpa.has_no_owners()) {
        report.orphans += 1;

        let Some(name) = vpa.metadata.name.as_deref() else {
            warn!("Skipping orphaned VPA without a name");
            report.failed += 1;
            continue;
        };
        let vpa_namespace = vpa.metadata.namespace.as_deref().unwrap_or("default");

        info!(
            namespace = vpa_namespace,
            name,
            workload = workload_name(name).unwrap_or("<unknown>"),
            "Deleting orphaned VPA"
        );

        match store.delete_vpa(vpa_namespace, name).await {
            Ok(()) => {
                metrics.orphan_deleted(vpa_namespace);
                report.deleted += 1;
            }
            Err(e) if e.is_not_found() => {
                debug!(namespace = vpa_namespace, name, "Orphaned VPA already deleted");
                report.already_gone += 1;
            }
            Err(e) => {
                warn!(namespace = vpa_namespace, name, "Failed to delete orphaned VPA: {}", e);
                report.failed += 1;
            }
        }
    }

    debug!(
        scanned = report.scanned,
        orphans = report.orphans,
        deleted = report.deleted,
        failed = report.failed,
        "Orphan sweep finished"
    );
    Ok(SweepOutcome::Completed(report))
}
