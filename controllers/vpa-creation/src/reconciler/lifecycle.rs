//! Advisory VPA lifecycle.
//!
//! Ensures an opted-in workload has exactly one VPA. The VPA is created once and
//! never modified afterwards; its update mode is always `Off`, so it only
//! publishes recommendations.

use super::naming::advisory_name;
use crate::metrics::MetricsSink;
use crds::{PodUpdatePolicy, TargetReference, UpdateMode, VerticalPodAutoscaler, VerticalPodAutoscalerSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_store::{KubeStoreTrait, StoreError, Workload, WorkloadKind};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Label marking VPAs created by this controller
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of `MANAGED_BY_LABEL`
pub const MANAGED_BY_VALUE: &str = "vpa-creation-controller";

/// Result of ensuring a workload's VPA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The VPA already existed; nothing was written
    Present,
    /// This reconcile created the VPA
    Created,
    /// Another writer created the VPA first
    CreatedConcurrently,
    /// The VPA kind is not installed in the cluster
    KindNotRegistered,
}

/// Build the VPA for a workload.
///
/// Name, target reference and owner reference depend only on the workload's
/// kind and identity.
pub fn build_advisory(workload: &Workload) -> VerticalPodAutoscaler {
    VerticalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(advisory_name(&workload.name)),
            namespace: Some(workload.namespace.clone()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            owner_references: Some(vec![workload.controller_owner_reference()]),
            ..Default::default()
        },
        spec: VerticalPodAutoscalerSpec {
            target_ref: TargetReference::new(
                workload.kind.api_version(),
                workload.kind.as_str(),
                workload.name.clone(),
            ),
            update_policy: Some(PodUpdatePolicy::advisory_only()),
            resource_policy: None,
        },
        status: None,
    }
}

/// How an existing VPA differs from the one `build_advisory` would write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// The target kind is not one this controller manages
    UnsupportedTarget { kind: String, name: String },
    /// The target is another workload
    OtherTarget { kind: WorkloadKind, name: String },
    /// The update mode is not `Off`; `None` when unset
    NotAdvisory(Option<UpdateMode>),
}

/// Compare an existing VPA with the one expected for `workload`.
///
/// Only reported, never corrected: existing VPAs are left as they are.
pub fn drift(existing: &VerticalPodAutoscaler, workload: &Workload) -> Vec<Drift> {
    let mut found = Vec::new();

    let target = &existing.spec.target_ref;
    if !target.points_at(workload.kind.as_str(), &workload.name) {
        found.push(match WorkloadKind::from_kind_name(&target.kind) {
            Some(kind) => Drift::OtherTarget {
                kind,
                name: target.name.clone(),
            },
            None => Drift::UnsupportedTarget {
                kind: target.kind.clone(),
                name: target.name.clone(),
            },
        });
    }

    let mode = existing.update_mode();
    if mode != Some(UpdateMode::Off) {
        found.push(Drift::NotAdvisory(mode));
    }

    found
}

/// Make sure `workload` has its VPA, creating it if absent.
///
/// Safe to call concurrently and repeatedly for the same workload: a create
/// that loses a race reports already-exists, which counts as success.
pub async fn ensure_advisory(
    store: &dyn KubeStoreTrait,
    metrics: &dyn MetricsSink,
    workload: &Workload,
) -> Result<LifecycleOutcome, StoreError> {
    let name = advisory_name(&workload.name);
    let namespace = workload.namespace.as_str();

    match store.get_vpa(namespace, &name).await {
        Ok(existing) => {
            debug!(namespace, name = %name, "VPA already exists");
            for d in drift(&existing, workload) {
                warn!(namespace, name = %name, "Existing VPA left unchanged: {:?}", d);
            }
            return Ok(LifecycleOutcome::Present);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => {
            error!(namespace, name = %name, "Failed to look up VPA: {}", e);
            return Err(e);
        }
    }

    let vpa = build_advisory(workload);
    info!(
        kind = %workload.kind,
        namespace,
        name = %name,
        selector = %workload.selector_display(),
        workload_version = workload.resource_version.as_deref().unwrap_or("<none>"),
        "Creating VPA for {} {}",
        workload.kind,
        workload.name
    );

    match store.create_vpa(&vpa).await {
        Ok(_) => {
            metrics.vpa_created(workload.kind, namespace);
            info!(namespace, name = %name, "Created VPA");
            Ok(LifecycleOutcome::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(namespace, name = %name, "VPA was created concurrently");
            Ok(LifecycleOutcome::CreatedConcurrently)
        }
        Err(e) if e.is_kind_not_registered() => {
            warn!(namespace, name = %name, "VPA CRD not installed, will retry later");
            Ok(LifecycleOutcome::KindNotRegistered)
        }
        Err(e) => {
            error!(namespace, name = %name, "Failed to create VPA: {}", e);
            Err(e)
        }
    }
}
