//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::metrics::MetricsSink;
use crate::reconciler::Reconciler;
use crate::reconciler::policy::{ENABLED_VALUE, VPA_ENABLED_ANNOTATION};
use crds::{PodUpdatePolicy, TargetReference, VerticalPodAutoscaler, VerticalPodAutoscalerSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube_store::{MockKubeStore, Workload, WorkloadKind};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Metrics sink that records every increment
#[derive(Default)]
pub struct RecordingMetrics {
    created: Mutex<Vec<(WorkloadKind, String)>>,
    deleted: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingMetrics {
    /// Recorded creations as (kind, namespace)
    pub fn created(&self) -> Vec<(WorkloadKind, String)> {
        lock(&self.created).clone()
    }

    /// Recorded deletions by namespace
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn vpa_created(&self, kind: WorkloadKind, namespace: &str) {
        lock(&self.created).push((kind, namespace.to_string()));
    }

    fn orphan_deleted(&self, namespace: &str) {
        lock(&self.deleted).push(namespace.to_string());
    }
}

/// Helper to create a test workload with an `app=<name>` selector
pub fn create_test_workload(
    kind: WorkloadKind,
    namespace: &str,
    name: &str,
    opt_in: Option<&str>,
) -> Workload {
    let mut annotations = BTreeMap::new();
    if let Some(value) = opt_in {
        annotations.insert(VPA_ENABLED_ANNOTATION.to_string(), value.to_string());
    }
    Workload {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
        uid: format!("uid-{}-{}", namespace, name),
        selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), name.to_string())])),
            ..Default::default()
        }),
        annotations,
        resource_version: Some("1".to_string()),
    }
}

/// Helper to create an opted-in test workload
pub fn create_enabled_workload(kind: WorkloadKind, namespace: &str, name: &str) -> Workload {
    create_test_workload(kind, namespace, name, Some(ENABLED_VALUE))
}

/// Helper to create a test VPA, optionally owned by `owner`
pub fn create_test_vpa(namespace: &str, name: &str, owner: Option<&Workload>) -> VerticalPodAutoscaler {
    let target = owner.map_or_else(
        || TargetReference::new("apps/v1", "Deployment", "unknown"),
        |w| TargetReference::new(w.kind.api_version(), w.kind.as_str(), w.name.clone()),
    );
    VerticalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: owner.map(|w| vec![w.controller_owner_reference()]),
            ..Default::default()
        },
        spec: VerticalPodAutoscalerSpec {
            target_ref: target,
            update_policy: Some(PodUpdatePolicy::advisory_only()),
            resource_policy: None,
        },
        status: None,
    }
}

/// Owner reference to a workload that does not exist in any store
pub fn dangling_owner_reference() -> OwnerReference {
    OwnerReference {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        name: "deleted-long-ago".to_string(),
        uid: "uid-gone".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Create a reconciler sharing state with `store`, plus its recording sink
pub fn create_test_reconciler(store: &MockKubeStore) -> (Reconciler, Arc<RecordingMetrics>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let reconciler = Reconciler::new(Box::new(store.clone()), metrics.clone(), None);
    (reconciler, metrics)
}
