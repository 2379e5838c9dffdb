//! Workload models
//!
//! A `Workload` is the controller's read-only view of a Deployment, DaemonSet
//! or StatefulSet: identity, selector and annotations. `WorkloadKind` is the
//! closed set of supported kinds; every kind maps to its kind name, API
//! version and selector extraction here, and to its store probe in the client.

use crate::error::StoreError;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use std::collections::BTreeMap;
use std::fmt;

/// API version shared by all supported workload kinds
pub const WORKLOAD_API_VERSION: &str = "apps/v1";

/// Supported workload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    /// Replicated stateless workload
    Deployment,
    /// One pod per node
    DaemonSet,
    /// Replicated workload with stable identity
    StatefulSet,
}

impl WorkloadKind {
    /// Probe order used when resolving a key that carries no kind
    pub const PRIORITY: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::DaemonSet,
        WorkloadKind::StatefulSet,
    ];

    /// Kubernetes kind name, verbatim
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
            Self::StatefulSet => "StatefulSet",
        }
    }

    /// API version of the kind
    pub fn api_version(self) -> &'static str {
        WORKLOAD_API_VERSION
    }

    /// Parse a kind name. Kinds outside the supported set yield `None`.
    pub fn from_kind_name(kind: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a workload
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    /// Selector for the pods the workload governs
    pub selector: Option<LabelSelector>,
    pub annotations: BTreeMap<String, String>,
    /// Version of the snapshot, for log correlation
    pub resource_version: Option<String>,
}

impl Workload {
    /// Build a workload view from a Deployment
    pub fn from_deployment(deployment: Deployment) -> Result<Self, StoreError> {
        let selector = deployment.spec.map(|s| s.selector);
        Self::from_parts(WorkloadKind::Deployment, deployment.metadata, selector)
    }

    /// Build a workload view from a DaemonSet
    pub fn from_daemon_set(daemon_set: DaemonSet) -> Result<Self, StoreError> {
        let selector = daemon_set.spec.map(|s| s.selector);
        Self::from_parts(WorkloadKind::DaemonSet, daemon_set.metadata, selector)
    }

    /// Build a workload view from a StatefulSet
    pub fn from_stateful_set(stateful_set: StatefulSet) -> Result<Self, StoreError> {
        let selector = stateful_set.spec.map(|s| s.selector);
        Self::from_parts(WorkloadKind::StatefulSet, stateful_set.metadata, selector)
    }

    fn from_parts(
        kind: WorkloadKind,
        metadata: ObjectMeta,
        selector: Option<LabelSelector>,
    ) -> Result<Self, StoreError> {
        let name = metadata
            .name
            .ok_or_else(|| StoreError::InvalidObject(format!("{} missing name", kind)))?;
        let uid = metadata
            .uid
            .ok_or_else(|| StoreError::InvalidObject(format!("{} {} missing uid", kind, name)))?;

        Ok(Self {
            kind,
            namespace: metadata.namespace.unwrap_or_else(|| "default".to_string()),
            name,
            uid,
            selector,
            annotations: metadata.annotations.unwrap_or_default(),
            resource_version: metadata.resource_version,
        })
    }

    /// Controller owner reference pointing at this workload.
    ///
    /// `blockOwnerDeletion` makes foreground deletion of the workload wait
    /// for the dependent to go first.
    pub fn controller_owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.kind.api_version().to_string(),
            kind: self.kind.as_str().to_string(),
            name: self.name.clone(),
            uid: self.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// Match labels of the selector rendered as `k=v,k=v` for logging
    pub fn selector_display(&self) -> String {
        self.selector
            .as_ref()
            .and_then(|s| s.match_labels.as_ref())
            .map(|labels| {
                labels
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }
}
