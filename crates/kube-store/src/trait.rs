//! KubeStore trait for mocking
//!
//! This trait abstracts the Kubernetes API access used by the controller so that
//! reconcile logic can run against `MockKubeStore` in unit tests.

use crate::error::StoreError;
use crate::models::{Workload, WorkloadKind};
use crds::VerticalPodAutoscaler;

/// Trait for Kubernetes store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Every method is a single bounded request (or a bounded sequence of page
/// requests for lists); none of them retries internally.
#[async_trait::async_trait]
pub trait KubeStoreTrait: Send + Sync {
    // Workloads (read only)
    async fn get_workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, StoreError>;

    // VerticalPodAutoscalers
    async fn get_vpa(&self, namespace: &str, name: &str) -> Result<VerticalPodAutoscaler, StoreError>;

    /// List VPAs in one namespace, or in all namespaces when `namespace` is `None`.
    ///
    /// Returns `StoreError::KindNotRegistered` when the VPA CRD is not installed.
    async fn list_vpas(&self, namespace: Option<&str>) -> Result<Vec<VerticalPodAutoscaler>, StoreError>;

    /// Create a VPA. Returns `StoreError::AlreadyExists` on a name conflict.
    async fn create_vpa(&self, vpa: &VerticalPodAutoscaler) -> Result<VerticalPodAutoscaler, StoreError>;

    async fn delete_vpa(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}
