//! Kubernetes Store Access
//!
//! Typed access to the parts of the Kubernetes API the VPA creation controller
//! touches: Deployments, DaemonSets and StatefulSets (read only) and
//! VerticalPodAutoscalers (get, paginated list, create, delete).
//!
//! # Example
//!
//! ```no_run
//! use kube_store::{KubeStore, KubeStoreTrait, WorkloadKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeStore::new(client);
//!
//! // Probe for a workload
//! let workload = store.get_workload(WorkloadKind::Deployment, "default", "web").await?;
//!
//! // List every VPA in the cluster, following continue tokens
//! let vpas = store.list_vpas(None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Error Classification**: API responses are mapped to `NotFound`,
//!   `AlreadyExists` and `KindNotRegistered` so callers can branch on them
//! - **Pagination**: VPA lists are read page by page
//! - **Mocking**: `MockKubeStore` (feature `test-util`) for unit tests

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use models::*;
pub use store_trait::KubeStoreTrait;
#[cfg(feature = "test-util")]
pub use mock::MockKubeStore;
