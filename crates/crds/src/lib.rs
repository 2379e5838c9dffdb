//! VPA Creation Controller CRD Definitions
//!
//! Kubernetes resource types for the upstream VerticalPodAutoscaler API
//! consumed by the VPA creation controller.

pub mod references;
pub mod vertical_pod_autoscaler;

pub use references::*;
pub use vertical_pod_autoscaler::*;
