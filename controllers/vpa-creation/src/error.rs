//! Controller-specific error types.
//!
//! This module defines the errors surfaced by the VPA creation controller.
//! Store errors that only signal absence, conflicts or a missing VPA kind are
//! handled inside the reconciler and never reach this type.

use kube::Error as KubeError;
use kube_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the VPA creation controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Store (Kubernetes API) error that should be retried
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Kubernetes client error during start-up
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
