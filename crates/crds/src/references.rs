//! Target references for VerticalPodAutoscaler objects
//!
//! Mirrors the Kubernetes `CrossVersionObjectReference` type used by the upstream
//! VPA API: a kind, a name and the API version of the referenced workload.
//! The referenced object always lives in the same namespace as the VPA.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the workload a VerticalPodAutoscaler advises.
///
/// - `apiVersion`: API version of the referenced workload (e.g., "apps/v1")
/// - `kind`: Kind of the referenced workload (e.g., "Deployment")
/// - `name`: Name of the referenced workload
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetReference {
    /// API version of the referenced workload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the referenced workload
    pub kind: String,

    /// Name of the referenced workload
    pub name: String,
}

impl TargetReference {
    /// Create a reference with an explicit API version
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: Some(api_version.into()),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Whether this reference points at the given kind and name.
    ///
    /// The API version is ignored so that references written by older tooling
    /// (which sometimes omitted it) still match.
    pub fn points_at(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}
