//! Store errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An object with the same name already exists (create conflict)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The resource kind is not served by the cluster (CRD not installed)
    #[error("Resource kind not registered: {0}")]
    KindNotRegistered(String),

    /// The API server rejected the request
    #[error("Kubernetes API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Transport, TLS or decoding error from the client
    #[error("Kubernetes client error: {0}")]
    Kube(#[source] kube::Error),

    /// An object is missing a field the store relies on
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl StoreError {
    /// Whether the error only signals absence
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the error signals a create conflict
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Whether the error signals that the resource kind is not installed
    pub fn is_kind_not_registered(&self) -> bool {
        matches!(self, Self::KindNotRegistered(_))
    }

    /// Classify an error from a request addressing a single named object.
    ///
    /// A 404 here means the object is absent.
    pub fn from_object_request(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound(ae.message.clone()),
            kube::Error::Api(ae) if ae.code == 409 => Self::AlreadyExists(ae.message.clone()),
            kube::Error::Api(ae) => Self::Api {
                code: ae.code,
                message: ae.message.clone(),
            },
            e => Self::Kube(e),
        }
    }

    /// Classify an error from a collection request (list or create).
    ///
    /// A 404 means the kind is not registered only when the API server says
    /// the resource endpoint itself is missing. Any other 404 (for example a
    /// namespace that no longer exists) is an ordinary not-found.
    pub fn from_collection_request(err: kube::Error, kind: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 && is_missing_endpoint(&ae) => {
                Self::KindNotRegistered(format!("{}: {}", kind, ae.message))
            }
            e => Self::from_object_request(e),
        }
    }
}

/// Message the API server returns for an unserved group, version or resource
const MISSING_ENDPOINT_MESSAGE: &str = "the server could not find the requested resource";

/// Whether a 404 response refers to the endpoint rather than to an object.
///
/// Structured responses carry `MISSING_ENDPOINT_MESSAGE`; a bare
/// `404 page not found` body is not a `Status` and reaches us unparsed.
fn is_missing_endpoint(ae: &kube::core::ErrorResponse) -> bool {
    ae.message.contains(MISSING_ENDPOINT_MESSAGE) || ae.message.contains("404 page not found")
}
