//! Resource client errors

use kube::error::DiscoveryError;
use thiserror::Error;

/// Errors that can occur when talking to the control-plane API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The addressed object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The write lost an optimistic concurrency race or the object already exists
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },

    /// Any other API or transport error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g., object without apiVersion/kind or name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Returns true if the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound { .. } => true,
            ClientError::Api(kube::Error::Api(resp)) => resp.code == 404,
            // A kind the server doesn't serve has no objects
            ClientError::Api(kube::Error::Discovery(DiscoveryError::MissingKind(_) | DiscoveryError::MissingResource(_))) => {
                true
            }
            _ => false,
        }
    }

    /// Returns true if the write conflicted with the stored object
    pub fn is_conflict(&self) -> bool {
        match self {
            ClientError::Conflict { .. } => true,
            ClientError::Api(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }

    /// Classify a kube error for the addressed object
    pub(crate) fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => ClientError::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(resp) if resp.code == 409 => ClientError::Conflict {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: resp.message.clone(),
            },
            _ => ClientError::Api(err),
        }
    }
}
