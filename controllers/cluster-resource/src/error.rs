//! Reconciler error types.
//!
//! Every error aborts the current reconcile pass; retrying is left to the
//! caller that invoked the reconcile.

use resource_client::ClientError;
use thiserror::Error;

/// Errors that can occur while reconciling a cluster's resources.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Control-plane API error (including NotFound and Conflict)
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Declared or live state violates an expectation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Datacenter provider kind has no template builder
    #[error("unsupported datacenter provider kind: {0}")]
    UnsupportedProvider(String),

    /// A live object lacks a field needed to reconstruct declared config
    #[error("{field} not found on object {kind}")]
    Mapping { field: String, kind: String },

    /// Manifest rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// JSON conversion error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Applying one desired object failed
    #[error("applying {kind} {name}: {source}")]
    Apply {
        kind: String,
        name: String,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    /// Returns true if the error is the control-plane NotFound condition
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::Client(err) | ReconcileError::Apply { source: err, .. } => err.is_not_found(),
            _ => false,
        }
    }

    /// Mapping error for `field` missing on an object of `kind`
    pub fn mapping(field: impl Into<String>, kind: impl Into<String>) -> Self {
        ReconcileError::Mapping {
            field: field.into(),
            kind: kind.into(),
        }
    }
}

impl From<minijinja::Error> for ReconcileError {
    fn from(err: minijinja::Error) -> Self {
        ReconcileError::Render(err.to_string())
    }
}

/// Result alias for reconciler operations.
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
