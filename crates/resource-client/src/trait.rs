//! Resource client traits for mocking
//!
//! `ResourceReader` is the read boundary used by the fetcher, `ResourceWriter`
//! the write boundary used by the updater. The kube-backed client implements
//! both, and tests use the in-memory mock.

use kube::api::DynamicObject;
use kube::core::GroupVersionKind;

use crate::error::ClientError;

/// Request-level options shared by every write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Field manager recorded for the write
    pub field_manager: String,
    /// Validate the write server-side without persisting it
    pub dry_run: bool,
}

impl WriteOptions {
    /// Options for `field_manager`, optionally as a dry run
    pub fn new(field_manager: impl Into<String>, dry_run: bool) -> Self {
        Self {
            field_manager: field_manager.into(),
            dry_run,
        }
    }
}

/// Read operations against the control-plane API
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceReader: Send + Sync {
    /// Get one object; a missing object is `ClientError::NotFound`
    async fn get(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) -> Result<DynamicObject, ClientError>;

    /// List objects of a kind in a namespace, optionally filtered by a label selector
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClientError>;
}

/// Write operations against the control-plane API
///
/// Objects are addressed by their own apiVersion, kind, namespace and name.
#[async_trait::async_trait]
pub trait ResourceWriter: ResourceReader {
    /// Create a new object
    async fn create(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError>;

    /// Replace an object; rejected with a conflict when its resourceVersion is stale
    async fn update(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError>;

    /// JSON merge-patch the stored object with `obj`
    async fn merge_patch(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError>;

    /// Server-side apply `obj`, forcing ownership of conflicting fields
    async fn server_side_apply(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError>;
}
