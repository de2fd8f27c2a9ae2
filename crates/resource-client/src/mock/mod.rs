//! Mock resource client for unit testing
//!
//! This module provides an in-memory implementation of `ResourceReader` and
//! `ResourceWriter` that can be used in unit tests without a running API server.
//!
//! The mock is organized into:
//! - `reads.rs` - get and list (label selectors, injected read failures)
//! - `writes.rs` - create, update, merge-patch and server-side apply with
//!   resourceVersion semantics
//! - `merge.rs` - JSON merge-patch and content comparison helpers
//!
//! Every write is recorded, including dry runs and writes that fail, so tests
//! can assert on exactly what the code under test submitted.

mod merge;
mod reads;
mod writes;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::Resource;
use serde::Serialize;

use crate::error::ClientError;
use crate::object::{gvk_from_api_version, gvk_of, kind_of, name_of, namespace_of, to_dynamic};
use crate::resource_trait::{ResourceReader, ResourceWriter, WriteOptions};

/// (group, kind, namespace, name); versions of one group share storage like the API server
pub(crate) type StoreKey = (String, String, String, String);

/// Kind of write the code under test issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteVerb {
    Create,
    Update,
    MergePatch,
    ServerSideApply,
}

/// One write as submitted to the mock
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub verb: WriteVerb,
    pub object: DynamicObject,
    pub options: WriteOptions,
}

impl RecordedWrite {
    /// Kind of the written object
    pub fn kind(&self) -> &str {
        kind_of(&self.object)
    }

    /// Name of the written object
    pub fn name(&self) -> &str {
        self.object.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Mock resource client for testing
///
/// Stores objects in memory and emulates the API server's optimistic
/// concurrency: every persisted change bumps the resourceVersion, and updates
/// carrying a stale resourceVersion are rejected with a conflict.
#[derive(Clone, Default)]
pub struct MockResourceClient {
    pub(crate) objects: Arc<Mutex<BTreeMap<StoreKey, DynamicObject>>>,
    pub(crate) writes: Arc<Mutex<Vec<RecordedWrite>>>,
    pub(crate) failing_kinds: Arc<Mutex<HashSet<String>>>,
    pub(crate) next_resource_version: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockResourceClient")
            .field("objects", &self.objects.lock().unwrap().len())
            .field("writes", &self.writes.lock().unwrap().len())
            .finish()
    }
}

impl MockResourceClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an untyped object to the mock store (for test setup)
    ///
    /// The object is stored as-is, with a fresh resourceVersion.
    pub fn add_object(&self, mut obj: DynamicObject) {
        let key = store_key(&obj).unwrap();
        obj.metadata.resource_version = Some(self.next_resource_version());
        self.objects.lock().unwrap().insert(key, obj);
    }

    /// Add a typed object to the mock store (for test setup)
    pub fn add_resource<K>(&self, obj: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        self.add_object(to_dynamic(obj).unwrap());
    }

    /// Stored object, if any
    pub fn stored(&self, api_version: &str, kind: &str, namespace: &str, name: &str) -> Option<DynamicObject> {
        let gvk = gvk_from_api_version(api_version, kind);
        self.objects
            .lock()
            .unwrap()
            .get(&key_for(&gvk, namespace, name))
            .cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// All writes submitted so far, in order
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Forget recorded writes (the store is kept)
    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Make every get/list of `kind` fail with a non-NotFound error
    pub fn fail_reads_for_kind(&self, kind: &str) {
        self.failing_kinds.lock().unwrap().insert(kind.to_string());
    }

    /// Generate next resourceVersion
    pub(crate) fn next_resource_version(&self) -> String {
        let mut rv = self.next_resource_version.lock().unwrap();
        *rv += 1;
        rv.to_string()
    }

    pub(crate) fn record(&self, verb: WriteVerb, obj: &DynamicObject, options: &WriteOptions) {
        self.writes.lock().unwrap().push(RecordedWrite {
            verb,
            object: obj.clone(),
            options: options.clone(),
        });
    }
}

pub(crate) fn key_for(gvk: &GroupVersionKind, namespace: &str, name: &str) -> StoreKey {
    (
        gvk.group.clone(),
        gvk.kind.clone(),
        namespace.to_string(),
        name.to_string(),
    )
}

pub(crate) fn store_key(obj: &DynamicObject) -> Result<StoreKey, ClientError> {
    let gvk = gvk_of(obj)?;
    Ok(key_for(&gvk, namespace_of(obj), name_of(obj)?))
}

#[async_trait::async_trait]
impl ResourceReader for MockResourceClient {
    async fn get(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) -> Result<DynamicObject, ClientError> {
        reads::get(self, gvk, namespace, name)
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClientError> {
        reads::list(self, gvk, namespace, label_selector)
    }
}

#[async_trait::async_trait]
impl ResourceWriter for MockResourceClient {
    async fn create(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        self.record(WriteVerb::Create, obj, options);
        writes::create(self, obj, options)
    }

    async fn update(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        self.record(WriteVerb::Update, obj, options);
        writes::update(self, obj, options)
    }

    async fn merge_patch(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        self.record(WriteVerb::MergePatch, obj, options);
        writes::merge_patch(self, obj, options)
    }

    async fn server_side_apply(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        self.record(WriteVerb::ServerSideApply, obj, options);
        writes::server_side_apply(self, obj, options)
    }
}
