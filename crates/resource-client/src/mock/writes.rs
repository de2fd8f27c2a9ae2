//! Write operations for MockResourceClient
//!
//! Dry-run writes are validated like real ones but never persisted.

use kube::api::DynamicObject;

use super::merge::{merge_patch as json_merge, without_server_fields};
use super::{store_key, MockResourceClient, StoreKey};
use crate::error::ClientError;
use crate::object::{kind_of, name_of, namespace_of};
use crate::resource_trait::WriteOptions;

fn not_found(obj: &DynamicObject) -> ClientError {
    ClientError::NotFound {
        kind: kind_of(obj).to_string(),
        namespace: namespace_of(obj).to_string(),
        name: obj.metadata.name.clone().unwrap_or_default(),
    }
}

fn conflict(obj: &DynamicObject, message: &str) -> ClientError {
    ClientError::Conflict {
        kind: kind_of(obj).to_string(),
        namespace: namespace_of(obj).to_string(),
        name: obj.metadata.name.clone().unwrap_or_default(),
        message: message.to_string(),
    }
}

/// Reject a write whose resourceVersion precondition doesn't hold
fn check_resource_version(stored: &DynamicObject, incoming: &DynamicObject) -> Result<(), ClientError> {
    match &incoming.metadata.resource_version {
        Some(rv) if Some(rv) != stored.metadata.resource_version.as_ref() => Err(conflict(
            incoming,
            "the object has been modified; please apply your changes to the latest version and try again",
        )),
        _ => Ok(()),
    }
}

/// Persist `next` over `stored`, bumping the resourceVersion only when content changed
fn persist(
    client: &MockResourceClient,
    key: StoreKey,
    stored: Option<&DynamicObject>,
    mut next: DynamicObject,
    options: &WriteOptions,
) -> Result<DynamicObject, ClientError> {
    let unchanged = match stored {
        Some(stored) => {
            without_server_fields(serde_json::to_value(stored)?) == without_server_fields(serde_json::to_value(&next)?)
        }
        None => false,
    };
    next.metadata.resource_version = match stored {
        Some(stored) if unchanged => stored.metadata.resource_version.clone(),
        _ => Some(client.next_resource_version()),
    };
    if !options.dry_run {
        client.objects.lock().unwrap().insert(key, next.clone());
    }
    Ok(next)
}

fn stored_object(client: &MockResourceClient, key: &StoreKey) -> Option<DynamicObject> {
    client.objects.lock().unwrap().get(key).cloned()
}

pub fn create(client: &MockResourceClient, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
    name_of(obj)?;
    let key = store_key(obj)?;
    if stored_object(client, &key).is_some() {
        return Err(conflict(obj, "already exists"));
    }
    let mut created = obj.clone();
    created.metadata.resource_version = None;
    persist(client, key, None, created, options)
}

pub fn update(client: &MockResourceClient, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
    let key = store_key(obj)?;
    let stored = stored_object(client, &key).ok_or_else(|| not_found(obj))?;
    check_resource_version(&stored, obj)?;
    persist(client, key, Some(&stored), obj.clone(), options)
}

pub fn merge_patch(client: &MockResourceClient, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
    let key = store_key(obj)?;
    let stored = stored_object(client, &key).ok_or_else(|| not_found(obj))?;
    check_resource_version(&stored, obj)?;

    let mut merged = serde_json::to_value(&stored)?;
    json_merge(&mut merged, &without_server_fields(serde_json::to_value(obj)?));
    let merged: DynamicObject = serde_json::from_value(merged)?;
    persist(client, key, Some(&stored), merged, options)
}

/// Server-side apply is emulated as an upsert that merges the applied fields
pub fn server_side_apply(
    client: &MockResourceClient,
    obj: &DynamicObject,
    options: &WriteOptions,
) -> Result<DynamicObject, ClientError> {
    let key = store_key(obj)?;
    let applied = without_server_fields(serde_json::to_value(obj)?);
    match stored_object(client, &key) {
        Some(stored) => {
            let mut merged = serde_json::to_value(&stored)?;
            json_merge(&mut merged, &applied);
            let merged: DynamicObject = serde_json::from_value(merged)?;
            persist(client, key, Some(&stored), merged, options)
        }
        None => persist(client, key, None, serde_json::from_value(applied)?, options),
    }
}
