//! Object addressing and typed/untyped conversions
//!
//! Every call on the client traits is addressed by (apiVersion, kind, namespace,
//! name). Typed CRD structs are converted to and from `DynamicObject` through
//! their JSON representation, which keeps `apiVersion`/`kind` intact.

use kube::api::DynamicObject;
use kube::core::{GroupVersionKind, TypeMeta};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// Namespace/name pair identifying an object of a known kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a key for `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Split an `apiVersion` into group and version and attach `kind`
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };

    GroupVersionKind {
        group,
        version,
        kind: kind.to_string(),
    }
}

/// Group/version/kind of a typed resource
pub fn gvk_for<K: Resource<DynamicType = ()>>() -> GroupVersionKind {
    gvk_from_api_version(&K::api_version(&()), &K::kind(&()))
}

/// `group/version` (or bare `version` for the core group)
pub fn api_version_of(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

/// Group/version/kind an untyped object declares
pub fn gvk_of(obj: &DynamicObject) -> Result<GroupVersionKind, ClientError> {
    let types = obj.types.as_ref().ok_or_else(|| {
        ClientError::InvalidRequest(format!(
            "object {} is missing apiVersion/kind",
            obj.metadata.name.as_deref().unwrap_or("<unnamed>")
        ))
    })?;
    Ok(gvk_from_type_meta(types))
}

fn gvk_from_type_meta(tm: &TypeMeta) -> GroupVersionKind {
    gvk_from_api_version(&tm.api_version, &tm.kind)
}

/// Name of an untyped object, required for every addressed call
pub fn name_of(obj: &DynamicObject) -> Result<&str, ClientError> {
    obj.metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ClientError::InvalidRequest("object is missing metadata.name".to_string()))
}

/// Namespace of an untyped object (empty for cluster-scoped objects)
pub fn namespace_of(obj: &DynamicObject) -> &str {
    obj.metadata.namespace.as_deref().unwrap_or_default()
}

/// Kind of an untyped object (empty if it carries no type information)
pub fn kind_of(obj: &DynamicObject) -> &str {
    obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default()
}

/// Convert a typed resource into an untyped object
pub fn to_dynamic<K>(obj: &K) -> Result<DynamicObject, ClientError>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    if let Some(map) = value.as_object_mut() {
        map.entry("apiVersion")
            .or_insert_with(|| K::api_version(&()).into_owned().into());
        map.entry("kind")
            .or_insert_with(|| K::kind(&()).into_owned().into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Convert an untyped object into a typed view
pub fn from_dynamic<K: DeserializeOwned>(obj: &DynamicObject) -> Result<K, ClientError> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}
