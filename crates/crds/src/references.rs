//! Object references used across declared and live objects
//!
//! `Ref` is the kind/name pair a Cluster uses to point at its nested
//! configuration objects (datacenter, machine groups, identity providers).
//! `ObjectReference` is the cluster-api style reference carried by live
//! objects (infrastructure refs, bootstrap config refs, control plane refs).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference from a Cluster to one of its nested configuration objects
///
/// The referenced object lives in the same namespace as the Cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Ref {
    /// Kind of the referenced object (e.g., "VSphereDatacenterConfig")
    pub kind: String,

    /// Name of the referenced object
    pub name: String,
}

impl Ref {
    /// Create a new reference
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns true if this reference points at an object of `kind` named `name`
    pub fn points_to(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

/// Reference to a live object, as carried by cluster-api objects
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// API version of the referenced object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Kind of the referenced object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Name of the referenced object
    #[serde(default)]
    pub name: String,

    /// Namespace of the referenced object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Create a reference to `kind` named `name` under `api_version`
    pub fn new(api_version: &str, kind: &str, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: None,
        }
    }
}
