//! Nutanix provider configuration CRDs

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{MachineConfig, UserConfiguration};
use crate::references::Ref;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "NutanixDatacenterConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NutanixDatacenterConfigSpec {
    /// Prism Central endpoint
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub port: i32,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<Ref>,
}

/// A Nutanix entity addressed either by name or by uuid
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NutanixResourceIdentifier {
    /// "name" or "uuid"
    #[serde(rename = "type", default)]
    pub identifier_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl NutanixResourceIdentifier {
    /// Identifier addressing an entity by name
    pub fn by_name(name: &str) -> Self {
        Self {
            identifier_type: "name".to_string(),
            name: Some(name.to_string()),
            uuid: None,
        }
    }
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "NutanixMachineConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NutanixMachineConfigSpec {
    #[serde(default)]
    pub os_family: String,

    #[serde(default)]
    pub users: Vec<UserConfiguration>,

    #[serde(default)]
    pub vcpus_per_socket: i32,

    #[serde(default)]
    pub vcpu_sockets: i32,

    /// Quantity string (e.g., "4Gi")
    #[serde(default)]
    pub memory_size: String,

    #[serde(default)]
    pub image: NutanixResourceIdentifier,

    /// Prism Element cluster the machines run on
    #[serde(default)]
    pub cluster: NutanixResourceIdentifier,

    #[serde(default)]
    pub subnet: NutanixResourceIdentifier,

    /// Quantity string (e.g., "40Gi")
    #[serde(default)]
    pub system_disk_size: String,
}

impl MachineConfig for NutanixMachineConfig {
    fn users(&self) -> &[UserConfiguration] {
        &self.spec.users
    }
}
