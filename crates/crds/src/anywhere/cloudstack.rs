//! CloudStack provider configuration CRDs

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{MachineConfig, UserConfiguration};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "CloudStackDatacenterConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackDatacenterConfigSpec {
    #[serde(default)]
    pub availability_zones: Vec<CloudStackAvailabilityZone>,
}

/// One CloudStack failure domain: a zone reached through one management endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackAvailabilityZone {
    pub name: String,

    /// Name of the credentials entry used to reach the management endpoint
    #[serde(default)]
    pub credentials_ref: String,

    #[serde(default)]
    pub zone: CloudStackZone,

    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub account: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub management_api_endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackZone {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub network: CloudStackResourceIdentifier,
}

/// CloudStack resources may be named by id, by name, or both
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackResourceIdentifier {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackResourceDiskOffering {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "customSizeInGB")]
    pub custom_size_in_gb: i64,

    #[serde(default)]
    pub mount_path: String,

    #[serde(default)]
    pub device: String,

    #[serde(default)]
    pub filesystem: String,

    #[serde(default)]
    pub label: String,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "CloudStackMachineConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackMachineConfigSpec {
    #[serde(default)]
    pub template: CloudStackResourceIdentifier,

    #[serde(default)]
    pub compute_offering: CloudStackResourceIdentifier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_offering: Option<CloudStackResourceDiskOffering>,

    #[serde(default)]
    pub os_family: String,

    /// "pro", "anti" or empty
    #[serde(default)]
    pub affinity: String,

    #[serde(default)]
    pub affinity_group_ids: Vec<String>,

    #[serde(default)]
    pub user_custom_details: BTreeMap<String, String>,

    /// Symlinks created on the machine, source path to target path
    #[serde(default)]
    pub symlinks: BTreeMap<String, String>,

    #[serde(default)]
    pub users: Vec<UserConfiguration>,
}

impl MachineConfig for CloudStackMachineConfig {
    fn users(&self) -> &[UserConfiguration] {
        &self.spec.users
    }
}
