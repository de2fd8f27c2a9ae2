//! vSphere provider configuration CRDs

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{MachineConfig, UserConfiguration};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "VSphereDatacenterConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDatacenterConfigSpec {
    #[serde(default)]
    pub datacenter: String,

    /// Network (port group) the machines attach to
    #[serde(default)]
    pub network: String,

    /// vCenter server
    #[serde(default)]
    pub server: String,

    /// TLS thumbprint of the vCenter server
    #[serde(default)]
    pub thumbprint: String,

    #[serde(default)]
    pub insecure: bool,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "VSphereMachineConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereMachineConfigSpec {
    #[serde(default, rename = "diskGiB")]
    pub disk_gib: i32,

    #[serde(default)]
    pub datastore: String,

    #[serde(default)]
    pub folder: String,

    #[serde(default, rename = "numCPUs")]
    pub num_cpus: i32,

    #[serde(default, rename = "memoryMiB")]
    pub memory_mib: i64,

    #[serde(default)]
    pub os_family: String,

    #[serde(default)]
    pub resource_pool: String,

    #[serde(default)]
    pub storage_policy_name: String,

    /// VM template the machines are cloned from
    #[serde(default)]
    pub template: String,

    #[serde(default)]
    pub users: Vec<UserConfiguration>,
}

impl MachineConfig for VSphereMachineConfig {
    fn users(&self) -> &[UserConfiguration] {
        &self.spec.users
    }
}
