//! Infrastructure provider objects (machine templates, CloudStack cluster)

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::anywhere::{CloudStackResourceIdentifier, NutanixResourceIdentifier};

// vSphere

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "VSphereMachineTemplate",
    namespaced
)]
pub struct VSphereMachineTemplateSpec {
    #[serde(default)]
    pub template: VSphereMachineTemplateResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct VSphereMachineTemplateResource {
    #[serde(default)]
    pub spec: VSphereMachineSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereMachineSpec {
    #[serde(default)]
    pub server: String,

    #[serde(default)]
    pub datacenter: String,

    #[serde(default)]
    pub thumbprint: String,

    #[serde(default)]
    pub network: NetworkSpec,

    #[serde(default, rename = "numCPUs")]
    pub num_cpus: i32,

    #[serde(default, rename = "memoryMiB")]
    pub memory_mib: i64,

    #[serde(default, rename = "diskGiB")]
    pub disk_gib: i32,

    #[serde(default)]
    pub template: String,

    #[serde(default)]
    pub resource_pool: String,

    #[serde(default)]
    pub datastore: String,

    #[serde(default)]
    pub folder: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_policy_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clone_mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NetworkSpec {
    #[serde(default)]
    pub devices: Vec<NetworkDeviceSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeviceSpec {
    #[serde(default)]
    pub network_name: String,

    #[serde(default)]
    pub dhcp4: bool,
}

// CloudStack

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta2",
    kind = "CloudStackMachineTemplate",
    namespaced
)]
pub struct CloudStackMachineTemplateSpec {
    #[serde(default)]
    pub template: CloudStackMachineTemplateResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CloudStackMachineTemplateResource {
    #[serde(default)]
    pub spec: CloudStackMachineSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackMachineSpec {
    /// Compute offering
    #[serde(default)]
    pub offering: CloudStackResourceIdentifier,

    #[serde(default)]
    pub template: CloudStackResourceIdentifier,

    /// Mount path, device, filesystem and label travel as annotations on the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_offering: Option<CloudStackDiskOffering>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub affinity: String,

    #[serde(default, rename = "affinityGroupIDs", skip_serializing_if = "Vec::is_empty")]
    pub affinity_group_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CloudStackDiskOffering {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "customSizeInGB")]
    pub custom_size_in_gb: i64,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta2",
    kind = "CloudStackCluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackClusterSpec {
    #[serde(default)]
    pub failure_domains: Vec<CloudStackFailureDomainSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackFailureDomainSpec {
    pub name: String,

    #[serde(default)]
    pub zone: CloudStackZoneSpec,

    #[serde(default)]
    pub account: String,

    #[serde(default)]
    pub domain: String,

    /// Secret holding the management endpoint credentials
    #[serde(default)]
    pub acs_endpoint: SecretReference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CloudStackZoneSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub network: CloudStackResourceIdentifier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretReference {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

// Docker

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "DockerMachineTemplate",
    namespaced
)]
pub struct DockerMachineTemplateSpec {
    #[serde(default)]
    pub template: DockerMachineTemplateResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DockerMachineTemplateResource {
    #[serde(default)]
    pub spec: DockerMachineSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DockerMachineSpec {
    /// kind node image the machine container runs
    #[serde(default)]
    pub custom_image: String,
}

// Nutanix

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "NutanixMachineTemplate",
    namespaced
)]
pub struct NutanixMachineTemplateSpec {
    #[serde(default)]
    pub template: NutanixMachineTemplateResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NutanixMachineTemplateResource {
    #[serde(default)]
    pub spec: NutanixMachineSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NutanixMachineSpec {
    #[serde(default)]
    pub vcpus_per_socket: i32,

    #[serde(default)]
    pub vcpu_sockets: i32,

    #[serde(default)]
    pub memory_size: String,

    #[serde(default)]
    pub system_disk_size: String,

    #[serde(default)]
    pub image: NutanixResourceIdentifier,

    #[serde(default)]
    pub cluster: NutanixResourceIdentifier,

    #[serde(default)]
    pub subnet: Vec<NutanixResourceIdentifier>,
}
