//! Cluster CRD
//!
//! The user-authored cluster intent. Nested configuration (datacenter, machine
//! groups, identity providers) lives in separate objects named by `Ref`s.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::Ref;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Kubernetes minor version (e.g., "1.27")
    #[serde(default)]
    pub kubernetes_version: String,

    /// Control plane machines
    #[serde(default)]
    pub control_plane_configuration: ControlPlaneConfiguration,

    /// Worker node groups, one MachineDeployment each
    #[serde(default)]
    pub worker_node_group_configurations: Vec<WorkerNodeGroupConfiguration>,

    /// Datacenter provider configuration
    pub datacenter_ref: Ref,

    /// Stacked etcd when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_etcd_configuration: Option<ExternalEtcdConfiguration>,

    /// Identity providers (AWSIamConfig, OIDCConfig)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_provider_refs: Vec<Ref>,

    /// Cluster managing this one; empty or equal to the own name when self-managed
    #[serde(default)]
    pub management_cluster: ManagementCluster,

    /// Release bundles the cluster is built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundles_ref: Option<BundlesRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfiguration {
    #[serde(default)]
    pub count: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_group_ref: Option<Ref>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerNodeGroupConfiguration {
    /// Group name; the MachineDeployment is named `<cluster>-<name>`
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_group_ref: Option<Ref>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEtcdConfiguration {
    #[serde(default)]
    pub count: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_group_ref: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ManagementCluster {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundlesRef {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub api_version: String,
}

/// Node taint, shared by declared worker groups and live bootstrap configs
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: String,
}

/// SSH user provisioned on a machine
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfiguration {
    pub name: String,
    #[serde(default)]
    pub ssh_authorized_keys: Vec<String>,
}

impl Cluster {
    /// A cluster is self-managed when it names no management cluster, or names itself
    pub fn is_self_managed(&self) -> bool {
        let management = &self.spec.management_cluster.name;
        management.is_empty() || Some(management) == self.metadata.name.as_ref()
    }

    /// Cluster name (empty if unset)
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Cluster namespace (empty if unset)
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Whether an external etcd cluster is declared
    pub fn has_external_etcd(&self) -> bool {
        self.spec.external_etcd_configuration.is_some()
    }

    /// Machine group ref of the control plane
    pub fn control_plane_machine_group_ref(&self) -> Option<&Ref> {
        self.spec.control_plane_configuration.machine_group_ref.as_ref()
    }

    /// Machine group ref of the external etcd machines
    pub fn etcd_machine_group_ref(&self) -> Option<&Ref> {
        self.spec
            .external_etcd_configuration
            .as_ref()
            .and_then(|etcd| etcd.machine_group_ref.as_ref())
    }

    /// Returns true if the datacenter ref names `name`
    pub fn references_datacenter(&self, name: &str) -> bool {
        self.spec.datacenter_ref.name == name
    }

    /// Returns true if any worker, control plane or etcd machine group ref names `name`
    pub fn references_machine_config(&self, name: &str) -> bool {
        let workers = self
            .spec
            .worker_node_group_configurations
            .iter()
            .filter_map(|group| group.machine_group_ref.as_ref());
        workers
            .chain(self.control_plane_machine_group_ref())
            .chain(self.etcd_machine_group_ref())
            .any(|r| r.name == name)
    }

    /// Returns true if any identity provider ref names `name`
    pub fn references_identity_provider(&self, name: &str) -> bool {
        self.spec.identity_provider_refs.iter().any(|r| r.name == name)
    }

    /// Identity provider refs of the given kind
    pub fn identity_provider_refs_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Ref> + 'a {
        self.spec
            .identity_provider_refs
            .iter()
            .filter(move |r| r.kind == kind)
    }
}
