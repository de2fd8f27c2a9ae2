//! etcdadm cluster (external etcd)

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::kubeadm::User;
use crate::references::ObjectReference;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "etcdcluster.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "EtcdadmCluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct EtcdadmClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Machine template the etcd machines are created from
    #[serde(default)]
    pub infrastructure_template: ObjectReference,

    #[serde(default)]
    pub etcdadm_config_spec: EtcdadmConfigSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EtcdadmConfigSpec {
    #[serde(default)]
    pub users: Vec<User>,
}
