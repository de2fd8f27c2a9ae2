//! kubeadm control plane and bootstrap config templates

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::anywhere::Taint;
use crate::references::ObjectReference;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "controlplane.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "KubeadmControlPlane",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmControlPlaneSpec {
    /// Kubernetes version tag (e.g., "v1.27.1-eks-1-27-4")
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default)]
    pub machine_template: KubeadmControlPlaneMachineTemplate,

    #[serde(default)]
    pub kubeadm_config_spec: KubeadmConfigSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmControlPlaneMachineTemplate {
    #[serde(default)]
    pub infrastructure_ref: ObjectReference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmConfigSpec {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_configuration: Option<JoinConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinConfiguration {
    #[serde(default)]
    pub node_registration: NodeRegistrationOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRegistrationOptions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub taints: Vec<Taint>,

    #[serde(default)]
    pub kubelet_extra_args: BTreeMap<String, String>,
}

/// Bootstrap user, as provisioned by cloud-init
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,

    #[serde(default)]
    pub ssh_authorized_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudo: Option<String>,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "bootstrap.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "KubeadmConfigTemplate",
    namespaced
)]
pub struct KubeadmConfigTemplateSpec {
    #[serde(default)]
    pub template: KubeadmConfigTemplateResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct KubeadmConfigTemplateResource {
    #[serde(default)]
    pub spec: KubeadmConfigSpec,
}

impl KubeadmControlPlane {
    /// Name of the control plane machine template
    pub fn infrastructure_template_name(&self) -> &str {
        &self.spec.machine_template.infrastructure_ref.name
    }
}

impl KubeadmConfigTemplate {
    /// Join-time node registration options, if any
    pub fn node_registration(&self) -> Option<&NodeRegistrationOptions> {
        self.spec
            .template
            .spec
            .join_configuration
            .as_ref()
            .map(|join| &join.node_registration)
    }
}
