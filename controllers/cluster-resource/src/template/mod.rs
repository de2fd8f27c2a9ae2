//! Template builders
//!
//! One builder per provider turns the declared config into the desired live
//! objects: machine templates for the control plane, etcd and every worker
//! group, plus each worker group's bootstrap config template and machine
//! deployment. Builders compare the declared config against the config
//! reconstructed from live objects, and only mint new (timestamped) template
//! names when something immutable changed.

pub mod aws_iam;
pub mod cloudstack;
pub mod docker;
pub mod nutanix;
pub mod vsphere;

use std::collections::BTreeMap;

use crds::anywhere::{Cluster, Taint, UserConfiguration, WorkerNodeGroupConfiguration};
use crds::capi::{MachineDeployment, User};
use crds::EKSA_SYSTEM_NAMESPACE;
use kube::api::DynamicObject;
use kube::ResourceExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ReconcileError, Result};
use crate::mapping::{format_node_labels, NODE_LABELS_ARG};
use crate::render::{parse_documents, Manifest, ManifestRenderer};

pub use aws_iam::AwsIamConfigTemplate;
pub use cloudstack::CloudStackTemplate;
pub use docker::DockerTemplate;
pub use nutanix::NutanixTemplate;
pub use vsphere::VSphereTemplate;

/// sudo rule granted to every provisioned user
pub const DEFAULT_SUDO: &str = "ALL=(ALL) NOPASSWD:ALL";

/// Value map handed to the manifest renderer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestValues {
    pub cluster_name: String,
    pub kubernetes_version: String,
    pub namespace: String,
    pub control_plane: MachineValues,
    pub etcd: Option<MachineValues>,
    pub workers: Vec<WorkerValues>,
}

impl ManifestValues {
    pub fn new(cluster: &Cluster, kubernetes_version: String, control_plane: MachineValues) -> Self {
        Self {
            cluster_name: cluster.name().to_string(),
            kubernetes_version,
            namespace: EKSA_SYSTEM_NAMESPACE.to_string(),
            control_plane,
            etcd: None,
            workers: Vec::new(),
        }
    }
}

/// One infrastructure machine template
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineValues {
    pub template_name: String,
    /// Provider machine spec, as it appears under `spec.template.spec`
    pub machine: Value,
    pub annotations: BTreeMap<String, String>,
    pub ssh_username: String,
    pub ssh_authorized_key: String,
}

impl MachineValues {
    pub fn new<S: Serialize>(template_name: String, machine: &S, users: &[UserConfiguration]) -> Result<Self> {
        let users = default_users(users);
        Ok(Self {
            template_name,
            machine: serde_json::to_value(machine)?,
            annotations: BTreeMap::new(),
            ssh_username: ssh_username(&users),
            ssh_authorized_key: ssh_authorized_key(&users),
        })
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// One worker group's machine template, bootstrap config template and deployment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerValues {
    pub name: String,
    pub machine_deployment_name: String,
    pub replicas: i32,
    pub machine_template_name: String,
    pub kubeadm_config_template_name: String,
    pub machine: Value,
    pub annotations: BTreeMap<String, String>,
    pub ssh_username: String,
    pub ssh_authorized_key: String,
    pub taints: Vec<Taint>,
    pub kubelet_extra_args: BTreeMap<String, String>,
    pub bootstrap_users: Vec<User>,
}

/// Template names a worker group renders with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTemplateNames {
    pub machine_template: String,
    pub kubeadm_config_template: String,
}

impl WorkerValues {
    pub fn new(
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
        names: WorkerTemplateNames,
        machine: MachineValues,
        users: &[UserConfiguration],
    ) -> Self {
        Self {
            name: group.name.clone(),
            machine_deployment_name: crate::names::machine_deployment_name(cluster.name(), &group.name),
            replicas: group.count.unwrap_or(1),
            machine_template_name: names.machine_template,
            kubeadm_config_template_name: names.kubeadm_config_template,
            machine: machine.machine,
            annotations: machine.annotations,
            ssh_username: machine.ssh_username,
            ssh_authorized_key: machine.ssh_authorized_key,
            taints: group.taints.clone(),
            kubelet_extra_args: kubelet_extra_args(group),
            bootstrap_users: bootstrap_users(users),
        }
    }
}

/// Users with the empty spots filled, so the first user and key always exist
pub fn default_users(users: &[UserConfiguration]) -> Vec<UserConfiguration> {
    if users.is_empty() {
        return vec![UserConfiguration {
            name: String::new(),
            ssh_authorized_keys: vec![String::new()],
        }];
    }
    users
        .iter()
        .map(|user| {
            let mut user = user.clone();
            if user.ssh_authorized_keys.is_empty() {
                user.ssh_authorized_keys.push(String::new());
            }
            user
        })
        .collect()
}

fn ssh_username(users: &[UserConfiguration]) -> String {
    users.first().map(|user| user.name.clone()).unwrap_or_default()
}

fn ssh_authorized_key(users: &[UserConfiguration]) -> String {
    users
        .first()
        .and_then(|user| user.ssh_authorized_keys.first())
        .cloned()
        .unwrap_or_default()
}

/// Bootstrap users for the declared users
pub fn bootstrap_users(users: &[UserConfiguration]) -> Vec<User> {
    users
        .iter()
        .map(|user| User {
            name: user.name.clone(),
            ssh_authorized_keys: user.ssh_authorized_keys.clone(),
            sudo: Some(DEFAULT_SUDO.to_string()),
        })
        .collect()
}

fn kubelet_extra_args(group: &WorkerNodeGroupConfiguration) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    if !group.labels.is_empty() {
        args.insert(NODE_LABELS_ARG.to_string(), format_node_labels(&group.labels));
    }
    args
}

/// Bootstrap config template name the deployment currently references
pub fn current_kubeadm_config_template_name(deployment: &MachineDeployment) -> Result<String> {
    deployment.bootstrap_config_name().map(str::to_string).ok_or_else(|| {
        ReconcileError::Validation(format!(
            "machine deployment {} has no bootstrap configRef",
            deployment.name_any()
        ))
    })
}

/// Render `values` and parse the result into objects
pub fn render_resources(
    renderer: &dyn ManifestRenderer,
    manifest: Manifest,
    values: &ManifestValues,
) -> Result<Vec<DynamicObject>> {
    let content = renderer.render(manifest, &serde_json::to_value(values)?)?;
    Ok(parse_documents(&content))
}

/// First worker group; every provider needs at least one
pub fn first_worker_group(cluster: &Cluster) -> Result<&WorkerNodeGroupConfiguration> {
    cluster
        .spec
        .worker_node_group_configurations
        .first()
        .ok_or_else(|| ReconcileError::Validation(format!("cluster {} has no worker node groups", cluster.name())))
}
