//! Reconstruction of declared config from live cluster-api objects
//!
//! The live objects are what the templates rendered from the declared config
//! at the time; mapping them back lets the template builders compare the
//! current declared config against what is actually running.
//!
//! The mapping is lossy: SSH key comments, OS family and identifiers the
//! provider doesn't echo back are not recoverable.

use std::collections::BTreeMap;

use crds::anywhere::{
    CloudStackAvailabilityZone, CloudStackDatacenterConfig, CloudStackDatacenterConfigSpec, CloudStackMachineConfig,
    CloudStackMachineConfigSpec, CloudStackResourceDiskOffering, CloudStackZone, NutanixMachineConfig,
    NutanixMachineConfigSpec, UserConfiguration, VSphereDatacenterConfig, VSphereDatacenterConfigSpec,
    VSphereMachineConfig, VSphereMachineConfigSpec, WorkerNodeGroupConfiguration,
};
use crds::capi::{CloudStackCluster, CloudStackMachineTemplate, KubeadmConfigTemplate, NutanixMachineTemplate, User, VSphereMachineTemplate};
use kube::ResourceExt;

use crate::error::{ReconcileError, Result};

/// Annotation suffix for CloudStack settings the machine template spec can't carry
pub const CLOUDSTACK_ANNOTATION_SUFFIX: &str = "cloudstack.anywhere.eks.amazonaws.com/v1alpha1";

/// kubelet argument carrying worker node labels
pub const NODE_LABELS_ARG: &str = "node-labels";

/// `<setting>.diskoffering.<suffix>` / `symlinks.<suffix>`
pub fn cloudstack_annotation(setting: &str) -> String {
    match setting {
        "symlinks" => format!("symlinks.{CLOUDSTACK_ANNOTATION_SUFFIX}"),
        other => format!("{other}.diskoffering.{CLOUDSTACK_ANNOTATION_SUFFIX}"),
    }
}

/// Declared users from the bootstrap user list
pub fn users_from_bootstrap(users: &[User]) -> Vec<UserConfiguration> {
    users
        .iter()
        .map(|user| UserConfiguration {
            name: user.name.clone(),
            ssh_authorized_keys: user.ssh_authorized_keys.clone(),
        })
        .collect()
}

pub fn vsphere_datacenter_config_from_machine_template(template: &VSphereMachineTemplate) -> Result<VSphereDatacenterConfig> {
    let spec = &template.spec.template.spec;
    let device = spec
        .network
        .devices
        .first()
        .ok_or_else(|| ReconcileError::mapping("networkName under devices", "VSphereMachineTemplate"))?;

    Ok(VSphereDatacenterConfig::new(
        &template.name_any(),
        VSphereDatacenterConfigSpec {
            datacenter: spec.datacenter.clone(),
            network: device.network_name.clone(),
            server: spec.server.clone(),
            thumbprint: spec.thumbprint.clone(),
            insecure: false,
        },
    ))
}

pub fn vsphere_machine_config_from_machine_template(template: &VSphereMachineTemplate, users: &[User]) -> VSphereMachineConfig {
    let spec = &template.spec.template.spec;
    VSphereMachineConfig::new(
        &template.name_any(),
        VSphereMachineConfigSpec {
            disk_gib: spec.disk_gib,
            datastore: spec.datastore.clone(),
            folder: spec.folder.clone(),
            num_cpus: spec.num_cpus,
            memory_mib: spec.memory_mib,
            os_family: String::new(),
            resource_pool: spec.resource_pool.clone(),
            storage_policy_name: spec.storage_policy_name.clone(),
            template: spec.template.clone(),
            users: users_from_bootstrap(users),
        },
    )
}

/// Availability zones from the CloudStack cluster's failure domains
pub fn cloudstack_datacenter_config_from_cluster(cluster: &CloudStackCluster) -> CloudStackDatacenterConfig {
    let availability_zones = cluster
        .spec
        .failure_domains
        .iter()
        .map(|domain| CloudStackAvailabilityZone {
            name: domain.name.clone(),
            credentials_ref: domain.acs_endpoint.name.clone(),
            zone: CloudStackZone {
                id: domain.zone.id.clone(),
                name: domain.zone.name.clone(),
                network: domain.zone.network.clone(),
            },
            domain: domain.domain.clone(),
            account: domain.account.clone(),
            management_api_endpoint: String::new(),
        })
        .collect();

    CloudStackDatacenterConfig::new(
        &cluster.name_any(),
        CloudStackDatacenterConfigSpec { availability_zones },
    )
}

pub fn cloudstack_machine_config_from_machine_template(
    template: &CloudStackMachineTemplate,
    users: &[User],
) -> Result<CloudStackMachineConfig> {
    let spec = &template.spec.template.spec;
    let annotations = template.annotations();
    let annotation = |setting: &str| annotations.get(&cloudstack_annotation(setting)).cloned().unwrap_or_default();

    let disk_offering = spec
        .disk_offering
        .as_ref()
        .filter(|offering| !offering.id.is_empty() || !offering.name.is_empty())
        .map(|offering| CloudStackResourceDiskOffering {
            id: offering.id.clone(),
            name: offering.name.clone(),
            custom_size_in_gb: offering.custom_size_in_gb,
            mount_path: annotation("mountpath"),
            device: annotation("device"),
            filesystem: annotation("filesystem"),
            label: annotation("label"),
        });

    let symlinks = match annotations.get(&cloudstack_annotation("symlinks")) {
        Some(value) => parse_symlinks(value)?,
        None => BTreeMap::new(),
    };

    Ok(CloudStackMachineConfig::new(
        &template.name_any(),
        CloudStackMachineConfigSpec {
            template: spec.template.clone(),
            compute_offering: spec.offering.clone(),
            disk_offering,
            os_family: String::new(),
            affinity: spec.affinity.clone(),
            affinity_group_ids: spec.affinity_group_ids.clone(),
            user_custom_details: spec.details.clone(),
            symlinks,
            users: users_from_bootstrap(users),
        },
    ))
}

pub fn nutanix_machine_config_from_machine_template(template: &NutanixMachineTemplate, users: &[User]) -> Result<NutanixMachineConfig> {
    let spec = &template.spec.template.spec;
    let subnet = spec
        .subnet
        .first()
        .ok_or_else(|| ReconcileError::mapping("subnet", "NutanixMachineTemplate"))?;

    Ok(NutanixMachineConfig::new(
        &template.name_any(),
        NutanixMachineConfigSpec {
            os_family: String::new(),
            users: users_from_bootstrap(users),
            vcpus_per_socket: spec.vcpus_per_socket,
            vcpu_sockets: spec.vcpu_sockets,
            memory_size: spec.memory_size.clone(),
            image: spec.image.clone(),
            cluster: spec.cluster.clone(),
            subnet: subnet.clone(),
            system_disk_size: spec.system_disk_size.clone(),
        },
    ))
}

/// Worker group taints and labels from its bootstrap config template
pub fn worker_node_group_from_kubeadm_config_template(
    template: &KubeadmConfigTemplate,
    group_name: &str,
) -> WorkerNodeGroupConfiguration {
    let (taints, labels) = match template.node_registration() {
        Some(registration) => (
            registration.taints.clone(),
            registration
                .kubelet_extra_args
                .get(NODE_LABELS_ARG)
                .map(|labels| parse_node_labels(labels))
                .unwrap_or_default(),
        ),
        None => (Vec::new(), BTreeMap::new()),
    };

    WorkerNodeGroupConfiguration {
        name: group_name.to_string(),
        count: None,
        machine_group_ref: None,
        taints,
        labels,
    }
}

/// Parse `a=b,c=d`; an entry without `=` is a label with an empty value
pub fn parse_node_labels(value: &str) -> BTreeMap<String, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.to_string(), String::new()),
        })
        .collect()
}

/// Inverse of `parse_node_labels`, ordered by key
pub fn format_node_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse `src:target,src2:target2`
pub fn parse_symlinks(value: &str) -> Result<BTreeMap<String, String>> {
    value
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(source, target)| (source.to_string(), target.to_string()))
                .ok_or_else(|| ReconcileError::Validation(format!("symlinks: {entry} is not key:value format")))
        })
        .collect()
}

/// Inverse of `parse_symlinks`, ordered by source
pub fn format_symlinks(symlinks: &BTreeMap<String, String>) -> String {
    symlinks
        .iter()
        .map(|(source, target)| format!("{source}:{target}"))
        .collect::<Vec<_>>()
        .join(",")
}
