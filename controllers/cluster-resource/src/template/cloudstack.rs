//! CloudStack template builder
//!
//! CloudStack clusters run a single worker group. Disk offering mount
//! settings and symlinks don't fit the machine template spec, so they travel
//! as annotations on the template.

use std::collections::BTreeMap;
use std::sync::Arc;

use crds::anywhere::{CloudStackDatacenterConfig, CloudStackMachineConfig, Cluster};
use crds::capi::{CloudStackDiskOffering, CloudStackMachineSpec};
use kube::api::DynamicObject;
use tracing::debug;

use super::{
    current_kubeadm_config_template_name, render_resources, MachineValues, ManifestValues, WorkerTemplateNames,
    WorkerValues,
};
use crate::equivalence::{equivalent_users, needs_new_bootstrap_config};
use crate::error::{ReconcileError, Result};
use crate::fetcher::ResourceFetcher;
use crate::mapping::{cloudstack_annotation, format_symlinks};
use crate::names::{self, NowFn};
use crate::render::{Manifest, ManifestRenderer};
use crate::spec::{ClusterSpec, ProviderConfigs};

/// Computes the desired CloudStack machine templates, bootstrap config templates and machine deployments
pub struct CloudStackTemplate {
    fetcher: Arc<ResourceFetcher>,
    renderer: Arc<dyn ManifestRenderer>,
    now: NowFn,
}

impl CloudStackTemplate {
    pub fn new(fetcher: Arc<ResourceFetcher>, renderer: Arc<dyn ManifestRenderer>, now: NowFn) -> Self {
        Self { fetcher, renderer, now }
    }

    /// Desired objects for `cluster`, reusing live template names wherever nothing immutable changed
    pub async fn template_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        configs: &ProviderConfigs<CloudStackDatacenterConfig, CloudStackMachineConfig>,
    ) -> Result<Vec<DynamicObject>> {
        let cluster_name = cluster.name();
        let groups = &cluster.spec.worker_node_group_configurations;
        if groups.len() != 1 {
            return Err(ReconcileError::Validation(format!(
                "cloudstack cluster {cluster_name} must have exactly one worker node group, found {}",
                groups.len()
            )));
        }
        let group = &groups[0];

        let datacenter = &configs.datacenter;
        let old_datacenter = self.fetcher.existing_cloudstack_datacenter_config(cluster).await?;

        // Machine templates are immutable, so a changed control plane or etcd config gets a new name
        let old_control_plane = self.fetcher.existing_cloudstack_control_plane_machine_config(cluster).await?;
        let control_plane_template =
            if any_immutable_field_changed(&old_datacenter, datacenter, &old_control_plane, &configs.control_plane) {
                names::control_plane_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.control_plane(cluster).await?.infrastructure_template_name().to_string()
            };
        let control_plane_values = machine_values(control_plane_template, &configs.control_plane)?;
        let mut values = ManifestValues::new(cluster, spec.kube_version_tag(), control_plane_values);

        if cluster.has_external_etcd() {
            let etcd_config = configs.etcd.as_ref().ok_or_else(|| {
                ReconcileError::Validation(format!("cluster {cluster_name} declares external etcd without a machine config"))
            })?;
            let old_etcd = self.fetcher.existing_cloudstack_etcd_machine_config(cluster).await?;
            let etcd_template = if any_immutable_field_changed(&old_datacenter, datacenter, &old_etcd, etcd_config) {
                names::etcd_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.etcd(cluster).await?.spec.infrastructure_template.name
            };
            values.etcd = Some(machine_values(etcd_template, etcd_config)?);
        }

        let machine_config = configs.worker_machine_config(group)?;
        let old_machine_config = self.fetcher.existing_cloudstack_worker_machine_config(cluster, group).await?;
        let old_group = self.fetcher.existing_worker_node_group_config(cluster, group).await?;
        let deployment = self.fetcher.machine_deployment(cluster, group).await?;

        let kubeadm_config_template = if needs_new_bootstrap_config(group, &old_group, &old_machine_config, machine_config) {
            names::kubeadm_config_template_name(cluster_name, &group.name, (self.now)())
        } else {
            current_kubeadm_config_template_name(&deployment)?
        };
        let machine_template =
            if any_immutable_field_changed(&old_datacenter, datacenter, &old_machine_config, machine_config) {
                names::worker_machine_template_name(cluster_name, &group.name, (self.now)())
            } else {
                deployment.infrastructure_template_name().to_string()
            };
        debug!(
            cluster = cluster_name,
            group = %group.name,
            machine_template = %machine_template,
            kubeadm_config_template = %kubeadm_config_template,
            "Resolved worker template names"
        );

        let machine = machine_values(machine_template.clone(), machine_config)?;
        values.workers.push(WorkerValues::new(
            cluster,
            group,
            WorkerTemplateNames {
                machine_template,
                kubeadm_config_template,
            },
            machine,
            &machine_config.spec.users,
        ));

        render_resources(self.renderer.as_ref(), Manifest::CloudStack, &values)
    }
}

/// Availability zones as the live cluster can echo them back
fn zone_projection(datacenter: &CloudStackDatacenterConfig) -> Vec<(&str, &str, &str, &str, &str, &str)> {
    datacenter
        .spec
        .availability_zones
        .iter()
        .map(|az| {
            (
                az.name.as_str(),
                az.credentials_ref.as_str(),
                az.zone.name.as_str(),
                az.zone.network.name.as_str(),
                az.domain.as_str(),
                az.account.as_str(),
            )
        })
        .collect()
}

/// A new machine template is needed when any of these differ
pub fn any_immutable_field_changed(
    old_datacenter: &CloudStackDatacenterConfig,
    new_datacenter: &CloudStackDatacenterConfig,
    old_machine: &CloudStackMachineConfig,
    new_machine: &CloudStackMachineConfig,
) -> bool {
    let (old, new) = (&old_machine.spec, &new_machine.spec);

    zone_projection(old_datacenter) != zone_projection(new_datacenter)
        || old.template != new.template
        || old.compute_offering != new.compute_offering
        || old.disk_offering != new.disk_offering
        || old.affinity != new.affinity
        || old.affinity_group_ids != new.affinity_group_ids
        || old.user_custom_details != new.user_custom_details
        || old.symlinks != new.symlinks
        || !equivalent_users(&old.users, &new.users)
}

fn machine_values(template_name: String, machine: &CloudStackMachineConfig) -> Result<MachineValues> {
    Ok(MachineValues::new(template_name, &machine_spec(machine), &machine.spec.users)?
        .with_annotations(machine_annotations(machine)))
}

fn machine_spec(machine: &CloudStackMachineConfig) -> CloudStackMachineSpec {
    let spec = &machine.spec;
    CloudStackMachineSpec {
        offering: spec.compute_offering.clone(),
        template: spec.template.clone(),
        disk_offering: spec.disk_offering.as_ref().map(|offering| CloudStackDiskOffering {
            id: offering.id.clone(),
            name: offering.name.clone(),
            custom_size_in_gb: offering.custom_size_in_gb,
        }),
        affinity: spec.affinity.clone(),
        affinity_group_ids: spec.affinity_group_ids.clone(),
        details: spec.user_custom_details.clone(),
    }
}

fn machine_annotations(machine: &CloudStackMachineConfig) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    if let Some(offering) = &machine.spec.disk_offering {
        annotations.insert(cloudstack_annotation("mountpath"), offering.mount_path.clone());
        annotations.insert(cloudstack_annotation("device"), offering.device.clone());
        annotations.insert(cloudstack_annotation("filesystem"), offering.filesystem.clone());
        annotations.insert(cloudstack_annotation("label"), offering.label.clone());
    }
    if !machine.spec.symlinks.is_empty() {
        annotations.insert(cloudstack_annotation("symlinks"), format_symlinks(&machine.spec.symlinks));
    }
    annotations
}
