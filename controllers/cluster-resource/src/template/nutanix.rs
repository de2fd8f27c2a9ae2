//! Nutanix template builder

use std::sync::Arc;

use crds::anywhere::{Cluster, NutanixDatacenterConfig, NutanixMachineConfig};
use crds::capi::NutanixMachineSpec;
use kube::api::DynamicObject;
use tracing::debug;

use super::{
    current_kubeadm_config_template_name, render_resources, MachineValues, ManifestValues, WorkerTemplateNames,
    WorkerValues,
};
use crate::equivalence::{equivalent_users, needs_new_bootstrap_config};
use crate::error::{ReconcileError, Result};
use crate::fetcher::ResourceFetcher;
use crate::names::{self, NowFn};
use crate::render::{Manifest, ManifestRenderer};
use crate::spec::{ClusterSpec, ProviderConfigs};

/// Computes the desired Nutanix machine templates, bootstrap config templates and machine deployments
pub struct NutanixTemplate {
    fetcher: Arc<ResourceFetcher>,
    renderer: Arc<dyn ManifestRenderer>,
    now: NowFn,
}

impl NutanixTemplate {
    pub fn new(fetcher: Arc<ResourceFetcher>, renderer: Arc<dyn ManifestRenderer>, now: NowFn) -> Self {
        Self { fetcher, renderer, now }
    }

    /// Desired objects for `cluster`, reusing live template names wherever nothing immutable changed
    pub async fn template_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        configs: &ProviderConfigs<NutanixDatacenterConfig, NutanixMachineConfig>,
    ) -> Result<Vec<DynamicObject>> {
        let cluster_name = cluster.name();

        // Machine templates are immutable, so a changed control plane or etcd config gets a new name
        let old_control_plane = self.fetcher.existing_nutanix_control_plane_machine_config(cluster).await?;
        let control_plane_template = if any_immutable_field_changed(&old_control_plane, &configs.control_plane) {
            names::control_plane_machine_template_name(cluster_name, (self.now)())
        } else {
            self.fetcher.control_plane(cluster).await?.infrastructure_template_name().to_string()
        };
        let control_plane_values = MachineValues::new(
            control_plane_template,
            &machine_spec(&configs.control_plane),
            &configs.control_plane.spec.users,
        )?;
        let mut values = ManifestValues::new(cluster, spec.kube_version_tag(), control_plane_values);

        if cluster.has_external_etcd() {
            let etcd_config = configs.etcd.as_ref().ok_or_else(|| {
                ReconcileError::Validation(format!("cluster {cluster_name} declares external etcd without a machine config"))
            })?;
            let old_etcd = self.fetcher.existing_nutanix_etcd_machine_config(cluster).await?;
            let etcd_template = if any_immutable_field_changed(&old_etcd, etcd_config) {
                names::etcd_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.etcd(cluster).await?.spec.infrastructure_template.name
            };
            values.etcd = Some(MachineValues::new(etcd_template, &machine_spec(etcd_config), &etcd_config.spec.users)?);
        }

        for group in &cluster.spec.worker_node_group_configurations {
            let machine_config = configs.worker_machine_config(group)?;
            let old_machine_config = self.fetcher.existing_nutanix_worker_machine_config(cluster, group).await?;
            let old_group = self.fetcher.existing_worker_node_group_config(cluster, group).await?;
            let deployment = self.fetcher.machine_deployment(cluster, group).await?;

            let kubeadm_config_template = if needs_new_bootstrap_config(group, &old_group, &old_machine_config, machine_config) {
                names::kubeadm_config_template_name(cluster_name, &group.name, (self.now)())
            } else {
                current_kubeadm_config_template_name(&deployment)?
            };
            let machine_template = if any_immutable_field_changed(&old_machine_config, machine_config) {
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

            let users = &machine_config.spec.users;
            let machine = MachineValues::new(machine_template.clone(), &machine_spec(machine_config), users)?;
            values.workers.push(WorkerValues::new(
                cluster,
                group,
                WorkerTemplateNames {
                    machine_template,
                    kubeadm_config_template,
                },
                machine,
                users,
            ));
        }

        render_resources(self.renderer.as_ref(), Manifest::Nutanix, &values)
    }
}

/// OS family isn't recoverable from a live template, so it never rotates one
pub fn any_immutable_field_changed(old_machine: &NutanixMachineConfig, new_machine: &NutanixMachineConfig) -> bool {
    let (old, new) = (&old_machine.spec, &new_machine.spec);

    old.vcpus_per_socket != new.vcpus_per_socket
        || old.vcpu_sockets != new.vcpu_sockets
        || old.memory_size != new.memory_size
        || old.image != new.image
        || old.cluster != new.cluster
        || old.subnet != new.subnet
        || old.system_disk_size != new.system_disk_size
        || !equivalent_users(&old.users, &new.users)
}

fn machine_spec(machine: &NutanixMachineConfig) -> NutanixMachineSpec {
    let spec = &machine.spec;
    NutanixMachineSpec {
        vcpus_per_socket: spec.vcpus_per_socket,
        vcpu_sockets: spec.vcpu_sockets,
        memory_size: spec.memory_size.clone(),
        system_disk_size: spec.system_disk_size.clone(),
        image: spec.image.clone(),
        cluster: spec.cluster.clone(),
        subnet: vec![spec.subnet.clone()],
    }
}
