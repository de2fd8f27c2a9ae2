//! vSphere template builder

use std::sync::Arc;

use crds::anywhere::{Cluster, VSphereDatacenterConfig, VSphereMachineConfig};
use crds::capi::{NetworkDeviceSpec, NetworkSpec, VSphereMachineSpec};
use kube::api::DynamicObject;
use tracing::debug;

use super::{
    current_kubeadm_config_template_name, first_worker_group, render_resources, MachineValues, ManifestValues, WorkerTemplateNames,
    WorkerValues,
};
use crate::equivalence::{equivalent_users, needs_new_bootstrap_config};
use crate::error::{ReconcileError, Result};
use crate::fetcher::ResourceFetcher;
use crate::names::{self, NowFn};
use crate::render::{Manifest, ManifestRenderer};
use crate::spec::{ClusterSpec, ProviderConfigs};

/// Computes the desired vSphere machine templates, bootstrap config templates and machine deployments
pub struct VSphereTemplate {
    fetcher: Arc<ResourceFetcher>,
    renderer: Arc<dyn ManifestRenderer>,
    now: NowFn,
}

impl VSphereTemplate {
    pub fn new(fetcher: Arc<ResourceFetcher>, renderer: Arc<dyn ManifestRenderer>, now: NowFn) -> Self {
        Self { fetcher, renderer, now }
    }

    /// Desired objects for `cluster`, reusing live template names wherever nothing immutable changed
    pub async fn template_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        configs: &ProviderConfigs<VSphereDatacenterConfig, VSphereMachineConfig>,
    ) -> Result<Vec<DynamicObject>> {
        let cluster_name = cluster.name();
        let datacenter = &configs.datacenter;
        let old_datacenter = self
            .fetcher
            .existing_vsphere_datacenter_config(cluster, first_worker_group(cluster)?)
            .await?;

        // Machine templates are immutable, so a changed control plane or etcd config gets a new name
        let old_control_plane = self.fetcher.existing_vsphere_control_plane_machine_config(cluster).await?;
        let control_plane_template =
            if any_immutable_field_changed(&old_datacenter, datacenter, &old_control_plane, &configs.control_plane) {
                names::control_plane_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.control_plane(cluster).await?.infrastructure_template_name().to_string()
            };
        let control_plane_values = MachineValues::new(
            control_plane_template,
            &machine_spec(datacenter, &configs.control_plane),
            &configs.control_plane.spec.users,
        )?;
        let mut values = ManifestValues::new(cluster, spec.kube_version_tag(), control_plane_values);

        if cluster.has_external_etcd() {
            let etcd_config = configs.etcd.as_ref().ok_or_else(|| {
                ReconcileError::Validation(format!("cluster {cluster_name} declares external etcd without a machine config"))
            })?;
            let old_etcd = self.fetcher.existing_vsphere_etcd_machine_config(cluster).await?;
            let etcd_template = if any_immutable_field_changed(&old_datacenter, datacenter, &old_etcd, etcd_config) {
                names::etcd_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.etcd(cluster).await?.spec.infrastructure_template.name
            };
            values.etcd = Some(MachineValues::new(
                etcd_template,
                &machine_spec(datacenter, etcd_config),
                &etcd_config.spec.users,
            )?);
        }

        for group in &cluster.spec.worker_node_group_configurations {
            let machine_config = configs.worker_machine_config(group)?;
            let old_datacenter = self.fetcher.existing_vsphere_datacenter_config(cluster, group).await?;
            let old_machine_config = self.fetcher.existing_vsphere_worker_machine_config(cluster, group).await?;
            let old_group = self.fetcher.existing_worker_node_group_config(cluster, group).await?;
            let deployment = self.fetcher.machine_deployment(cluster, group).await?;

            let kubeadm_config_template = if needs_new_bootstrap_config(group, &old_group, &old_machine_config, machine_config) {
                names::kubeadm_config_template_name(cluster_name, &group.name, (self.now)())
            } else {
                current_kubeadm_config_template_name(&deployment)?
            };
            let machine_template = if any_immutable_field_changed(&old_datacenter, datacenter, &old_machine_config, machine_config) {
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
            let machine = MachineValues::new(machine_template.clone(), &machine_spec(datacenter, machine_config), users)?;
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

        render_resources(self.renderer.as_ref(), Manifest::VSphere, &values)
    }
}

/// A new machine template is needed when any of these differ
pub fn any_immutable_field_changed(
    old_datacenter: &VSphereDatacenterConfig,
    new_datacenter: &VSphereDatacenterConfig,
    old_machine: &VSphereMachineConfig,
    new_machine: &VSphereMachineConfig,
) -> bool {
    let (old_dc, new_dc) = (&old_datacenter.spec, &new_datacenter.spec);
    let (old, new) = (&old_machine.spec, &new_machine.spec);

    old_dc.server != new_dc.server
        || old_dc.datacenter != new_dc.datacenter
        || old_dc.network != new_dc.network
        || old_dc.thumbprint != new_dc.thumbprint
        || old.num_cpus != new.num_cpus
        || old.memory_mib != new.memory_mib
        || old.disk_gib != new.disk_gib
        || old.datastore != new.datastore
        || old.folder != new.folder
        || old.resource_pool != new.resource_pool
        || old.template != new.template
        || old.storage_policy_name != new.storage_policy_name
        || !equivalent_users(&old.users, &new.users)
}

fn machine_spec(datacenter: &VSphereDatacenterConfig, machine: &VSphereMachineConfig) -> VSphereMachineSpec {
    VSphereMachineSpec {
        server: datacenter.spec.server.clone(),
        datacenter: datacenter.spec.datacenter.clone(),
        thumbprint: datacenter.spec.thumbprint.clone(),
        network: NetworkSpec {
            devices: vec![NetworkDeviceSpec {
                network_name: datacenter.spec.network.clone(),
                dhcp4: true,
            }],
        },
        num_cpus: machine.spec.num_cpus,
        memory_mib: machine.spec.memory_mib,
        disk_gib: machine.spec.disk_gib,
        template: machine.spec.template.clone(),
        resource_pool: machine.spec.resource_pool.clone(),
        datastore: machine.spec.datastore.clone(),
        folder: machine.spec.folder.clone(),
        storage_policy_name: machine.spec.storage_policy_name.clone(),
        clone_mode: String::new(),
    }
}
