//! Docker template builder
//!
//! Docker machines run the kind node image of the release bundle, so a
//! Kubernetes version change is what rotates their templates.

use std::sync::Arc;

use crds::anywhere::{Cluster, VersionsBundle};
use crds::capi::DockerMachineSpec;
use kube::api::DynamicObject;
use tracing::debug;

use super::{
    current_kubeadm_config_template_name, render_resources, MachineValues, ManifestValues, WorkerTemplateNames,
    WorkerValues,
};
use crate::equivalence::bootstrap_settings_changed;
use crate::error::{ReconcileError, Result};
use crate::fetcher::ResourceFetcher;
use crate::names::{self, NowFn};
use crate::render::{Manifest, ManifestRenderer};
use crate::spec::ClusterSpec;

/// Computes the desired objects of a Docker cluster
pub struct DockerTemplate {
    fetcher: Arc<ResourceFetcher>,
    renderer: Arc<dyn ManifestRenderer>,
    now: NowFn,
}

impl DockerTemplate {
    pub fn new(fetcher: Arc<ResourceFetcher>, renderer: Arc<dyn ManifestRenderer>, now: NowFn) -> Self {
        Self { fetcher, renderer, now }
    }

    /// Desired objects for `cluster`; machine templates rotate with the Kubernetes version
    pub async fn template_resources(&self, cluster: &Cluster, spec: &ClusterSpec) -> Result<Vec<DynamicObject>> {
        let cluster_name = cluster.name();
        let bundle_image = kind_node_image(spec)?;
        let kube_version = spec.kube_version_tag();

        let existing_version = self.fetcher.existing_kube_version(cluster).await?;
        let version_changed = existing_version != kube_version;
        debug!(
            cluster = cluster_name,
            existing = %existing_version,
            desired = %kube_version,
            version_changed,
            "Compared kubernetes versions"
        );

        let (control_plane_name, control_plane_image) = if version_changed {
            (
                names::control_plane_machine_template_name(cluster_name, (self.now)()),
                bundle_image.clone(),
            )
        } else {
            let control_plane = self.fetcher.control_plane(cluster).await?;
            (
                control_plane.infrastructure_template_name().to_string(),
                self.fetcher.existing_control_plane_kind_node_image(cluster).await?,
            )
        };
        let control_plane_values = MachineValues::new(control_plane_name, &machine_spec(&control_plane_image), &[])?;
        let mut values = ManifestValues::new(cluster, kube_version, control_plane_values);

        if cluster.has_external_etcd() {
            let etcd_name = if version_changed {
                names::etcd_machine_template_name(cluster_name, (self.now)())
            } else {
                self.fetcher.etcd(cluster).await?.spec.infrastructure_template.name
            };
            values.etcd = Some(MachineValues::new(etcd_name, &machine_spec(&control_plane_image), &[])?);
        }

        for group in &cluster.spec.worker_node_group_configurations {
            let old_group = self.fetcher.existing_worker_node_group_config(cluster, group).await?;
            let deployment = self.fetcher.machine_deployment(cluster, group).await?;
            let existing_image = self.fetcher.existing_worker_kind_node_image(cluster, group).await?;

            let kubeadm_config_template = if bootstrap_settings_changed(group, &old_group) {
                names::kubeadm_config_template_name(cluster_name, &group.name, (self.now)())
            } else {
                current_kubeadm_config_template_name(&deployment)?
            };
            let machine_template = if version_changed || existing_image != bundle_image {
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

            let machine = MachineValues::new(machine_template.clone(), &machine_spec(&bundle_image), &[])?;
            values.workers.push(WorkerValues::new(
                cluster,
                group,
                WorkerTemplateNames {
                    machine_template,
                    kubeadm_config_template,
                },
                machine,
                &[],
            ));
        }

        render_resources(self.renderer.as_ref(), Manifest::Docker, &values)
    }
}

/// kind node image of the cluster's versions bundle
fn kind_node_image(spec: &ClusterSpec) -> Result<String> {
    spec.versions_bundle
        .as_ref()
        .map(|bundle: &VersionsBundle| bundle.eks_d.kind_node.uri.clone())
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| {
            ReconcileError::Validation(format!(
                "cluster {} has no kind node image in its versions bundle",
                spec.cluster.name()
            ))
        })
}

fn machine_spec(image: &str) -> DockerMachineSpec {
    DockerMachineSpec {
        custom_image: image.to_string(),
    }
}
