//! Read boundary to the control-plane API
//!
//! The fetcher reads declared and live objects, chases the references between
//! them (Cluster → cluster-api Cluster → control plane → machine template, or
//! MachineDeployment → templates), and reconstructs "existing" declared config
//! from the live objects so template builders can detect changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crds::anywhere::{
    self, kinds, AWSIamConfig, Bundles, CloudStackDatacenterConfig, CloudStackMachineConfig, Cluster, NutanixMachineConfig,
    OIDCConfig, Release, VSphereDatacenterConfig, VSphereMachineConfig, WorkerNodeGroupConfiguration,
};
use crds::capi::{
    self, CloudStackCluster, CloudStackMachineTemplate, DockerMachineTemplate, EtcdadmCluster, KubeadmConfigTemplate,
    KubeadmControlPlane, MachineDeployment, NutanixMachineTemplate, VSphereMachineTemplate,
};
use crds::{Ref, CLUSTER_NAME_LABEL, EKSA_SYSTEM_NAMESPACE};
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::{Resource, ResourceExt};
use resource_client::{from_dynamic, gvk_for, gvk_from_api_version, ClientError, ObjectKey, ResourceReader};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::mapping;
use crate::names;
use crate::spec::{ClusterSpec, SpecBuilder, SpecLookups};

/// Kinds a reconcile key may name, in the order they are probed
///
/// A key naming a nested config object resolves to the Cluster referencing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterObjectKind {
    Cluster,
    VSphereDatacenterConfig,
    DockerDatacenterConfig,
    VSphereMachineConfig,
    CloudStackMachineConfig,
    CloudStackDatacenterConfig,
    AWSIamConfig,
    OIDCConfig,
    NutanixDatacenterConfig,
    NutanixMachineConfig,
}

impl ClusterObjectKind {
    pub const PROBE_ORDER: [ClusterObjectKind; 10] = [
        ClusterObjectKind::Cluster,
        ClusterObjectKind::VSphereDatacenterConfig,
        ClusterObjectKind::DockerDatacenterConfig,
        ClusterObjectKind::VSphereMachineConfig,
        ClusterObjectKind::CloudStackMachineConfig,
        ClusterObjectKind::CloudStackDatacenterConfig,
        ClusterObjectKind::AWSIamConfig,
        ClusterObjectKind::OIDCConfig,
        ClusterObjectKind::NutanixDatacenterConfig,
        ClusterObjectKind::NutanixMachineConfig,
    ];

    pub fn kind(self) -> &'static str {
        match self {
            ClusterObjectKind::Cluster => kinds::CLUSTER,
            ClusterObjectKind::VSphereDatacenterConfig => kinds::VSPHERE_DATACENTER_CONFIG,
            ClusterObjectKind::DockerDatacenterConfig => kinds::DOCKER_DATACENTER_CONFIG,
            ClusterObjectKind::VSphereMachineConfig => kinds::VSPHERE_MACHINE_CONFIG,
            ClusterObjectKind::CloudStackMachineConfig => kinds::CLOUDSTACK_MACHINE_CONFIG,
            ClusterObjectKind::CloudStackDatacenterConfig => kinds::CLOUDSTACK_DATACENTER_CONFIG,
            ClusterObjectKind::AWSIamConfig => kinds::AWS_IAM_CONFIG,
            ClusterObjectKind::OIDCConfig => kinds::OIDC_CONFIG,
            ClusterObjectKind::NutanixDatacenterConfig => kinds::NUTANIX_DATACENTER_CONFIG,
            ClusterObjectKind::NutanixMachineConfig => kinds::NUTANIX_MACHINE_CONFIG,
        }
    }

    fn gvk(self) -> GroupVersionKind {
        gvk_from_api_version(anywhere::API_VERSION, self.kind())
    }

    /// Whether `cluster` references an object of this kind named `name`
    pub fn is_referenced_by(self, cluster: &Cluster, name: &str) -> bool {
        match self {
            ClusterObjectKind::Cluster => cluster.name() == name,
            ClusterObjectKind::VSphereDatacenterConfig
            | ClusterObjectKind::DockerDatacenterConfig
            | ClusterObjectKind::CloudStackDatacenterConfig
            | ClusterObjectKind::NutanixDatacenterConfig => cluster.references_datacenter(name),
            ClusterObjectKind::VSphereMachineConfig
            | ClusterObjectKind::CloudStackMachineConfig
            | ClusterObjectKind::NutanixMachineConfig => cluster.references_machine_config(name),
            ClusterObjectKind::AWSIamConfig | ClusterObjectKind::OIDCConfig => {
                cluster.references_identity_provider(name)
            }
        }
    }
}

/// Reads objects from the control-plane API
pub struct ResourceFetcher {
    client: Arc<dyn ResourceReader>,
    spec_builder: Arc<dyn SpecBuilder>,
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher").finish_non_exhaustive()
    }
}

impl ResourceFetcher {
    /// Fetcher reading through `client`; `spec_builder` resolves the release side of a cluster spec
    pub fn new(client: Arc<dyn ResourceReader>, spec_builder: Arc<dyn SpecBuilder>) -> Self {
        Self { client, spec_builder }
    }

    /// Typed get; NotFound propagates as-is
    pub async fn fetch_object<K>(&self, key: &ObjectKey) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let obj = self.client.get(&gvk_for::<K>(), &key.namespace, &key.name).await?;
        Ok(from_dynamic(&obj)?)
    }

    pub async fn fetch_object_by_name<K>(&self, name: &str, namespace: &str) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.fetch_object(&ObjectKey::new(namespace, name)).await
    }

    /// Untyped existence probe
    pub async fn fetch(&self, name: &str, namespace: &str, kind: &str, api_version: &str) -> Result<DynamicObject> {
        let gvk = gvk_from_api_version(api_version, kind);
        Ok(self.client.get(&gvk, namespace, name).await?)
    }

    async fn list_objects<K>(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.client
            .list(&gvk_for::<K>(), namespace, label_selector)
            .await?
            .iter()
            .map(|obj| from_dynamic(obj).map_err(ReconcileError::from))
            .collect()
    }

    /// Resolve a key naming a Cluster, or one of its nested config objects, to the Cluster
    pub async fn fetch_cluster(&self, key: &ObjectKey) -> Result<Cluster> {
        debug!(key = %key, "Looking up cluster");

        let mut found = None;
        for kind in ClusterObjectKind::PROBE_ORDER {
            match self.client.get(&kind.gvk(), &key.namespace, &key.name).await {
                Ok(obj) => {
                    found = Some((kind, obj));
                    break;
                }
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err.into()),
            }
        }
        let (kind, obj) = found.ok_or_else(|| {
            ReconcileError::Client(ClientError::NotFound {
                kind: "cluster or cluster config object".to_string(),
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            })
        })?;

        if kind == ClusterObjectKind::Cluster {
            return Ok(from_dynamic(&obj)?);
        }

        // First match in list order wins when several clusters reference the object
        let clusters: Vec<Cluster> = self.list_objects(&key.namespace, None).await?;
        for cluster in clusters {
            if !kind.is_referenced_by(&cluster, &key.name) {
                continue;
            }
            match self.capi_cluster(&cluster).await {
                Ok(_) => {
                    debug!(key = %key, kind = kind.kind(), cluster = cluster.name(), "Resolved owning cluster");
                    return Ok(cluster);
                }
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(ReconcileError::Client(ClientError::NotFound {
            kind: format!("Cluster owning {}", kind.kind()),
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }))
    }

    /// Live cluster-api Cluster of the same name
    pub async fn capi_cluster(&self, cluster: &Cluster) -> Result<capi::Cluster> {
        self.fetch_object_by_name(cluster.name(), EKSA_SYSTEM_NAMESPACE).await
    }

    /// MachineDeployment `<cluster>-<group>`, found among the cluster's labelled deployments
    pub async fn machine_deployment(&self, cluster: &Cluster, group: &WorkerNodeGroupConfiguration) -> Result<MachineDeployment> {
        let selector = format!("{CLUSTER_NAME_LABEL}={}", cluster.name());
        let deployments: Vec<MachineDeployment> = self.list_objects(EKSA_SYSTEM_NAMESPACE, Some(&selector)).await?;
        let name = names::machine_deployment_name(cluster.name(), &group.name);
        let not_found = || {
            ReconcileError::Client(ClientError::NotFound {
                kind: "MachineDeployment".to_string(),
                namespace: EKSA_SYSTEM_NAMESPACE.to_string(),
                name: name.clone(),
            })
        };
        if deployments.is_empty() {
            return Err(not_found());
        }

        let mut by_name: HashMap<String, MachineDeployment> = deployments
            .into_iter()
            .map(|deployment| (deployment.name_any(), deployment))
            .collect();
        by_name.remove(&name).ok_or_else(not_found)
    }

    /// Bootstrap config template the worker group's MachineDeployment points at
    pub async fn kubeadm_config_template(&self, cluster: &Cluster, group: &WorkerNodeGroupConfiguration) -> Result<KubeadmConfigTemplate> {
        let deployment = self.machine_deployment(cluster, group).await?;
        let name = deployment.bootstrap_config_name().ok_or_else(|| {
            ReconcileError::Validation(format!(
                "machine deployment {} has no bootstrap configRef",
                deployment.name_any()
            ))
        })?;
        self.fetch_object_by_name(name, EKSA_SYSTEM_NAMESPACE).await
    }

    /// KubeadmControlPlane the live cluster-api Cluster points at
    pub async fn control_plane(&self, cluster: &Cluster) -> Result<KubeadmControlPlane> {
        let capi_cluster = self.capi_cluster(cluster).await?;
        let control_plane_ref = capi_cluster.spec.control_plane_ref.ok_or_else(|| {
            ReconcileError::Validation(format!("cluster-api cluster {} has no controlPlaneRef", cluster.name()))
        })?;
        let namespace = control_plane_ref
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(EKSA_SYSTEM_NAMESPACE);
        self.fetch_object_by_name(&control_plane_ref.name, namespace).await
    }

    /// External etcd cluster `<cluster>-etcd`
    pub async fn etcd(&self, cluster: &Cluster) -> Result<EtcdadmCluster> {
        self.fetch_object_by_name(&names::etcd_cluster_name(cluster.name()), EKSA_SYSTEM_NAMESPACE)
            .await
    }

    /// Live CloudStack cluster of the same name
    pub async fn cloudstack_cluster(&self, cluster: &Cluster) -> Result<CloudStackCluster> {
        self.fetch_object_by_name(cluster.name(), EKSA_SYSTEM_NAMESPACE).await
    }

    /// Infrastructure machine template of a worker group
    pub async fn worker_machine_template<T>(&self, cluster: &Cluster, group: &WorkerNodeGroupConfiguration) -> Result<T>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let deployment = self.machine_deployment(cluster, group).await?;
        self.fetch_object_by_name(deployment.infrastructure_template_name(), EKSA_SYSTEM_NAMESPACE)
            .await
    }

    /// Infrastructure machine template of the control plane
    pub async fn control_plane_machine_template<T>(&self, cluster: &Cluster) -> Result<T>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let control_plane = self.control_plane(cluster).await?;
        self.fetch_object_by_name(control_plane.infrastructure_template_name(), EKSA_SYSTEM_NAMESPACE)
            .await
    }

    /// Infrastructure machine template of the external etcd machines
    pub async fn etcd_machine_template<T>(&self, cluster: &Cluster) -> Result<T>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let etcd = self.etcd(cluster).await?;
        self.fetch_object_by_name(&etcd.spec.infrastructure_template.name, EKSA_SYSTEM_NAMESPACE)
            .await
    }

    pub async fn existing_vsphere_datacenter_config(
        &self,
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
    ) -> Result<VSphereDatacenterConfig> {
        let template: VSphereMachineTemplate = self.worker_machine_template(cluster, group).await?;
        mapping::vsphere_datacenter_config_from_machine_template(&template)
    }

    pub async fn existing_vsphere_control_plane_machine_config(&self, cluster: &Cluster) -> Result<VSphereMachineConfig> {
        let control_plane = self.control_plane(cluster).await?;
        let template: VSphereMachineTemplate = self
            .fetch_object_by_name(control_plane.infrastructure_template_name(), EKSA_SYSTEM_NAMESPACE)
            .await?;
        Ok(mapping::vsphere_machine_config_from_machine_template(
            &template,
            &control_plane.spec.kubeadm_config_spec.users,
        ))
    }

    pub async fn existing_vsphere_etcd_machine_config(&self, cluster: &Cluster) -> Result<VSphereMachineConfig> {
        let etcd = self.etcd(cluster).await?;
        let template: VSphereMachineTemplate = self
            .fetch_object_by_name(&etcd.spec.infrastructure_template.name, EKSA_SYSTEM_NAMESPACE)
            .await?;
        Ok(mapping::vsphere_machine_config_from_machine_template(
            &template,
            &etcd.spec.etcdadm_config_spec.users,
        ))
    }

    pub async fn existing_vsphere_worker_machine_config(
        &self,
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
    ) -> Result<VSphereMachineConfig> {
        let template: VSphereMachineTemplate = self.worker_machine_template(cluster, group).await?;
        let bootstrap = self.kubeadm_config_template(cluster, group).await?;
        Ok(mapping::vsphere_machine_config_from_machine_template(
            &template,
            &bootstrap.spec.template.spec.users,
        ))
    }

    pub async fn existing_cloudstack_datacenter_config(&self, cluster: &Cluster) -> Result<CloudStackDatacenterConfig> {
        let cloudstack_cluster = self.cloudstack_cluster(cluster).await?;
        Ok(mapping::cloudstack_datacenter_config_from_cluster(&cloudstack_cluster))
    }

    pub async fn existing_cloudstack_control_plane_machine_config(&self, cluster: &Cluster) -> Result<CloudStackMachineConfig> {
        let control_plane = self.control_plane(cluster).await?;
        let template: CloudStackMachineTemplate = self
            .fetch_object_by_name(control_plane.infrastructure_template_name(), EKSA_SYSTEM_NAMESPACE)
            .await?;
        mapping::cloudstack_machine_config_from_machine_template(&template, &control_plane.spec.kubeadm_config_spec.users)
    }

    pub async fn existing_cloudstack_etcd_machine_config(&self, cluster: &Cluster) -> Result<CloudStackMachineConfig> {
        let etcd = self.etcd(cluster).await?;
        let template: CloudStackMachineTemplate = self
            .fetch_object_by_name(&etcd.spec.infrastructure_template.name, EKSA_SYSTEM_NAMESPACE)
            .await?;
        mapping::cloudstack_machine_config_from_machine_template(&template, &etcd.spec.etcdadm_config_spec.users)
    }

    pub async fn existing_cloudstack_worker_machine_config(
        &self,
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
    ) -> Result<CloudStackMachineConfig> {
        let template: CloudStackMachineTemplate = self.worker_machine_template(cluster, group).await?;
        let bootstrap = self.kubeadm_config_template(cluster, group).await?;
        mapping::cloudstack_machine_config_from_machine_template(&template, &bootstrap.spec.template.spec.users)
    }

    pub async fn existing_nutanix_control_plane_machine_config(&self, cluster: &Cluster) -> Result<NutanixMachineConfig> {
        let control_plane = self.control_plane(cluster).await?;
        let template: NutanixMachineTemplate = self
            .fetch_object_by_name(control_plane.infrastructure_template_name(), EKSA_SYSTEM_NAMESPACE)
            .await?;
        mapping::nutanix_machine_config_from_machine_template(&template, &control_plane.spec.kubeadm_config_spec.users)
    }

    pub async fn existing_nutanix_etcd_machine_config(&self, cluster: &Cluster) -> Result<NutanixMachineConfig> {
        let etcd = self.etcd(cluster).await?;
        let template: NutanixMachineTemplate = self
            .fetch_object_by_name(&etcd.spec.infrastructure_template.name, EKSA_SYSTEM_NAMESPACE)
            .await?;
        mapping::nutanix_machine_config_from_machine_template(&template, &etcd.spec.etcdadm_config_spec.users)
    }

    pub async fn existing_nutanix_worker_machine_config(
        &self,
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
    ) -> Result<NutanixMachineConfig> {
        let template: NutanixMachineTemplate = self.worker_machine_template(cluster, group).await?;
        let bootstrap = self.kubeadm_config_template(cluster, group).await?;
        mapping::nutanix_machine_config_from_machine_template(&template, &bootstrap.spec.template.spec.users)
    }

    /// Taints and labels the worker group currently runs with
    pub async fn existing_worker_node_group_config(
        &self,
        cluster: &Cluster,
        group: &WorkerNodeGroupConfiguration,
    ) -> Result<WorkerNodeGroupConfiguration> {
        let bootstrap = self.kubeadm_config_template(cluster, group).await?;
        Ok(mapping::worker_node_group_from_kubeadm_config_template(&bootstrap, &group.name))
    }

    /// Kubernetes version tag the control plane runs
    pub async fn existing_kube_version(&self, cluster: &Cluster) -> Result<String> {
        Ok(self.control_plane(cluster).await?.spec.version)
    }

    pub async fn existing_control_plane_kind_node_image(&self, cluster: &Cluster) -> Result<String> {
        let template: DockerMachineTemplate = self.control_plane_machine_template(cluster).await?;
        Ok(template.spec.template.spec.custom_image)
    }

    pub async fn existing_worker_kind_node_image(&self, cluster: &Cluster, group: &WorkerNodeGroupConfiguration) -> Result<String> {
        let template: DockerMachineTemplate = self.worker_machine_template(cluster, group).await?;
        Ok(template.spec.template.spec.custom_image)
    }

    pub async fn aws_iam_config(&self, reference: &Ref, namespace: &str) -> Result<AWSIamConfig> {
        self.fetch_object_by_name(&reference.name, namespace).await
    }

    pub async fn oidc_config(&self, reference: &Ref, namespace: &str) -> Result<OIDCConfig> {
        self.fetch_object_by_name(&reference.name, namespace).await
    }

    /// Materialized spec for the cluster, built by the configured spec builder
    pub async fn fetch_applied_spec(&self, cluster: &Cluster) -> Result<ClusterSpec> {
        self.spec_builder.build_spec(cluster, self).await
    }
}

#[async_trait]
impl SpecLookups for ResourceFetcher {
    async fn bundles(&self, name: &str, namespace: &str) -> Result<Bundles> {
        self.fetch_object_by_name(name, namespace).await
    }

    async fn eksd_release(&self, name: &str, namespace: &str) -> Result<Release> {
        self.fetch_object_by_name(name, namespace).await
    }

    async fn oidc_config(&self, name: &str, namespace: &str) -> Result<OIDCConfig> {
        self.fetch_object_by_name(name, namespace).await
    }
}
