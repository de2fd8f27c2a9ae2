//! Materialized cluster specification
//!
//! A `ClusterSpec` is the declared Cluster plus everything it resolves to:
//! the release bundle, identity providers and the provider's nested configs.
//! It is rebuilt on every reconcile pass and never persisted.
//!
//! Building the release-dependent part is delegated to a `SpecBuilder`, which
//! reads through the `SpecLookups` callbacks the fetcher provides.

use std::collections::HashMap;

use async_trait::async_trait;
use crds::anywhere::{
    kinds, AWSIamConfig, Bundles, CloudStackDatacenterConfig, CloudStackMachineConfig, Cluster, DockerDatacenterConfig,
    NutanixDatacenterConfig, NutanixMachineConfig, OIDCConfig, Release, VSphereDatacenterConfig, VSphereMachineConfig,
    VersionsBundle, WorkerNodeGroupConfiguration,
};
use crds::EKSA_SYSTEM_NAMESPACE;
use tracing::debug;

use crate::error::{ReconcileError, Result};

/// Infrastructure provider, derived from the datacenter ref kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    VSphere,
    CloudStack,
    Docker,
    Nutanix,
}

impl Provider {
    /// Provider for a datacenter config kind
    pub fn from_datacenter_kind(kind: &str) -> Result<Self> {
        match kind {
            kinds::VSPHERE_DATACENTER_CONFIG => Ok(Provider::VSphere),
            kinds::CLOUDSTACK_DATACENTER_CONFIG => Ok(Provider::CloudStack),
            kinds::DOCKER_DATACENTER_CONFIG => Ok(Provider::Docker),
            kinds::NUTANIX_DATACENTER_CONFIG => Ok(Provider::Nutanix),
            other => Err(ReconcileError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Datacenter config and machine configs of one provider
#[derive(Debug, Clone)]
pub struct ProviderConfigs<D, M> {
    pub datacenter: D,
    pub control_plane: M,
    /// Present when the cluster declares external etcd
    pub etcd: Option<M>,
    /// Worker machine configs keyed by machine group name
    pub workers: HashMap<String, M>,
}

impl<D, M> ProviderConfigs<D, M> {
    /// Machine config of a worker group
    pub fn worker_machine_config(&self, group: &WorkerNodeGroupConfiguration) -> Result<&M> {
        let group_ref = group.machine_group_ref.as_ref().ok_or_else(|| {
            ReconcileError::Validation(format!("worker node group {} has no machineGroupRef", group.name))
        })?;
        self.workers.get(&group_ref.name).ok_or_else(|| {
            ReconcileError::Validation(format!(
                "machine config {} of worker node group {} was not resolved",
                group_ref.name, group.name
            ))
        })
    }
}

/// Resolved nested configs, by provider
#[derive(Debug, Clone)]
pub enum ProviderSpec {
    VSphere(ProviderConfigs<VSphereDatacenterConfig, VSphereMachineConfig>),
    CloudStack(ProviderConfigs<CloudStackDatacenterConfig, CloudStackMachineConfig>),
    Docker(DockerDatacenterConfig),
    Nutanix(ProviderConfigs<NutanixDatacenterConfig, NutanixMachineConfig>),
}

#[derive(Debug, Clone)]
pub struct ClusterSpec {
    pub cluster: Cluster,
    pub bundles: Option<Bundles>,
    /// Versions bundle matching the cluster's Kubernetes version
    pub versions_bundle: Option<VersionsBundle>,
    pub eksd_release: Option<Release>,
    pub oidc_config: Option<OIDCConfig>,
    pub aws_iam_config: Option<AWSIamConfig>,
    pub provider: Option<ProviderSpec>,
}

impl ClusterSpec {
    /// Spec with nothing resolved yet
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            bundles: None,
            versions_bundle: None,
            eksd_release: None,
            oidc_config: None,
            aws_iam_config: None,
            provider: None,
        }
    }

    /// Full Kubernetes version tag from the release bundle, falling back to `v<kubernetesVersion>`
    pub fn kube_version_tag(&self) -> String {
        self.versions_bundle
            .as_ref()
            .map(|bundle| bundle.eks_d.kube_version.clone())
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| format!("v{}", self.cluster.spec.kubernetes_version))
    }
}

/// Lookups a spec builder may perform against the control plane
#[async_trait]
pub trait SpecLookups: Send + Sync {
    async fn bundles(&self, name: &str, namespace: &str) -> Result<Bundles>;
    async fn eksd_release(&self, name: &str, namespace: &str) -> Result<Release>;
    async fn oidc_config(&self, name: &str, namespace: &str) -> Result<OIDCConfig>;
}

/// Builds the materialized spec for a cluster
#[async_trait]
pub trait SpecBuilder: Send + Sync {
    async fn build_spec(&self, cluster: &Cluster, lookups: &dyn SpecLookups) -> Result<ClusterSpec>;
}

/// Resolves the cluster's release bundle, EKS Distro release and OIDC configs
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleSpecBuilder;

#[async_trait]
impl SpecBuilder for BundleSpecBuilder {
    async fn build_spec(&self, cluster: &Cluster, lookups: &dyn SpecLookups) -> Result<ClusterSpec> {
        let bundles_ref = cluster.spec.bundles_ref.as_ref().ok_or_else(|| {
            ReconcileError::Validation(format!("cluster {} has no bundlesRef", cluster.name()))
        })?;
        let bundles = lookups.bundles(&bundles_ref.name, &bundles_ref.namespace).await?;

        let kube_version = &cluster.spec.kubernetes_version;
        let versions_bundle = bundles.versions_bundle(kube_version).cloned().ok_or_else(|| {
            ReconcileError::Validation(format!(
                "bundles {} has no versions bundle for kubernetes version {kube_version}",
                bundles_ref.name
            ))
        })?;
        debug!(
            cluster = cluster.name(),
            bundles = %bundles_ref.name,
            kube_version = %kube_version,
            "Resolved versions bundle"
        );

        let eksd_release = lookups
            .eksd_release(&versions_bundle.eks_d.name, EKSA_SYSTEM_NAMESPACE)
            .await?;

        let mut spec = ClusterSpec::new(cluster.clone());
        for oidc_ref in cluster.identity_provider_refs_of_kind(kinds::OIDC_CONFIG) {
            spec.oidc_config = Some(lookups.oidc_config(&oidc_ref.name, cluster.namespace()).await?);
        }
        spec.bundles = Some(bundles);
        spec.versions_bundle = Some(versions_bundle);
        spec.eksd_release = Some(eksd_release);
        Ok(spec)
    }
}
