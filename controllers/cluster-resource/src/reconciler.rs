//! Cluster resource reconciliation
//!
//! One pass resolves the Cluster a key names, materializes its spec, computes
//! the desired objects with the provider's template builder and then applies
//! them. Everything is computed before the first write, so an error anywhere
//! before the apply phase leaves the cluster untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use crds::anywhere::{
    kinds, CloudStackDatacenterConfig, CloudStackMachineConfig, Cluster, DockerDatacenterConfig, NutanixDatacenterConfig,
    NutanixMachineConfig, VSphereDatacenterConfig, VSphereMachineConfig,
};
use crds::EKSA_SYSTEM_NAMESPACE;
use kube::api::DynamicObject;
use kube::Resource;
use resource_client::{kind_of, namespace_of, ObjectKey};
use serde::de::DeserializeOwned;
use tracing::{debug, info, Instrument, Span};

use crate::error::{ReconcileError, Result};
use crate::fetcher::ResourceFetcher;
use crate::names::{self, NowFn};
use crate::render::ManifestRenderer;
use crate::spec::{ClusterSpec, Provider, ProviderConfigs, ProviderSpec};
use crate::template::{AwsIamConfigTemplate, CloudStackTemplate, DockerTemplate, NutanixTemplate, VSphereTemplate};
use crate::updater::ResourceUpdater;

/// Entry point an external controller drives
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// Bring the live objects of the cluster `key` names in line with its declared config
    async fn reconcile(&self, key: &ObjectKey, dry_run: bool) -> Result<()>;
}

/// Reconciles one cluster's provider resources per pass
pub struct Reconciler {
    fetcher: Arc<ResourceFetcher>,
    updater: ResourceUpdater,
    vsphere: VSphereTemplate,
    cloudstack: CloudStackTemplate,
    docker: DockerTemplate,
    nutanix: NutanixTemplate,
    aws_iam: AwsIamConfigTemplate,
    span: Span,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("fetcher", &self.fetcher)
            .field("updater", &self.updater)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler with one template builder per provider, all sharing `fetcher`, `renderer` and `now`
    pub fn new(
        fetcher: Arc<ResourceFetcher>,
        updater: ResourceUpdater,
        renderer: Arc<dyn ManifestRenderer>,
        now: NowFn,
        span: Span,
    ) -> Self {
        Self {
            vsphere: VSphereTemplate::new(fetcher.clone(), renderer.clone(), now.clone()),
            cloudstack: CloudStackTemplate::new(fetcher.clone(), renderer.clone(), now.clone()),
            docker: DockerTemplate::new(fetcher.clone(), renderer.clone(), now.clone()),
            nutanix: NutanixTemplate::new(fetcher.clone(), renderer.clone(), now),
            aws_iam: AwsIamConfigTemplate::new(renderer),
            fetcher,
            updater,
            span,
        }
    }

    async fn reconcile_cluster(&self, key: &ObjectKey, dry_run: bool) -> Result<()> {
        let cluster = self.fetcher.fetch_cluster(key).await?;
        info!(key = %key, cluster = cluster.name(), dry_run, "Reconciling cluster resources");

        let mut spec = self.fetcher.fetch_applied_spec(&cluster).await?;
        self.resolve_identity_providers(&cluster, &key.namespace, &mut spec).await?;

        let mut resources = self.provider_resources(&cluster, &key.namespace, &mut spec).await?;
        if cluster.is_self_managed() && has_aws_iam(&cluster) {
            resources.extend(self.aws_iam.template_resources(&spec)?);
        }
        debug!(cluster = cluster.name(), count = resources.len(), "Computed desired resources");

        self.apply_templates(&cluster, &resources, dry_run).await?;
        info!(cluster = cluster.name(), count = resources.len(), "Reconciled cluster resources");
        Ok(())
    }

    async fn resolve_identity_providers(&self, cluster: &Cluster, namespace: &str, spec: &mut ClusterSpec) -> Result<()> {
        for identity_ref in &cluster.spec.identity_provider_refs {
            match identity_ref.kind.as_str() {
                kinds::AWS_IAM_CONFIG => {
                    spec.aws_iam_config = Some(self.fetcher.aws_iam_config(identity_ref, namespace).await?);
                }
                kinds::OIDC_CONFIG => {
                    spec.oidc_config = Some(self.fetcher.oidc_config(identity_ref, namespace).await?);
                }
                other => debug!(kind = other, name = %identity_ref.name, "Ignoring identity provider"),
            }
        }
        Ok(())
    }

    /// Resolve the provider configs into `spec` and compute the provider's desired objects
    async fn provider_resources(
        &self,
        cluster: &Cluster,
        namespace: &str,
        spec: &mut ClusterSpec,
    ) -> Result<Vec<DynamicObject>> {
        match Provider::from_datacenter_kind(&cluster.spec.datacenter_ref.kind)? {
            Provider::VSphere => {
                let configs: ProviderConfigs<VSphereDatacenterConfig, VSphereMachineConfig> =
                    self.provider_configs(cluster, namespace).await?;
                spec.provider = Some(ProviderSpec::VSphere(configs.clone()));
                self.vsphere.template_resources(cluster, spec, &configs).await
            }
            Provider::CloudStack => {
                let configs: ProviderConfigs<CloudStackDatacenterConfig, CloudStackMachineConfig> =
                    self.provider_configs(cluster, namespace).await?;
                spec.provider = Some(ProviderSpec::CloudStack(configs.clone()));
                self.cloudstack.template_resources(cluster, spec, &configs).await
            }
            Provider::Docker => {
                let datacenter: DockerDatacenterConfig = self
                    .fetcher
                    .fetch_object_by_name(&cluster.spec.datacenter_ref.name, namespace)
                    .await?;
                spec.provider = Some(ProviderSpec::Docker(datacenter));
                self.docker.template_resources(cluster, spec).await
            }
            Provider::Nutanix => {
                let configs: ProviderConfigs<NutanixDatacenterConfig, NutanixMachineConfig> =
                    self.provider_configs(cluster, namespace).await?;
                spec.provider = Some(ProviderSpec::Nutanix(configs.clone()));
                self.nutanix.template_resources(cluster, spec, &configs).await
            }
        }
    }

    /// Datacenter config plus the control plane, etcd and worker machine configs
    async fn provider_configs<D, M>(&self, cluster: &Cluster, namespace: &str) -> Result<ProviderConfigs<D, M>>
    where
        D: Resource<DynamicType = ()> + DeserializeOwned,
        M: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let datacenter = self
            .fetcher
            .fetch_object_by_name(&cluster.spec.datacenter_ref.name, namespace)
            .await?;

        let control_plane_ref = cluster.control_plane_machine_group_ref().ok_or_else(|| {
            ReconcileError::Validation(format!("cluster {} has no control plane machineGroupRef", cluster.name()))
        })?;
        let control_plane = self.fetcher.fetch_object_by_name(&control_plane_ref.name, namespace).await?;

        let etcd = if cluster.has_external_etcd() {
            let etcd_ref = cluster.etcd_machine_group_ref().ok_or_else(|| {
                ReconcileError::Validation(format!("cluster {} has no external etcd machineGroupRef", cluster.name()))
            })?;
            Some(self.fetcher.fetch_object_by_name(&etcd_ref.name, namespace).await?)
        } else {
            None
        };

        let mut workers = HashMap::new();
        for group in &cluster.spec.worker_node_group_configurations {
            let group_ref = group.machine_group_ref.as_ref().ok_or_else(|| {
                ReconcileError::Validation(format!("worker node group {} has no machineGroupRef", group.name))
            })?;
            if workers.contains_key(&group_ref.name) {
                continue;
            }
            let machine_config = self.fetcher.fetch_object_by_name(&group_ref.name, namespace).await?;
            workers.insert(group_ref.name.clone(), machine_config);
        }

        Ok(ProviderConfigs {
            datacenter,
            control_plane,
            etcd,
            workers,
        })
    }

    /// Update every desired object that exists and force-apply the rest
    ///
    /// A self-managed cluster's control plane and etcd machine templates are
    /// left alone; rotating them is the cluster upgrade's job.
    pub async fn apply_templates(&self, cluster: &Cluster, resources: &[DynamicObject], dry_run: bool) -> Result<()> {
        let control_plane_prefix = names::control_plane_machine_template_prefix(cluster.name());
        let etcd_prefix = names::etcd_machine_template_prefix(cluster.name());

        for desired in resources {
            let kind = kind_of(desired);
            let name = desired.metadata.name.as_deref().unwrap_or_default();
            if cluster.is_self_managed()
                && kind.ends_with("MachineTemplate")
                && (name.starts_with(&control_plane_prefix) || name.starts_with(&etcd_prefix))
            {
                debug!(kind, name, "Skipping self-managed control plane template");
                continue;
            }

            let namespace = match namespace_of(desired) {
                "" => EKSA_SYSTEM_NAMESPACE,
                namespace => namespace,
            };
            let api_version = desired.types.as_ref().map(|t| t.api_version.as_str()).unwrap_or_default();

            let mut obj = desired.clone();
            obj.metadata.namespace = Some(namespace.to_string());
            match self.fetcher.fetch(name, namespace, kind, api_version).await {
                Ok(existing) => {
                    obj.metadata.resource_version = existing.metadata.resource_version.clone();
                    obj.metadata.annotations = merge_annotations(
                        existing.metadata.annotations.as_ref(),
                        desired.metadata.annotations.as_ref(),
                    );
                    info!(kind, name, namespace, "Updating resource");
                    self.updater.apply_updated_template(&obj, dry_run).await?;
                }
                Err(err) if err.is_not_found() => {
                    info!(kind, name, namespace, "Applying new resource");
                    self.updater.force_apply_template(&obj, dry_run).await?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Reconcile for Reconciler {
    async fn reconcile(&self, key: &ObjectKey, dry_run: bool) -> Result<()> {
        self.reconcile_cluster(key, dry_run).instrument(self.span.clone()).await
    }
}

fn has_aws_iam(cluster: &Cluster) -> bool {
    cluster.identity_provider_refs_of_kind(kinds::AWS_IAM_CONFIG).next().is_some()
}

/// Existing annotations overlaid with the desired ones; desired values win
fn merge_annotations(
    existing: Option<&BTreeMap<String, String>>,
    desired: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    let mut merged = existing.cloned().unwrap_or_default();
    if let Some(desired) = desired {
        merged.extend(desired.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    (!merged.is_empty()).then_some(merged)
}
