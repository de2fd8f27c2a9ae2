//! kube-backed resource client

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::discovery::{self, ApiResource, Scope};
use kube::Client;
use tracing::debug;

use crate::error::ClientError;
use crate::object::{gvk_of, name_of, namespace_of};
use crate::resource_trait::{ResourceReader, ResourceWriter, WriteOptions};

/// Resource client talking to a Kubernetes API server
///
/// Objects are addressed dynamically. Each kind is resolved once through API
/// discovery, so plural names and scope come from the server rather than
/// being guessed from the kind.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    resources: Arc<Mutex<HashMap<GroupVersionKind, (ApiResource, Scope)>>>,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient").finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: Arc::default(),
        }
    }

    /// Create a client from the ambient kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self, ClientError> {
        Ok(Self::new(Client::try_default().await?))
    }

    /// Discovered resource and scope of `gvk`, cached per client
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<(ApiResource, Scope), ClientError> {
        if let Some(found) = self.cached(gvk) {
            return Ok(found);
        }
        let (resource, capabilities) = discovery::pinned_kind(&self.client, gvk).await?;
        debug!(kind = %gvk.kind, plural = %resource.plural, "Discovered resource");
        let resolved = (resource, capabilities.scope);
        if let Ok(mut resources) = self.resources.lock() {
            resources.insert(gvk.clone(), resolved.clone());
        }
        Ok(resolved)
    }

    fn cached(&self, gvk: &GroupVersionKind) -> Option<(ApiResource, Scope)> {
        self.resources.lock().ok()?.get(gvk).cloned()
    }

    async fn api(&self, gvk: &GroupVersionKind, namespace: &str) -> Result<Api<DynamicObject>, ClientError> {
        let (resource, scope) = self.resolve(gvk).await?;
        Ok(match scope {
            Scope::Namespaced if !namespace.is_empty() => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        })
    }

    fn post_params(options: &WriteOptions) -> PostParams {
        PostParams {
            dry_run: options.dry_run,
            field_manager: Some(options.field_manager.clone()),
        }
    }
}

#[async_trait::async_trait]
impl ResourceReader for KubeResourceClient {
    async fn get(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) -> Result<DynamicObject, ClientError> {
        debug!(kind = %gvk.kind, namespace, name, "Getting object");
        self.api(gvk, namespace)
            .await?
            .get(name)
            .await
            .map_err(|e| ClientError::from_kube(e, &gvk.kind, namespace, name))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClientError> {
        debug!(kind = %gvk.kind, namespace, label_selector, "Listing objects");
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.api(gvk, namespace).await?.list(&params).await?;
        Ok(list.items)
    }
}

#[async_trait::async_trait]
impl ResourceWriter for KubeResourceClient {
    async fn create(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        let gvk = gvk_of(obj)?;
        let name = name_of(obj)?;
        let namespace = namespace_of(obj);
        self.api(&gvk, namespace)
            .await?
            .create(&Self::post_params(options), obj)
            .await
            .map_err(|e| ClientError::from_kube(e, &gvk.kind, namespace, name))
    }

    async fn update(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        let gvk = gvk_of(obj)?;
        let name = name_of(obj)?;
        let namespace = namespace_of(obj);
        self.api(&gvk, namespace)
            .await?
            .replace(name, &Self::post_params(options), obj)
            .await
            .map_err(|e| ClientError::from_kube(e, &gvk.kind, namespace, name))
    }

    async fn merge_patch(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        let gvk = gvk_of(obj)?;
        let name = name_of(obj)?;
        let namespace = namespace_of(obj);
        let params = PatchParams {
            dry_run: options.dry_run,
            field_manager: Some(options.field_manager.clone()),
            ..Default::default()
        };
        self.api(&gvk, namespace)
            .await?
            .patch(name, &params, &Patch::Merge(obj))
            .await
            .map_err(|e| ClientError::from_kube(e, &gvk.kind, namespace, name))
    }

    async fn server_side_apply(&self, obj: &DynamicObject, options: &WriteOptions) -> Result<DynamicObject, ClientError> {
        let gvk = gvk_of(obj)?;
        let name = name_of(obj)?;
        let namespace = namespace_of(obj);

        // Server-side apply rejects objects carrying a resourceVersion it doesn't match
        let mut applied = obj.clone();
        applied.metadata.resource_version = None;
        applied.metadata.managed_fields = None;

        let mut params = PatchParams::apply(&options.field_manager).force();
        params.dry_run = options.dry_run;

        self.api(&gvk, namespace)
            .await?
            .patch(name, &params, &Patch::Apply(&applied))
            .await
            .map_err(|e| ClientError::from_kube(e, &gvk.kind, namespace, name))
    }
}
