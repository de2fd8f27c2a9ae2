//! Write boundary to the control-plane API
//!
//! Every write goes out under the same field manager so later server-side
//! applies can reclaim fields this engine wrote before. Dry-run is forwarded
//! to the API server as a request flag, never short-circuited here.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::api::DynamicObject;
use kube::Resource;
use resource_client::{kind_of, to_dynamic, ClientError, ResourceWriter, WriteOptions};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ReconcileError, Result};

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "eks-a-controller";

/// Applies desired objects to the control-plane API
pub struct ResourceUpdater {
    client: Arc<dyn ResourceWriter>,
}

impl std::fmt::Debug for ResourceUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceUpdater")
            .field("field_manager", &FIELD_MANAGER)
            .finish_non_exhaustive()
    }
}

fn write_options(dry_run: bool) -> WriteOptions {
    WriteOptions::new(FIELD_MANAGER, dry_run)
}

fn apply_error(obj: &DynamicObject, source: ClientError) -> ReconcileError {
    ReconcileError::Apply {
        kind: kind_of(obj).to_string(),
        name: obj.metadata.name.clone().unwrap_or_default(),
        source,
    }
}

impl ResourceUpdater {
    /// Updater writing through `client`
    pub fn new(client: Arc<dyn ResourceWriter>) -> Self {
        Self { client }
    }

    /// Create `obj`, dropping any resourceVersion it carries
    pub async fn create_resource(&self, obj: &DynamicObject, dry_run: bool) -> Result<DynamicObject> {
        let mut obj = obj.clone();
        obj.metadata.resource_version = None;
        debug!(kind = kind_of(&obj), name = ?obj.metadata.name, dry_run, "Creating resource");
        self.client
            .create(&obj, &write_options(dry_run))
            .await
            .map_err(|err| apply_error(&obj, err))
    }

    /// Set each dotted field path of `template` to its value
    ///
    /// Every path must already exist on the object. Returns whether the object
    /// differs from what it was before.
    pub fn update_template(template: &mut DynamicObject, values: &BTreeMap<String, Value>) -> Result<bool> {
        let original = serde_json::to_value(&*template)?;
        let mut updated = original.clone();

        for (path, value) in values {
            let field = field_mut(&mut updated, path).ok_or_else(|| {
                ReconcileError::Validation(format!(
                    "field {path} does not exist on {} {}",
                    kind_of(template),
                    template.metadata.name.as_deref().unwrap_or_default()
                ))
            })?;
            *field = value.clone();
        }

        if updated == original {
            return Ok(false);
        }
        *template = serde_json::from_value(updated)?;
        Ok(true)
    }

    /// Set field values on `template` and merge-patch it if anything changed
    pub async fn apply_template(
        &self,
        template: &mut DynamicObject,
        values: &BTreeMap<String, Value>,
        dry_run: bool,
    ) -> Result<()> {
        info!(
            kind = kind_of(template),
            name = ?template.metadata.name,
            values = ?values,
            "Applying template values"
        );
        if !Self::update_template(template, values)? {
            debug!(kind = kind_of(template), name = ?template.metadata.name, "Template already up to date");
            return Ok(());
        }
        self.client
            .merge_patch(template, &write_options(dry_run))
            .await
            .map_err(|err| apply_error(template, err))?;
        Ok(())
    }

    /// Full update; the caller sets the resourceVersion it last read
    pub async fn apply_updated_template(&self, obj: &DynamicObject, dry_run: bool) -> Result<DynamicObject> {
        debug!(
            kind = kind_of(obj),
            name = ?obj.metadata.name,
            resource_version = ?obj.metadata.resource_version,
            dry_run,
            "Updating resource"
        );
        self.client
            .update(obj, &write_options(dry_run))
            .await
            .map_err(|err| apply_error(obj, err))
    }

    /// Forced server-side apply; creates or adopts the object
    pub async fn force_apply_template(&self, obj: &DynamicObject, dry_run: bool) -> Result<DynamicObject> {
        debug!(kind = kind_of(obj), name = ?obj.metadata.name, dry_run, "Force applying resource");
        self.client
            .server_side_apply(obj, &write_options(dry_run))
            .await
            .map_err(|err| apply_error(obj, err))
    }

    /// Merge-patch a typed object as it is
    pub async fn apply_patch<K>(&self, obj: &K, dry_run: bool) -> Result<DynamicObject>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let obj = to_dynamic(obj)?;
        debug!(kind = kind_of(&obj), name = ?obj.metadata.name, dry_run, "Patching resource");
        self.client
            .merge_patch(&obj, &write_options(dry_run))
            .await
            .map_err(|err| apply_error(&obj, err))
    }
}

/// Existing field at a dotted path
fn field_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object_mut()?.get_mut(segment))
}
