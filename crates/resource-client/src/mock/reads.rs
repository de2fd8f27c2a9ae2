//! Read operations for MockResourceClient

use kube::api::DynamicObject;
use kube::core::GroupVersionKind;

use super::merge::matches_selector;
use super::{key_for, MockResourceClient};
use crate::error::ClientError;

fn check_injected_failure(client: &MockResourceClient, gvk: &GroupVersionKind) -> Result<(), ClientError> {
    if client.failing_kinds.lock().unwrap().contains(&gvk.kind) {
        return Err(ClientError::InvalidRequest(format!(
            "injected read failure for {}",
            gvk.kind
        )));
    }
    Ok(())
}

pub fn get(client: &MockResourceClient, gvk: &GroupVersionKind, namespace: &str, name: &str) -> Result<DynamicObject, ClientError> {
    check_injected_failure(client, gvk)?;
    client
        .objects
        .lock()
        .unwrap()
        .get(&key_for(gvk, namespace, name))
        .cloned()
        .ok_or_else(|| ClientError::NotFound {
            kind: gvk.kind.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
}

pub fn list(
    client: &MockResourceClient,
    gvk: &GroupVersionKind,
    namespace: &str,
    label_selector: Option<&str>,
) -> Result<Vec<DynamicObject>, ClientError> {
    check_injected_failure(client, gvk)?;
    let objects = client.objects.lock().unwrap();
    Ok(objects
        .iter()
        .filter(|((group, kind, ns, _), _)| {
            *group == gvk.group && *kind == gvk.kind && (namespace.is_empty() || ns == namespace)
        })
        .filter(|(_, obj)| {
            label_selector.is_none_or(|selector| matches_selector(obj.metadata.labels.as_ref(), selector))
        })
        .map(|(_, obj)| obj.clone())
        .collect())
}
