//! JSON merge-patch and content helpers for MockResourceClient

use serde_json::Value;

/// Apply an RFC 7386 JSON merge patch to `target`
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Drop server-managed metadata so two objects can be compared by content
pub(crate) fn without_server_fields(mut value: Value) -> Value {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("resourceVersion");
        metadata.remove("managedFields");
    }
    value
}

/// Matches equality-based selectors: `a=b,c==d,e!=f` and bare `key` existence
pub(crate) fn matches_selector(labels: Option<&std::collections::BTreeMap<String, String>>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            let label = |key: &str| labels.and_then(|l| l.get(key.trim()));
            if let Some((key, value)) = term.split_once("!=") {
                label(key).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
                label(key).map(String::as_str) == Some(value.trim())
            } else {
                label(term).is_some()
            }
        })
}
