//! Change detection between declared config and config reconstructed from live objects
//!
//! Live objects drop some information the declared config carries (SSH key
//! comments in particular), so comparisons here are deliberately lenient about
//! representation and strict about content.

use std::collections::{BTreeMap, HashMap, HashSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crds::anywhere::{MachineConfig, Taint, UserConfiguration, WorkerNodeGroupConfiguration};

/// A new bootstrap config template is needed when taints, labels or SSH users changed
pub fn needs_new_bootstrap_config<M: MachineConfig>(
    new_group: &WorkerNodeGroupConfiguration,
    old_group: &WorkerNodeGroupConfiguration,
    old_machine_config: &M,
    new_machine_config: &M,
) -> bool {
    bootstrap_settings_changed(new_group, old_group)
        || !equivalent_users(old_machine_config.users(), new_machine_config.users())
}

/// Taints or labels of a worker group changed
pub fn bootstrap_settings_changed(new_group: &WorkerNodeGroupConfiguration, old_group: &WorkerNodeGroupConfiguration) -> bool {
    !taints_equal(&new_group.taints, &old_group.taints) || !labels_equal(&new_group.labels, &old_group.labels)
}

/// Set equality; order is irrelevant
pub fn taints_equal(a: &[Taint], b: &[Taint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let a: HashSet<&Taint> = a.iter().collect();
    let b: HashSet<&Taint> = b.iter().collect();
    a == b
}

pub fn labels_equal(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> bool {
    a == b
}

/// Same users, each with an equivalent SSH key set; order is irrelevant
///
/// User names must be unique on both sides, so a repeated user never stands
/// in for a missing one.
pub fn equivalent_users(a: &[UserConfiguration], b: &[UserConfiguration]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut others: HashMap<&str, &[String]> = HashMap::with_capacity(b.len());
    for user in b {
        if others.insert(user.name.as_str(), &user.ssh_authorized_keys).is_some() {
            return false;
        }
    }
    let mut seen = HashSet::with_capacity(a.len());
    a.iter().all(|user| {
        seen.insert(user.name.as_str())
            && others
                .get(user.name.as_str())
                .is_some_and(|keys| equivalent_ssh_keys(&user.ssh_authorized_keys, keys))
    })
}

/// Same SSH keys ignoring trailing comments; order is irrelevant
pub fn equivalent_ssh_keys(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    normalized_keys(a) == normalized_keys(b)
}

fn normalized_keys(keys: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = keys
        .iter()
        .map(|key| strip_ssh_key_comment(key).unwrap_or_else(|| key.clone()))
        .collect();
    normalized.sort();
    normalized
}

/// Reduce an authorized key line to `<type> <base64-blob>`
///
/// Returns None if the line doesn't parse as a public key: no known key type,
/// a blob that isn't base64, or a blob whose embedded type doesn't match.
pub fn strip_ssh_key_comment(key: &str) -> Option<String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    let type_index = tokens.iter().position(|token| is_key_type(token))?;
    let key_type = tokens[type_index];
    let blob = tokens.get(type_index + 1)?;

    let decoded = STANDARD.decode(blob).ok()?;
    let (len, rest) = decoded.split_first_chunk::<4>()?;
    let embedded_type = rest.get(..u32::from_be_bytes(*len) as usize)?;
    if embedded_type != key_type.as_bytes() {
        return None;
    }
    Some(format!("{key_type} {blob}"))
}

fn is_key_type(token: &str) -> bool {
    token.starts_with("ssh-") || token.starts_with("ecdsa-sha2-") || token.starts_with("sk-")
}
