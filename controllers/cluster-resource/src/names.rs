//! Deterministic object names
//!
//! Machine templates are immutable, so rotated templates get a name suffixed
//! with the unix-millisecond time they were minted. The unsuffixed prefixes are
//! what the apply phase matches against.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Clock used when minting template names
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock
pub fn system_clock() -> NowFn {
    Arc::new(Utc::now)
}

/// `<cluster>-control-plane-template`
pub fn control_plane_machine_template_prefix(cluster_name: &str) -> String {
    format!("{cluster_name}-control-plane-template")
}

/// `<cluster>-etcd-template`
pub fn etcd_machine_template_prefix(cluster_name: &str) -> String {
    format!("{cluster_name}-etcd-template")
}

/// `<cluster>-control-plane-template-<ms>`
pub fn control_plane_machine_template_name(cluster_name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", control_plane_machine_template_prefix(cluster_name), now.timestamp_millis())
}

/// `<cluster>-etcd-template-<ms>`
pub fn etcd_machine_template_name(cluster_name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", etcd_machine_template_prefix(cluster_name), now.timestamp_millis())
}

/// `<cluster>-<group>-<ms>`
pub fn worker_machine_template_name(cluster_name: &str, worker_group: &str, now: DateTime<Utc>) -> String {
    format!("{cluster_name}-{worker_group}-{}", now.timestamp_millis())
}

/// `<cluster>-<group>-template-<ms>`
pub fn kubeadm_config_template_name(cluster_name: &str, worker_group: &str, now: DateTime<Utc>) -> String {
    format!("{cluster_name}-{worker_group}-template-{}", now.timestamp_millis())
}

/// `<cluster>-<group>`
pub fn machine_deployment_name(cluster_name: &str, worker_group: &str) -> String {
    format!("{cluster_name}-{worker_group}")
}

/// `<cluster>-etcd`
pub fn etcd_cluster_name(cluster_name: &str) -> String {
    format!("{cluster_name}-etcd")
}
