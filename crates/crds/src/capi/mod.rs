//! Live cluster-api objects
//!
//! Only the fields the reconciler reads are modelled.

pub mod cluster;
pub mod etcd;
pub mod infrastructure;
pub mod kubeadm;

pub use cluster::*;
pub use etcd::*;
pub use infrastructure::*;
pub use kubeadm::*;

/// `cluster.x-k8s.io/v1beta1`
pub const CLUSTER_API_VERSION: &str = "cluster.x-k8s.io/v1beta1";

/// `bootstrap.cluster.x-k8s.io/v1beta1`
pub const BOOTSTRAP_API_VERSION: &str = "bootstrap.cluster.x-k8s.io/v1beta1";

/// `infrastructure.cluster.x-k8s.io/v1beta1`
pub const INFRASTRUCTURE_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta1";

/// `infrastructure.cluster.x-k8s.io/v1beta2`, used by the CloudStack provider
pub const INFRASTRUCTURE_V1BETA2_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta2";
