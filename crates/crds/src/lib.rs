//! Cluster resource CRD definitions
//!
//! Typed views of the objects the cluster resource reconciler reads and writes:
//! - `anywhere`: declared cluster intent (`anywhere.eks.amazonaws.com`) and the
//!   release objects it resolves against
//! - `capi`: live cluster-api objects (clusters, machine deployments, control
//!   planes, etcd clusters, bootstrap and infrastructure machine templates)
//!
//! The cluster-api types only model the fields the reconciler inspects; unknown
//! fields are ignored on deserialization.

pub mod anywhere;
pub mod capi;
pub mod references;

pub use references::*;

/// Namespace holding the live cluster-api objects of every managed cluster
pub const EKSA_SYSTEM_NAMESPACE: &str = "eksa-system";

/// Label carrying the owning cluster name on cluster-api objects
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";
