//! Cluster resource reconciler
//!
//! Computes the cluster-api objects a declared Cluster should be running with
//! (provider machine templates, bootstrap config templates and machine
//! deployments) and applies them to the control-plane API.
//!
//! - `fetcher`: reads declared config and live objects, and resolves a key to its Cluster
//! - `template`: per-provider builders that compute the desired objects
//! - `updater`: the write boundary, with a fixed field manager and dry-run forwarding
//! - `reconciler`: one reconcile pass over the above

pub mod config;
pub mod equivalence;
pub mod error;
pub mod fetcher;
pub mod mapping;
pub mod names;
pub mod reconciler;
pub mod render;
pub mod spec;
pub mod template;
pub mod updater;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod reconciler_test;

pub use config::Config;
pub use error::{ReconcileError, Result};
pub use fetcher::ResourceFetcher;
pub use reconciler::{Reconcile, Reconciler};
pub use render::{JinjaManifestRenderer, Manifest, ManifestRenderer};
pub use spec::{BundleSpecBuilder, ClusterSpec, SpecBuilder};
pub use updater::{ResourceUpdater, FIELD_MANAGER};
