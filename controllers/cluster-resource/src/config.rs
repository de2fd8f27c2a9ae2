//! Runtime configuration
//!
//! Loaded from environment variables:
//! - `CLUSTER_NAME` (required): cluster, or nested config object, to reconcile
//! - `CLUSTER_NAMESPACE` (default "default")
//! - `DRY_RUN` (default false): forward dry-run on every write
//! - `MANIFEST_TEMPLATE_DIR` (optional): override the embedded manifest templates
//! - `RECONCILE_TIMEOUT_SECS` (default 300)

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ReconcileError, Result};

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cluster_name: String,
    pub cluster_namespace: String,
    pub dry_run: bool,
    pub manifest_template_dir: Option<PathBuf>,
    pub reconcile_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cluster_name = lookup("CLUSTER_NAME")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ReconcileError::InvalidConfig("CLUSTER_NAME environment variable is required".to_string())
            })?;

        let cluster_namespace = lookup("CLUSTER_NAMESPACE")
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let dry_run = match lookup("DRY_RUN") {
            Some(value) => parse_bool("DRY_RUN", &value)?,
            None => false,
        };

        let reconcile_timeout = match lookup("RECONCILE_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|e| {
                ReconcileError::InvalidConfig(format!("RECONCILE_TIMEOUT_SECS={value}: {e}"))
            })?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            cluster_name,
            cluster_namespace,
            dry_run,
            manifest_template_dir: lookup("MANIFEST_TEMPLATE_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            reconcile_timeout,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ReconcileError::InvalidConfig(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
