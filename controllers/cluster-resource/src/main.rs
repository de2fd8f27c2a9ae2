//! Cluster Resource Controller
//!
//! Runs one reconcile pass for the cluster (or nested config object) named by
//! the environment, then exits. Retrying is left to whatever schedules it.

use std::sync::Arc;

use anyhow::{Context, Result};
use cluster_resource::names::system_clock;
use cluster_resource::{
    BundleSpecBuilder, Config, JinjaManifestRenderer, ManifestRenderer, Reconcile, Reconciler, ResourceFetcher,
    ResourceUpdater,
};
use resource_client::{KubeResourceClient, ObjectKey};
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Install the ring crypto provider before any TLS connection is made
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Cluster Resource Controller");

    let config = Config::from_env()?;
    info!(
        cluster = %config.cluster_name,
        namespace = %config.cluster_namespace,
        dry_run = config.dry_run,
        template_dir = ?config.manifest_template_dir,
        timeout_secs = config.reconcile_timeout.as_secs(),
        "Configuration loaded"
    );

    let client = Arc::new(KubeResourceClient::try_default().await?);
    let fetcher = Arc::new(ResourceFetcher::new(client.clone(), Arc::new(BundleSpecBuilder)));
    let updater = ResourceUpdater::new(client);
    let renderer: Arc<dyn ManifestRenderer> = match &config.manifest_template_dir {
        Some(dir) => Arc::new(JinjaManifestRenderer::from_dir(dir)?),
        None => Arc::new(JinjaManifestRenderer::new()?),
    };

    let span = info_span!("reconcile", cluster = %config.cluster_name, namespace = %config.cluster_namespace);
    let reconciler = Reconciler::new(fetcher, updater, renderer, system_clock(), span);

    let key = ObjectKey::new(&config.cluster_namespace, &config.cluster_name);
    tokio::time::timeout(config.reconcile_timeout, reconciler.reconcile(&key, config.dry_run))
        .await
        .with_context(|| format!("reconcile of {key} timed out after {:?}", config.reconcile_timeout))??;

    info!(key = %key, "Reconcile complete");
    Ok(())
}
