//! Resource client
//!
//! A small, object-safe client over the Kubernetes API for controllers that
//! address objects dynamically by (apiVersion, kind, namespace, name).
//!
//! # Example
//!
//! ```no_run
//! use resource_client::{gvk_from_api_version, KubeResourceClient, ResourceReader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeResourceClient::try_default().await?;
//! let gvk = gvk_from_api_version("cluster.x-k8s.io/v1beta1", "MachineDeployment");
//! let deployments = client
//!     .list(&gvk, "eksa-system", Some("cluster.x-k8s.io/cluster-name=prod"))
//!     .await?;
//! println!("Found {} machine deployments", deployments.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Reads**: get and label-selected list, with a distinguished NotFound error
//! - **Writes**: create, resourceVersion-checked update, JSON merge-patch and
//!   forced server-side apply, all with a field manager and dry-run flag
//! - **Mocking**: `MockResourceClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod object;
#[path = "trait.rs"]
pub mod resource_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeResourceClient;
pub use error::ClientError;
pub use object::{
    api_version_of, from_dynamic, gvk_for, gvk_from_api_version, gvk_of, kind_of, name_of, namespace_of, to_dynamic,
    ObjectKey,
};
pub use resource_trait::{ResourceReader, ResourceWriter, WriteOptions};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockResourceClient, RecordedWrite, WriteVerb};

pub use kube::api::DynamicObject;
pub use kube::core::GroupVersionKind;
