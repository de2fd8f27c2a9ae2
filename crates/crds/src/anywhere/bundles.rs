//! Release bundle CRDs
//!
//! `Bundles` pins the component versions for each supported Kubernetes minor
//! version; `Release` is the EKS Distro release a versions bundle points at.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "Bundles",
    plural = "bundles",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BundlesSpec {
    #[serde(default)]
    pub number: i32,

    #[serde(default)]
    pub versions_bundles: Vec<VersionsBundle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionsBundle {
    /// Kubernetes minor version this bundle is for (e.g., "1.27")
    pub kube_version: String,

    #[serde(rename = "eksD", default)]
    pub eks_d: EksDRelease,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EksDRelease {
    /// Name of the EKS Distro `Release` object
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub channel: String,

    /// Full Kubernetes version tag (e.g., "v1.27.1-eks-1-27-4")
    #[serde(default)]
    pub kube_version: String,

    /// Node image for kind-based (Docker) clusters
    #[serde(default)]
    pub kind_node: Image,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Image {
    #[serde(default)]
    pub uri: String,
}

impl Bundles {
    /// Versions bundle for a Kubernetes minor version
    pub fn versions_bundle(&self, kube_version: &str) -> Option<&VersionsBundle> {
        self.spec
            .versions_bundles
            .iter()
            .find(|bundle| bundle.kube_version == kube_version)
    }
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "distro.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "Release",
    namespaced
)]
pub struct ReleaseSpec {
    #[serde(default)]
    pub channel: String,

    #[serde(default)]
    pub number: i32,
}
