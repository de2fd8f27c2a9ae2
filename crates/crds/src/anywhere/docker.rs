//! Docker provider configuration CRD
//!
//! The Docker provider has no per-machine configuration; machines run the
//! kind node image published in the release bundle.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "DockerDatacenterConfig",
    namespaced
)]
pub struct DockerDatacenterConfigSpec {}
