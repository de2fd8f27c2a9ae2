//! Identity provider CRDs

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "AWSIamConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AWSIamConfigSpec {
    #[serde(default)]
    pub aws_region: String,

    /// Backends the authenticator reads mappings from (e.g., "EKSConfigMap")
    #[serde(default)]
    pub backend_mode: Vec<String>,

    #[serde(default)]
    pub map_roles: Vec<MapRoles>,

    #[serde(default)]
    pub map_users: Vec<MapUsers>,

    /// AWS partition, "aws" when empty
    #[serde(default)]
    pub partition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MapRoles {
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MapUsers {
    #[serde(rename = "userARN")]
    pub user_arn: String,
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "anywhere.eks.amazonaws.com",
    version = "v1alpha1",
    kind = "OIDCConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OIDCConfigSpec {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub issuer_url: String,

    #[serde(default)]
    pub groups_claim: String,

    #[serde(default)]
    pub groups_prefix: String,

    #[serde(default)]
    pub username_claim: String,

    #[serde(default)]
    pub username_prefix: String,

    #[serde(default)]
    pub required_claims: Vec<OIDCConfigRequiredClaim>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OIDCConfigRequiredClaim {
    pub claim: String,
    pub value: String,
}
