//! AWS IAM authenticator template
//!
//! Only the `aws-auth` mapping ConfigMap is reconciled; the authenticator's
//! own config is rendered for completeness and dropped.

use std::sync::Arc;

use crds::anywhere::{AWSIamConfig, MapRoles, MapUsers};
use kube::api::DynamicObject;
use resource_client::kind_of;
use serde::Serialize;
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::render::{parse_documents, Manifest, ManifestRenderer};
use crate::spec::ClusterSpec;

/// ConfigMap carrying the IAM identity mappings
pub const AWS_AUTH_CONFIG_MAP: &str = "aws-auth";

const DEFAULT_PARTITION: &str = "aws";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AwsIamValues {
    authenticator_config: String,
    map_roles: String,
    map_users: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatorConfig<'a> {
    #[serde(rename = "clusterID")]
    cluster_id: &'a str,
    partition: &'a str,
    backend_mode: &'a [String],
}

#[derive(Debug, Serialize)]
struct RoleMapping<'a> {
    rolearn: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    groups: &'a [String],
}

#[derive(Debug, Serialize)]
struct UserMapping<'a> {
    userarn: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    groups: &'a [String],
}

/// Builds the aws-iam-authenticator objects of a self-managed cluster
pub struct AwsIamConfigTemplate {
    renderer: Arc<dyn ManifestRenderer>,
}

impl AwsIamConfigTemplate {
    pub fn new(renderer: Arc<dyn ManifestRenderer>) -> Self {
        Self { renderer }
    }

    /// The `aws-auth` ConfigMap for the cluster's AWSIamConfig
    pub fn template_resources(&self, spec: &ClusterSpec) -> Result<Vec<DynamicObject>> {
        let config = spec.aws_iam_config.as_ref().ok_or_else(|| {
            ReconcileError::Validation(format!("cluster {} has no resolved AWSIamConfig", spec.cluster.name()))
        })?;

        let values = values(spec.cluster.name(), config)?;
        let content = self.renderer.render(Manifest::AwsIamAuth, &serde_json::to_value(values)?)?;
        let resources: Vec<DynamicObject> = parse_documents(&content)
            .into_iter()
            .filter(|obj| kind_of(obj) == "ConfigMap" && obj.metadata.name.as_deref() == Some(AWS_AUTH_CONFIG_MAP))
            .collect();
        debug!(cluster = spec.cluster.name(), count = resources.len(), "Rendered IAM authenticator resources");
        Ok(resources)
    }
}

fn values(cluster_name: &str, config: &AWSIamConfig) -> Result<AwsIamValues> {
    let partition = match config.spec.partition.as_str() {
        "" => DEFAULT_PARTITION,
        partition => partition,
    };
    Ok(AwsIamValues {
        authenticator_config: to_yaml(&AuthenticatorConfig {
            cluster_id: cluster_name,
            partition,
            backend_mode: &config.spec.backend_mode,
        })?,
        map_roles: to_yaml(&role_mappings(&config.spec.map_roles))?,
        map_users: to_yaml(&user_mappings(&config.spec.map_users))?,
    })
}

fn role_mappings(roles: &[MapRoles]) -> Vec<RoleMapping<'_>> {
    roles
        .iter()
        .map(|role| RoleMapping {
            rolearn: &role.role_arn,
            username: &role.username,
            groups: &role.groups,
        })
        .collect()
}

fn user_mappings(users: &[MapUsers]) -> Vec<UserMapping<'_>> {
    users
        .iter()
        .map(|user| UserMapping {
            userarn: &user.user_arn,
            username: &user.username,
            groups: &user.groups,
        })
        .collect()
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|err| ReconcileError::Render(err.to_string()))
}
