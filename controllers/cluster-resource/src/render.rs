//! Manifest rendering
//!
//! Template builders hand a value map to a `ManifestRenderer` and get back a
//! multi-document YAML stream, which `parse_documents` splits into objects.
//! The default renderer is a minijinja environment with the provider
//! manifests embedded at build time.

use std::path::Path;

use crds::EKSA_SYSTEM_NAMESPACE;
use kube::api::DynamicObject;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior};
use tracing::{debug, warn};

use crate::error::{ReconcileError, Result};

const COMMON_TEMPLATE: &str = include_str!("../templates/common.yaml.j2");
const RESOURCES_TEMPLATE: &str = include_str!("../templates/resources.yaml.j2");
const VSPHERE_TEMPLATE: &str = include_str!("../templates/vsphere.yaml.j2");
const CLOUDSTACK_TEMPLATE: &str = include_str!("../templates/cloudstack.yaml.j2");
const DOCKER_TEMPLATE: &str = include_str!("../templates/docker.yaml.j2");
const NUTANIX_TEMPLATE: &str = include_str!("../templates/nutanix.yaml.j2");
const AWS_IAM_AUTH_TEMPLATE: &str = include_str!("../templates/aws-iam-authenticator.yaml.j2");

/// Embedded templates by file name
const EMBEDDED_TEMPLATES: [(&str, &str); 7] = [
    ("common.yaml.j2", COMMON_TEMPLATE),
    ("resources.yaml.j2", RESOURCES_TEMPLATE),
    ("vsphere.yaml.j2", VSPHERE_TEMPLATE),
    ("cloudstack.yaml.j2", CLOUDSTACK_TEMPLATE),
    ("docker.yaml.j2", DOCKER_TEMPLATE),
    ("nutanix.yaml.j2", NUTANIX_TEMPLATE),
    ("aws-iam-authenticator.yaml.j2", AWS_IAM_AUTH_TEMPLATE),
];

/// Manifests a template builder can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Manifest {
    VSphere,
    CloudStack,
    Docker,
    Nutanix,
    AwsIamAuth,
}

impl Manifest {
    pub fn template_name(self) -> &'static str {
        match self {
            Manifest::VSphere => "vsphere.yaml.j2",
            Manifest::CloudStack => "cloudstack.yaml.j2",
            Manifest::Docker => "docker.yaml.j2",
            Manifest::Nutanix => "nutanix.yaml.j2",
            Manifest::AwsIamAuth => "aws-iam-authenticator.yaml.j2",
        }
    }
}

/// Renders a manifest from a value map into a multi-document YAML stream
pub trait ManifestRenderer: Send + Sync {
    fn render(&self, manifest: Manifest, values: &serde_json::Value) -> Result<Vec<u8>>;
}

/// minijinja-backed renderer
pub struct JinjaManifestRenderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for JinjaManifestRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaManifestRenderer").finish_non_exhaustive()
    }
}

impl JinjaManifestRenderer {
    /// Renderer over the embedded templates
    pub fn new() -> Result<Self> {
        let mut env = Self::environment();
        for (name, source) in EMBEDDED_TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Renderer over the embedded templates, replaced by any same-named file in `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut env = Self::environment();
        for (name, source) in EMBEDDED_TEMPLATES {
            let path = dir.join(name);
            if path.is_file() {
                let content = std::fs::read_to_string(&path).map_err(|err| {
                    ReconcileError::InvalidConfig(format!("reading template {}: {err}", path.display()))
                })?;
                debug!(template = name, path = %path.display(), "Using template override");
                env.add_template_owned(name.to_string(), content)?;
            } else {
                env.add_template(name, source)?;
            }
        }
        Ok(Self { env })
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        // Output is YAML; values are quoted explicitly by the templates
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("tojson", tojson);
        env.add_filter("quote", quote);
        env
    }
}

impl ManifestRenderer for JinjaManifestRenderer {
    fn render(&self, manifest: Manifest, values: &serde_json::Value) -> Result<Vec<u8>> {
        let template = self.env.get_template(manifest.template_name())?;
        let rendered = template.render(values)?;
        Ok(rendered.into_bytes())
    }
}

/// Render a value as inline JSON, which is also valid YAML flow syntax
///
/// Usage: {{ worker.taints | tojson }}
fn tojson(value: minijinja::Value) -> std::result::Result<String, Error> {
    serde_json::to_string(&value).map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))
}

/// Double-quote a string
///
/// Usage: {{ version | quote }}
fn quote(value: minijinja::Value) -> String {
    let s = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Split a rendered stream on `---` lines and keep documents that declare a kind
///
/// Documents that don't parse are skipped. Namespaced documents without a
/// namespace land in the system namespace.
pub fn parse_documents(content: &[u8]) -> Vec<DynamicObject> {
    let content = String::from_utf8_lossy(content);
    let mut documents = Vec::new();
    let mut current = String::new();
    for line in content.lines() {
        if line.trim_end() == "---" {
            documents.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents.push(current);

    documents
        .iter()
        .filter(|doc| !doc.trim().is_empty())
        .filter_map(|doc| match parse_document(doc) {
            Ok(obj) => obj,
            Err(err) => {
                warn!(error = %err, "Skipping unparseable manifest document");
                None
            }
        })
        .collect()
}

fn parse_document(doc: &str) -> std::result::Result<Option<DynamicObject>, String> {
    let value: serde_json::Value = serde_yaml::from_str(doc).map_err(|err| err.to_string())?;
    let has_kind = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|kind| !kind.is_empty());
    if !has_kind {
        return Ok(None);
    }

    let mut obj: DynamicObject = serde_json::from_value(value).map_err(|err| err.to_string())?;
    if obj.metadata.namespace.as_deref().unwrap_or_default().is_empty() {
        obj.metadata.namespace = Some(EKSA_SYSTEM_NAMESPACE.to_string());
    }
    Ok(Some(obj))
}
