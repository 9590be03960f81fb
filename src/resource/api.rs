//! Resource API seam
//!
//! The only operations the binding layer needs from a cluster. The live
//! implementation is [`crate::kube::KubeApi`]; tests substitute in-memory ones.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

/// Where a resource kind lives in the cluster API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiResource {
    /// API group, empty for the core group
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub plural: String,
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
}

fn default_namespaced() -> bool {
    true
}

impl ApiResource {
    /// `apiVersion` string as it appears on objects (`v1`, `apps/v1`)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Options accepted by list calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    /// Page size. When set, only a single page is fetched.
    pub limit: Option<u32>,
}

impl ListOptions {
    /// Options selecting a single object by name
    pub fn by_name(name: &str) -> Self {
        Self {
            field_selector: Some(format!("metadata.name={}", name)),
            ..Self::default()
        }
    }
}

/// Options accepted by log calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub container: Option<String>,
    pub tail_lines: Option<i64>,
    pub previous: bool,
    pub timestamps: bool,
}

/// Namespace and name of one object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    pub namespace: String,
    pub name: String,
}

impl ItemIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Read the identity from an object's metadata
    pub fn from_item(item: &Value) -> Option<Self> {
        let metadata = item.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;
        let namespace = metadata
            .get("namespace")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Some(Self::new(namespace, name))
    }
}

impl std::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// A fully fetched list response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceList {
    /// `kind` reported by the server (`PodList`), if any
    pub kind: Option<String>,
    pub items: Vec<Value>,
}

/// Remote resource operations consumed by the binding layer.
///
/// Calls are synchronous and run to completion; the REPL evaluates one
/// command at a time, so implementations only need sequential reuse.
pub trait ResourceApi {
    /// List every object of `resource` in `scope`
    fn fetch_list(
        &self,
        resource: &ApiResource,
        scope: &str,
        options: &ListOptions,
    ) -> Result<ResourceList>;

    /// Fetch the log text of one pod container
    fn fetch_log_stream(&self, item: &ItemIdentity, options: &LogOptions) -> Result<String>;
}

/// True when `scope` means "every namespace"
pub fn is_all_namespaces(scope: &str) -> bool {
    matches!(scope.trim(), "" | "*")
}
