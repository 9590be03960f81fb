//! Kubernetes Client
//!
//! Main client for the API server, combining cluster configuration and
//! HTTP functionality, plus the blocking adapter the bindings call.

use super::auth::ClusterConfig;
use super::http::KubeHttpClient;
use crate::resource::{
    is_all_namespaces, ApiResource, ItemIdentity, ListOptions, LogOptions, ResourceApi,
    ResourceList,
};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio::runtime::Handle;
use url::Url;

/// Page size for paginated list requests
pub const PAGE_SIZE: u32 = 500;

/// One page of a list response
pub struct ListPage {
    pub kind: Option<String>,
    pub items: Vec<Value>,
    pub continue_token: Option<String>,
}

/// Main Kubernetes client
#[derive(Clone)]
pub struct KubeClient {
    pub cluster: ClusterConfig,
    pub http: KubeHttpClient,
    base: Url,
}

impl KubeClient {
    /// Create a new client for a resolved cluster
    pub fn new(cluster: ClusterConfig) -> Result<Self> {
        let http = KubeHttpClient::new(&cluster)?;
        let base = Url::parse(&cluster.server)
            .with_context(|| format!("Invalid server URL: {}", cluster.server))?;

        Ok(Self {
            cluster,
            http,
            base,
        })
    }

    /// Context name this client talks to
    pub fn context_name(&self) -> &str {
        &self.cluster.context
    }

    /// Build an API path under the server URL
    fn api_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", prefix, path));
        Ok(url)
    }

    /// URL of the collection for `resource` in `scope`.
    ///
    /// Namespaced kinds list across all namespaces for `""` or `"*"`;
    /// cluster-scoped kinds ignore the scope.
    pub fn collection_url(&self, resource: &ApiResource, scope: &str) -> Result<Url> {
        let root = if resource.group.is_empty() {
            format!("/api/{}", resource.version)
        } else {
            format!("/apis/{}/{}", resource.group, resource.version)
        };

        let path = if resource.namespaced && !is_all_namespaces(scope) {
            format!(
                "{}/namespaces/{}/{}",
                root,
                urlencoding::encode(scope.trim()),
                resource.plural
            )
        } else {
            format!("{}/{}", root, resource.plural)
        };

        self.api_url(&path)
    }

    /// Fetch one page of a list
    pub async fn list_page(
        &self,
        resource: &ApiResource,
        scope: &str,
        options: &ListOptions,
        continue_token: Option<&str>,
    ) -> Result<ListPage> {
        let mut url = self.collection_url(resource, scope)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(selector) = &options.label_selector {
                query.append_pair("labelSelector", selector);
            }
            if let Some(selector) = &options.field_selector {
                query.append_pair("fieldSelector", selector);
            }
            query.append_pair("limit", &options.limit.unwrap_or(PAGE_SIZE).to_string());
            if let Some(token) = continue_token {
                query.append_pair("continue", token);
            }
        }

        let response = self.http.get_json(&url).await?;

        let kind = response
            .get("kind")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let items = match response.get("items") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(anyhow::anyhow!("Malformed list response: items is not an array")),
        };

        let continue_token = response
            .get("metadata")
            .and_then(|m| m.get("continue"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(ListPage {
            kind,
            items,
            continue_token,
        })
    }

    /// Fetch a whole list (auto-paginate unless a limit was given)
    pub async fn list(
        &self,
        resource: &ApiResource,
        scope: &str,
        options: &ListOptions,
    ) -> Result<ResourceList> {
        let mut all_items = Vec::new();
        let mut kind = None;
        let mut continue_token: Option<String> = None;

        loop {
            let page = self
                .list_page(resource, scope, options, continue_token.as_deref())
                .await
                .with_context(|| format!("Failed to list {}", resource.plural))?;

            if kind.is_none() {
                kind = page.kind;
            }
            all_items.extend(page.items);

            if options.limit.is_some() || page.continue_token.is_none() {
                break;
            }
            continue_token = page.continue_token;
        }

        Ok(ResourceList {
            kind,
            items: all_items,
        })
    }

    /// Fetch the logs of one pod container
    pub async fn pod_logs(&self, pod: &ItemIdentity, options: &LogOptions) -> Result<String> {
        let mut url = self.api_url(&format!(
            "/api/v1/namespaces/{}/pods/{}/log",
            urlencoding::encode(&pod.namespace),
            urlencoding::encode(&pod.name)
        ))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(container) = &options.container {
                query.append_pair("container", container);
            }
            if let Some(lines) = options.tail_lines {
                query.append_pair("tailLines", &lines.to_string());
            }
            if options.previous {
                query.append_pair("previous", "true");
            }
            if options.timestamps {
                query.append_pair("timestamps", "true");
            }
        }
        // Drop an empty `?` left behind when no parameter was set
        if url.query() == Some("") {
            url.set_query(None);
        }

        self.http
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch logs for {}", pod))
    }
}

/// Blocking [`ResourceApi`] over a [`KubeClient`].
///
/// Each call blocks the calling thread on the runtime until the request
/// completes; it must not be used from inside that runtime.
pub struct KubeApi {
    client: KubeClient,
    runtime: Handle,
}

impl KubeApi {
    pub fn new(client: KubeClient, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    pub fn client(&self) -> &KubeClient {
        &self.client
    }
}

impl ResourceApi for KubeApi {
    fn fetch_list(
        &self,
        resource: &ApiResource,
        scope: &str,
        options: &ListOptions,
    ) -> Result<ResourceList> {
        self.runtime
            .block_on(self.client.list(resource, scope, options))
    }

    fn fetch_log_stream(&self, item: &ItemIdentity, options: &LogOptions) -> Result<String> {
        self.runtime.block_on(self.client.pod_logs(item, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::get_resource;

    fn client(server: &str) -> KubeClient {
        KubeClient::new(ClusterConfig::for_server(server)).unwrap()
    }

    #[test]
    fn test_core_namespaced_url() {
        let pods = &get_resource("pods").unwrap().api;
        let url = client("https://k8s.example.com")
            .collection_url(pods, "default")
            .unwrap();
        assert_eq!(url.as_str(), "https://k8s.example.com/api/v1/namespaces/default/pods");
    }

    #[test]
    fn test_all_namespaces_url() {
        let pods = &get_resource("pods").unwrap().api;
        let c = client("https://k8s.example.com");
        for scope in ["", "*", " * "] {
            let url = c.collection_url(pods, scope).unwrap();
            assert_eq!(url.path(), "/api/v1/pods");
        }
    }

    #[test]
    fn test_namespace_named_all() {
        let pods = &get_resource("pods").unwrap().api;
        let url = client("https://k8s.example.com")
            .collection_url(pods, "all")
            .unwrap();
        assert_eq!(url.path(), "/api/v1/namespaces/all/pods");
    }

    #[test]
    fn test_group_and_cluster_scoped_urls() {
        let c = client("https://k8s.example.com");
        let deployments = &get_resource("deployments").unwrap().api;
        assert_eq!(
            c.collection_url(deployments, "prod").unwrap().path(),
            "/apis/apps/v1/namespaces/prod/deployments"
        );

        let nodes = &get_resource("nodes").unwrap().api;
        assert_eq!(c.collection_url(nodes, "prod").unwrap().path(), "/api/v1/nodes");
    }

    #[test]
    fn test_server_path_prefix_is_kept() {
        let pods = &get_resource("pods").unwrap().api;
        let url = client("https://rancher.example.com/k8s/clusters/c-1")
            .collection_url(pods, "default")
            .unwrap();
        assert_eq!(url.path(), "/k8s/clusters/c-1/api/v1/namespaces/default/pods");
    }

    #[test]
    fn test_invalid_server_url() {
        assert!(KubeClient::new(ClusterConfig::for_server("not a url")).is_err());
    }
}
