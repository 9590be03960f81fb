//! Cluster Authentication
//!
//! Resolves a kubeconfig context (or the in-cluster service account) into
//! the server URL, TLS material and credentials used by the HTTP client.

use anyhow::{Context, Result};
use base64::Engine as _;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service account mount used when running inside a pod
const IN_CLUSTER_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Parsed kubeconfig file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kubeconfig {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default, rename = "current-context")]
    pub current_context: Option<String>,
    /// Directory relative file references are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterEntry {
    pub server: String,
    #[serde(default, rename = "certificate-authority")]
    pub certificate_authority: Option<String>,
    #[serde(default, rename = "certificate-authority-data")]
    pub certificate_authority_data: Option<String>,
    #[serde(default, rename = "insecure-skip-tls-verify")]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEntry {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    pub token_file: Option<String>,
    #[serde(default, rename = "client-certificate")]
    pub client_certificate: Option<String>,
    #[serde(default, rename = "client-certificate-data")]
    pub client_certificate_data: Option<String>,
    #[serde(default, rename = "client-key")]
    pub client_key: Option<String>,
    #[serde(default, rename = "client-key-data")]
    pub client_key_data: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Credentials attached to every request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    // Security: never print secrets into logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
            Auth::Basic { username, .. } => write!(f, "Basic({}:***)", username),
        }
    }
}

/// Everything needed to talk to one cluster
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub context: String,
    pub server: String,
    pub namespace: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate followed by its private key, PEM encoded
    pub identity_pem: Option<Vec<u8>>,
    pub insecure: bool,
    pub auth: Auth,
}

impl ClusterConfig {
    /// Plain HTTP(S) endpoint without credentials (`kubectl proxy`, tests)
    pub fn for_server(server: &str) -> Self {
        Self {
            context: "local".to_string(),
            server: server.trim_end_matches('/').to_string(),
            namespace: None,
            ca_pem: None,
            identity_pem: None,
            insecure: false,
            auth: Auth::None,
        }
    }

    /// Resolve a cluster from the kubeconfig, falling back to in-cluster config
    pub fn discover(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        match kubeconfig_path(kubeconfig) {
            Some(path) if path.exists() => {
                let config = Kubeconfig::read(&path)?;
                config.resolve(context)
            }
            _ if std::env::var("KUBERNETES_SERVICE_HOST").is_ok() => Self::in_cluster(),
            Some(path) => Err(anyhow::anyhow!(
                "No kubeconfig found at {}",
                path.display()
            )),
            None => Err(anyhow::anyhow!("No kubeconfig found")),
        }
    }

    /// Service account configuration when running inside a pod
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .context("KUBERNETES_SERVICE_HOST is not set")?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let dir = Path::new(IN_CLUSTER_DIR);

        let token = std::fs::read_to_string(dir.join("token"))
            .context("Failed to read service account token")?;
        let ca_pem = std::fs::read(dir.join("ca.crt")).context("Failed to read cluster CA")?;
        let namespace = std::fs::read_to_string(dir.join("namespace"))
            .ok()
            .map(|ns| ns.trim().to_string());

        Ok(Self {
            context: "in-cluster".to_string(),
            server: format!("https://{}:{}", host, port),
            namespace,
            ca_pem: Some(ca_pem),
            identity_pem: None,
            insecure: false,
            auth: Auth::Bearer(token.trim().to_string()),
        })
    }
}

/// Pick the kubeconfig file: explicit path > $KUBECONFIG (first entry) > ~/.kube/config
pub fn kubeconfig_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(paths) = std::env::var("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }

    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

impl Kubeconfig {
    /// Read and parse a kubeconfig file
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse kubeconfig {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve `context` (or the current context) into a cluster config
    pub fn resolve(&self, context: Option<&str>) -> Result<ClusterConfig> {
        let context_name = context
            .map(String::from)
            .or_else(|| self.current_context.clone())
            .ok_or_else(|| anyhow::anyhow!("No context specified and no current context in kubeconfig"))?;

        let entry = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| anyhow::anyhow!("Context '{}' not found in kubeconfig", context_name))?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == entry.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| anyhow::anyhow!("Cluster '{}' not found in kubeconfig", entry.cluster))?;

        let user = match entry.user.as_deref() {
            Some(name) => self
                .users
                .iter()
                .find(|u| u.name == name)
                .map(|u| u.user.clone())
                .ok_or_else(|| anyhow::anyhow!("User '{}' not found in kubeconfig", name))?,
            None => UserEntry::default(),
        };

        let ca_pem = self
            .load_material(
                cluster.certificate_authority_data.as_deref(),
                cluster.certificate_authority.as_deref(),
            )
            .context("Failed to load certificate authority")?;

        let cert = self
            .load_material(
                user.client_certificate_data.as_deref(),
                user.client_certificate.as_deref(),
            )
            .context("Failed to load client certificate")?;
        let key = self
            .load_material(user.client_key_data.as_deref(), user.client_key.as_deref())
            .context("Failed to load client key")?;
        let identity_pem = match (cert, key) {
            (Some(mut cert), Some(key)) => {
                if !cert.ends_with(b"\n") {
                    cert.push(b'\n');
                }
                cert.extend_from_slice(&key);
                Some(cert)
            }
            _ => None,
        };

        let auth = if let Some(token) = user.token.clone() {
            Auth::Bearer(token)
        } else if let Some(file) = user.token_file.as_deref() {
            let token = std::fs::read_to_string(self.resolve_path(file))
                .with_context(|| format!("Failed to read token file {}", file))?;
            Auth::Bearer(token.trim().to_string())
        } else if let (Some(username), Some(password)) = (user.username.clone(), user.password.clone()) {
            Auth::Basic { username, password }
        } else {
            Auth::None
        };

        tracing::info!("Using context {} ({})", context_name, cluster.server);

        Ok(ClusterConfig {
            context: context_name,
            server: cluster.server.trim_end_matches('/').to_string(),
            namespace: entry.namespace.clone(),
            ca_pem,
            identity_pem,
            insecure: cluster.insecure_skip_tls_verify,
            auth,
        })
    }

    /// Inline base64 data wins over a file reference
    fn load_material(&self, data: Option<&str>, file: Option<&str>) -> Result<Option<Vec<u8>>> {
        if let Some(data) = data {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .context("Invalid base64 data")?;
            return Ok(Some(decoded));
        }
        if let Some(file) = file {
            let path = self.resolve_path(file);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(Some(bytes));
        }
        Ok(None)
    }

    fn resolve_path(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}
