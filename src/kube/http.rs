//! HTTP utilities for Kubernetes REST API calls

use super::auth::{Auth, ClusterConfig};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Timeout for connecting to the API server
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a whole request, including reading the body
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Kubernetes `Status` object returned with failed requests
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    code: u16,
}

/// Build the error for a non-success response
pub fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ApiStatus>(body) {
        Ok(api) if !api.message.is_empty() => {
            let code = if api.code == 0 { status.as_u16() } else { api.code };
            if api.reason.is_empty() {
                anyhow::anyhow!("{} (HTTP {})", api.message, code)
            } else {
                anyhow::anyhow!("{} ({}, HTTP {})", api.message, api.reason, code)
            }
        }
        _ => anyhow::anyhow!("API request failed: {}", status),
    }
}

/// HTTP client wrapper for API server calls
#[derive(Clone)]
pub struct KubeHttpClient {
    client: Client,
    auth: Auth,
}

impl KubeHttpClient {
    /// Create a client with the cluster's TLS material
    pub fn new(cluster: &ClusterConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("kubeplay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);

        if let Some(ca) = &cluster.ca_pem {
            let cert = reqwest::Certificate::from_pem(ca)
                .context("Failed to parse certificate authority")?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(identity) = &cluster.identity_pem {
            let identity = reqwest::Identity::from_pem(identity)
                .context("Failed to parse client certificate")?;
            builder = builder.identity(identity);
        }

        if cluster.insecure {
            tracing::warn!("TLS verification disabled for {}", cluster.server);
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            auth: cluster.auth.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    /// GET a response body as text, failing on non-success status
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(api_error(status, &body));
        }

        Ok(body)
    }

    /// GET a JSON response
    pub async fn get_json(&self, url: &Url) -> Result<Value> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}
