//! HTTP backend for the document service.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `NAVIGATOR_API_URL`: Base URL of the backend (default: http://127.0.0.1:5000)
//! - `NAVIGATOR_TIMEOUT_SECS`: Request timeout (default: 30)
//! - `NAVIGATOR_SUMMARY_ROUTE`: Summary route (default: summary)
//! - `NAVIGATOR_RELATED_ROUTE`: Node route, the id is appended (default: kg_node)
//! - `NAVIGATOR_SEARCH_ROUTE`: Search route (default: search)
//! - `NAVIGATOR_STATUS_ROUTE`: Health check route (default: status)
//!
//! ## Endpoints
//!
//! - `POST /summary` with `{"context": id, "query": query}`, answered with
//!   `{"summary": ...}` or the bare payload
//! - `GET /kg_node/{id}`
//! - `POST /search` with `{"query"}`
//! - `GET /status`, answered with `{"status": "..."}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::debug;

use super::{FetchError, KnowledgeBackend};

/// Route table for the document service, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Summary generation (POST).
    pub summary: String,
    /// Node details and connections (GET, id appended as a path segment).
    pub related: String,
    /// Full-text search (POST).
    pub search: String,
    /// Liveness check (GET).
    pub status: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            summary: "summary".to_string(),
            related: "kg_node".to_string(),
            search: "search".to_string(),
            status: "status".to_string(),
        }
    }
}

impl Routes {
    fn from_env() -> Self {
        let defaults = Self::default();
        let route = |key: &str, fallback: String| {
            std::env::var(key)
                .map(|s| s.trim_matches('/').to_string())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            summary: route("NAVIGATOR_SUMMARY_ROUTE", defaults.summary),
            related: route("NAVIGATOR_RELATED_ROUTE", defaults.related),
            search: route("NAVIGATOR_SEARCH_ROUTE", defaults.search),
            status: route("NAVIGATOR_STATUS_ROUTE", defaults.status),
        }
    }
}

/// Configuration for the HTTP backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
    /// Route table.
    pub routes: Routes,
}

impl BackendConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NAVIGATOR_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            timeout_secs: std::env::var("NAVIGATOR_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            routes: Routes::from_env(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Backend reached over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a backend from configuration.
    ///
    /// Fails if the base URL does not parse or cannot carry a path.
    pub fn new(config: BackendConfig) -> Result<Self, FetchError> {
        let base = Url::parse(&config.base_url).map_err(FetchError::transport)?;
        if base.cannot_be_a_base() {
            return Err(FetchError::Transport(format!(
                "base URL cannot carry a path: {}",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::transport)?;
        Ok(Self { client, base, config })
    }

    /// Create a backend configured from the environment.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::new(BackendConfig::from_env())
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Ask the service whether it is up.
    ///
    /// Returns the reported status line.
    pub async fn status(&self) -> Result<String, FetchError> {
        let url = endpoint(&self.base, &self.config.routes.status, None)?;
        debug!(url = %url, "checking backend status");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        let body = Self::read_json(response).await?;
        Ok(status_line(&body))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Join `route` (and an optional id segment) onto `base`.
///
/// The id is pushed as a single percent-encoded segment, so ids containing
/// `/`, `?` or spaces stay inside that segment.
fn endpoint(base: &Url, route: &str, id: Option<&str>) -> Result<Url, FetchError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("base URL cannot carry a path: {base}")))?;
        segments
            .pop_if_empty()
            .extend(route.split('/').filter(|s| !s.is_empty()));
        if let Some(id) = id {
            segments.push(id);
        }
    }
    Ok(url)
}

/// Strip the `{"summary": ...}` envelope when present.
fn unwrap_summary(body: Value) -> Value {
    match body {
        Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("summary") => {
            obj.remove("summary").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn status_line(body: &Value) -> String {
    match body.get("status") {
        Some(Value::String(s)) => s.clone(),
        _ => body.to_string(),
    }
}

#[async_trait]
impl KnowledgeBackend for HttpBackend {
    async fn summary(&self, query: &str, root_id: &str) -> Result<Value, FetchError> {
        let url = endpoint(&self.base, &self.config.routes.summary, None)?;
        debug!(url = %url, root_id = %root_id, "fetching summary");
        let response = self
            .client
            .post(url)
            .json(&json!({ "context": root_id, "query": query }))
            .send()
            .await
            .map_err(FetchError::transport)?;
        Self::read_json(response).await.map(unwrap_summary)
    }

    async fn related_nodes(&self, root_id: &str) -> Result<Value, FetchError> {
        let url = endpoint(&self.base, &self.config.routes.related, Some(root_id))?;
        debug!(url = %url, "fetching related nodes");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        Self::read_json(response).await
    }

    async fn search(&self, query: &str) -> Result<Value, FetchError> {
        let url = endpoint(&self.base, &self.config.routes.search, None)?;
        debug!(url = %url, "searching");
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(FetchError::transport)?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:5000").unwrap()
    }

    #[test]
    fn test_default_routes() {
        let routes = Routes::default();
        assert_eq!(routes.summary, "summary");
        assert_eq!(routes.related, "kg_node");
        assert_eq!(routes.search, "search");
        assert_eq!(routes.status, "status");
    }

    #[test]
    fn test_endpoint_joins_route() {
        let url = endpoint(&base(), "summary", None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/summary");

        let nested = Url::parse("http://host/api/").unwrap();
        let url = endpoint(&nested, "v2/search", None).unwrap();
        assert_eq!(url.as_str(), "http://host/api/v2/search");
    }

    #[test]
    fn test_endpoint_encodes_id_as_one_segment() {
        let url = endpoint(&base(), "kg_node", Some("a/b?c d")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/kg_node/a%2Fb%3Fc%20d");
        assert_eq!(url.path_segments().unwrap().count(), 2);
        assert!(url.query().is_none());
    }

    #[test]
    fn test_summary_envelope_is_unwrapped() {
        assert_eq!(unwrap_summary(json!({ "summary": "Abstract: x" })), json!("Abstract: x"));
        assert_eq!(unwrap_summary(json!(["t", {}])), json!(["t", {}]));
        // Objects with other fields are left for the normalizer to reject
        let other = json!({ "summary": "x", "error": "y" });
        assert_eq!(unwrap_summary(other.clone()), other);
    }

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(&json!({ "status": "API is running" })), "API is running");
        assert_eq!(status_line(&json!({ "ok": true })), "{\"ok\":true}");
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            timeout_secs: 1,
            routes: Routes::default(),
        };
        assert!(matches!(HttpBackend::new(config), Err(FetchError::Transport(_))));

        let config = BackendConfig {
            base_url: "mailto:someone@example.com".to_string(),
            timeout_secs: 1,
            routes: Routes::default(),
        };
        assert!(matches!(HttpBackend::new(config), Err(FetchError::Transport(_))));
    }
}
