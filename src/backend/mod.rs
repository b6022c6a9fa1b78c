//! Backend collaborators.
//!
//! The navigator consumes three remote operations. Responses are returned
//! as raw JSON; shape handling belongs to [`crate::normalize`].

pub mod memory;

#[cfg(feature = "client")]
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

/// Error type for backend fetches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
    /// The response body was not valid JSON.
    #[error("Malformed response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(e: E) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Remote operations the navigator depends on.
///
/// Implementations must be safe to call concurrently; a session fans out
/// `summary` and `related_nodes` at the same time.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// Summary for `root_id` in the context of `query`.
    ///
    /// Either a string or `[abstractText, metadata]`.
    async fn summary(&self, query: &str, root_id: &str) -> Result<Value, FetchError>;

    /// Documents related to `root_id`.
    ///
    /// Either `[[id, metadata], ...]` or `{"data": [[id, metadata], ...]}`.
    async fn related_nodes(&self, root_id: &str) -> Result<Value, FetchError>;

    /// Full-text search, `[[abstractText, metadata, categories], ...]`.
    async fn search(&self, query: &str) -> Result<Value, FetchError>;
}

pub use memory::InMemoryBackend;

#[cfg(feature = "client")]
pub use http::{BackendConfig, HttpBackend, Routes};
