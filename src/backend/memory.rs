//! In-memory backend for testing and offline demos.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use super::{FetchError, KnowledgeBackend};

/// Which operation a recorded call was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `summary(query, root_id)`.
    Summary {
        /// Query text.
        query: String,
        /// Root id.
        root_id: String,
    },
    /// `related_nodes(root_id)`.
    Related {
        /// Root id.
        root_id: String,
    },
    /// `search(query)`.
    Search {
        /// Query text.
        query: String,
    },
}

/// Scripted backend.
///
/// Responses are registered per root id (or per query for search). Unknown
/// keys answer with a 404 [`FetchError::Status`]. Calls for a root can be
/// held open with [`InMemoryBackend::hold`] until [`InMemoryBackend::release`],
/// which lets tests control resolution order.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    summaries: BTreeMap<String, Result<Value, FetchError>>,
    related: BTreeMap<String, Result<Value, FetchError>>,
    searches: BTreeMap<String, Result<Value, FetchError>>,
    gates: Mutex<BTreeMap<String, watch::Sender<bool>>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the summary payload for a root.
    pub fn with_summary(mut self, root_id: impl Into<String>, payload: Value) -> Self {
        self.summaries.insert(root_id.into(), Ok(payload));
        self
    }

    /// Register the related-nodes payload for a root.
    pub fn with_related(mut self, root_id: impl Into<String>, payload: Value) -> Self {
        self.related.insert(root_id.into(), Ok(payload));
        self
    }

    /// Register the search payload for a query.
    pub fn with_search(mut self, query: impl Into<String>, payload: Value) -> Self {
        self.searches.insert(query.into(), Ok(payload));
        self
    }

    /// Make the summary fetch for a root fail.
    pub fn with_summary_error(mut self, root_id: impl Into<String>, error: FetchError) -> Self {
        self.summaries.insert(root_id.into(), Err(error));
        self
    }

    /// Make the related-nodes fetch for a root fail.
    pub fn with_related_error(mut self, root_id: impl Into<String>, error: FetchError) -> Self {
        self.related.insert(root_id.into(), Err(error));
        self
    }

    /// Hold every fetch for `root_id` until [`release`](Self::release) is called.
    pub fn hold(&self, root_id: impl Into<String>) {
        let (tx, _rx) = watch::channel(false);
        self.gates.lock().insert(root_id.into(), tx);
    }

    /// Let held fetches for `root_id` complete.
    pub fn release(&self, root_id: &str) {
        if let Some(gate) = self.gates.lock().remove(root_id) {
            gate.send_replace(true);
        }
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far.
    pub fn num_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn wait_for_gate(&self, root_id: &str) {
        let receiver = self.gates.lock().get(root_id).map(|tx| tx.subscribe());
        if let Some(mut rx) = receiver {
            // A dropped sender means the gate was released
            let _ = rx.wait_for(|open| *open).await;
        }
    }

    fn lookup(
        table: &BTreeMap<String, Result<Value, FetchError>>,
        key: &str,
    ) -> Result<Value, FetchError> {
        table.get(key).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                status: 404,
                message: format!("no entry for {key}"),
            })
        })
    }
}

#[async_trait]
impl KnowledgeBackend for InMemoryBackend {
    async fn summary(&self, query: &str, root_id: &str) -> Result<Value, FetchError> {
        self.calls.lock().push(BackendCall::Summary {
            query: query.to_string(),
            root_id: root_id.to_string(),
        });
        self.wait_for_gate(root_id).await;
        Self::lookup(&self.summaries, root_id)
    }

    async fn related_nodes(&self, root_id: &str) -> Result<Value, FetchError> {
        self.calls.lock().push(BackendCall::Related {
            root_id: root_id.to_string(),
        });
        self.wait_for_gate(root_id).await;
        Self::lookup(&self.related, root_id)
    }

    async fn search(&self, query: &str) -> Result<Value, FetchError> {
        self.calls.lock().push(BackendCall::Search {
            query: query.to_string(),
        });
        Self::lookup(&self.searches, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scripted_responses() {
        let backend = InMemoryBackend::new()
            .with_summary("P1", json!("Abstract: x"))
            .with_related("P1", json!([]));

        assert_eq!(backend.summary("q", "P1").await.unwrap(), json!("Abstract: x"));
        assert_eq!(backend.related_nodes("P1").await.unwrap(), json!([]));
        assert!(matches!(
            backend.related_nodes("P9").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(backend.num_calls(), 3);
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let backend = Arc::new(InMemoryBackend::new().with_related("P1", json!([])));
        backend.hold("P1");

        let pending = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.related_nodes("P1").await })
        };
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        backend.release("P1");
        assert!(pending.await.unwrap().is_ok());
    }
}
