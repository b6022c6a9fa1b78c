//! Exploration session state machine.
//!
//! A session owns the current root, the exploration path and the fetch
//! lifecycle for one radial view.
//!
//! ## States
//!
//! ```text
//! Idle ──set_root──▶ Loading ──both fetches ok──▶ Ready
//!                       │  ▲                        │
//!                       │  └──────select_child──────┘
//!                       └──any failure──▶ Error ──set_root──▶ Loading
//! ```
//!
//! ## Last-request-wins
//!
//! Every `set_root` stamps a new monotonic request token *before* its fetch
//! future is returned, so call order alone defines recency. When a fetch
//! pair resolves, its token is compared with the latest one under the state
//! lock; a superseded result is discarded without touching any state. There
//! is no network cancellation.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{FetchError, KnowledgeBackend};
use crate::normalize::{parse_related, parse_summary, NormalizationError};
use crate::types::{ExplorationPath, Node, RootNode, Summary};

/// Fetch lifecycle of the current root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchState {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the latest request.
    Loading,
    /// Latest request succeeded.
    Ready {
        /// Summary of the current root.
        summary: Summary,
        /// Related documents, shown on the orbit.
        children: Vec<Node>,
    },
    /// Latest request failed.
    Error {
        /// User-facing message.
        message: String,
    },
}

impl FetchState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready { .. } => "ready",
            Self::Error { .. } => "error",
        }
    }

    /// Children of a ready state.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Self::Ready { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Summary of a ready state.
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Self::Ready { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

/// Everything an observer needs to render the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Request token this snapshot reflects (0 before the first request).
    pub token: u64,
    /// Current root.
    pub root: RootNode,
    /// Visited roots.
    pub path: ExplorationPath,
    /// Fetch lifecycle.
    pub state: FetchState,
}

/// How a navigation future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The session moved to `Ready`.
    Ready,
    /// The session moved to `Error`.
    Failed,
    /// A newer request superseded this one; nothing changed.
    Discarded,
    /// The request was a no-op.
    Unchanged,
}

/// Error type for session operations rejected before any fetch starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Child selection needs a `Ready` state.
    #[error("Cannot select a child while {state}")]
    NotReady {
        /// Current state name.
        state: &'static str,
    },
    /// The id is not among the current children.
    #[error("Unknown child node: {0}")]
    UnknownChild(String),
}

/// Why a resolved fetch pair could not become `Ready`.
#[derive(Debug, thiserror::Error)]
enum ResolveError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Normalization(#[from] NormalizationError),
}

/// Future returned by navigation operations.
pub type PendingFetch<'a> = BoxFuture<'a, Resolution>;

struct SessionInner {
    latest_token: u64,
    query: String,
    root: RootNode,
    path: ExplorationPath,
    state: FetchState,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.latest_token,
            root: self.root.clone(),
            path: self.path.clone(),
            state: self.state.clone(),
        }
    }
}

/// One exploration of the corpus around a sequence of roots.
///
/// Sessions are independent; nothing is shared between instances. Dropping
/// the session is the only way to clear its path.
pub struct ExplorationSession<B: KnowledgeBackend> {
    id: Uuid,
    backend: Arc<B>,
    inner: Mutex<SessionInner>,
    updates: watch::Sender<SessionSnapshot>,
}

impl<B: KnowledgeBackend> ExplorationSession<B> {
    /// Create an idle session for the host-supplied root and query.
    ///
    /// The path starts with the initial root.
    pub fn new(backend: Arc<B>, root: RootNode, query: impl Into<String>) -> Self {
        let inner = SessionInner {
            latest_token: 0,
            query: query.into(),
            path: ExplorationPath::starting_at(root.node.clone()),
            root,
            state: FetchState::Idle,
        };
        let (updates, _) = watch::channel(inner.snapshot());
        Self {
            id: Uuid::new_v4(),
            backend,
            inner: Mutex::new(inner),
            updates,
        }
    }

    /// Fetch the initial root.
    pub fn start(&self) -> PendingFetch<'_> {
        let root = self.inner.lock().root.clone();
        self.set_root(root)
    }

    /// Make `root` the current root and fetch its summary and children.
    ///
    /// Valid from any state. The session is `Loading` and the new token is
    /// stamped when this returns; the returned future performs both fetches
    /// concurrently and applies the result only if no newer request has
    /// been made in the meantime.
    pub fn set_root(&self, root: RootNode) -> PendingFetch<'_> {
        let node = root.node.clone();
        let mut inner = self.inner.lock();
        let token = self.begin_locked(&mut inner, root);
        let query = inner.query.clone();
        drop(inner);
        self.pending(token, node, query)
    }

    /// [`set_root`](Self::set_root) under a new query.
    ///
    /// The query applies to this request and every later one.
    pub fn set_root_with_query(
        &self,
        root: RootNode,
        query: impl Into<String>,
    ) -> PendingFetch<'_> {
        let node = root.node.clone();
        let query = query.into();
        let mut inner = self.inner.lock();
        if inner.query != query {
            info!(session_id = %self.id, from = %inner.query, to = %query, "query changed");
            inner.query = query.clone();
        }
        let token = self.begin_locked(&mut inner, root);
        drop(inner);
        self.pending(token, node, query)
    }

    fn pending(&self, token: u64, root: Node, query: String) -> PendingFetch<'_> {
        let span = info_span!(
            "set_root",
            session_id = %self.id,
            token = token,
            root_id = %root.id,
        );
        self.resolve(token, root, query).instrument(span).boxed()
    }

    /// Promote a child of the current `Ready` state to root.
    ///
    /// Selecting the current root is a no-op that resolves to
    /// [`Resolution::Unchanged`]. Otherwise the child is appended to the
    /// path and fetched as with [`set_root`](Self::set_root).
    pub fn select_child(&self, id: &str) -> Result<PendingFetch<'_>, SessionError> {
        let mut inner = self.inner.lock();

        let child = match &inner.state {
            FetchState::Ready { .. } if inner.root.id() == id => {
                debug!(session_id = %self.id, root_id = %id, "selected node is already the root");
                return Ok(future::ready(Resolution::Unchanged).boxed());
            }
            FetchState::Ready { children, .. } => children
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| SessionError::UnknownChild(id.to_string()))?,
            other => {
                return Err(SessionError::NotReady { state: other.name() });
            }
        };

        info!(
            session_id = %self.id,
            from = %inner.root.id(),
            to = %child.id,
            depth = inner.path.len() + 1,
            "promoting child to root"
        );
        inner.path.push(child.clone());
        let token = self.begin_locked(&mut inner, RootNode::from(child.clone()));
        let query = inner.query.clone();
        drop(inner);

        Ok(self.pending(token, child, query))
    }

    /// Stamp a new token and enter `Loading`. Caller holds the lock.
    fn begin_locked(&self, inner: &mut SessionInner, root: RootNode) -> u64 {
        inner.latest_token += 1;
        inner.root = root;
        inner.state = FetchState::Loading;
        self.updates.send_replace(inner.snapshot());
        inner.latest_token
    }

    async fn resolve(&self, token: u64, root: Node, query: String) -> Resolution {
        let (summary, related) = future::join(
            self.backend.summary(&query, &root.id),
            self.backend.related_nodes(&root.id),
        )
        .await;

        let outcome = normalize_pair(summary, related, &root);

        let mut inner = self.inner.lock();
        if inner.latest_token != token {
            debug!(latest = inner.latest_token, "discarding superseded result");
            return Resolution::Discarded;
        }

        let resolution = match outcome {
            Ok((summary, children)) => {
                debug!(children = children.len(), "root ready");
                inner.state = FetchState::Ready { summary, children };
                Resolution::Ready
            }
            Err(e) => {
                warn!(error = %e, "root fetch failed");
                inner.state = FetchState::Error { message: e.to_string() };
                Resolution::Failed
            }
        };
        self.updates.send_replace(inner.snapshot());
        resolution
    }

    /// Subscribe to state changes.
    ///
    /// The receiver starts marked as seen; it observes every snapshot
    /// published after this call.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    /// Current fetch state.
    pub fn state(&self) -> FetchState {
        self.inner.lock().state.clone()
    }

    /// Current root.
    pub fn root(&self) -> RootNode {
        self.inner.lock().root.clone()
    }

    /// Visited roots.
    pub fn path(&self) -> ExplorationPath {
        self.inner.lock().path.clone()
    }

    /// Most recently issued request token.
    pub fn latest_token(&self) -> u64 {
        self.inner.lock().latest_token
    }

    /// Session identifier (for logs).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Query used for the most recent and all later requests.
    pub fn query(&self) -> String {
        self.inner.lock().query.clone()
    }

    /// The backend this session fetches from.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn normalize_pair(
    summary: Result<serde_json::Value, FetchError>,
    related: Result<serde_json::Value, FetchError>,
    root: &Node,
) -> Result<(Summary, Vec<Node>), ResolveError> {
    let summary = parse_summary(&summary?, root)?;
    let children = parse_related(&related?, &root.id)?;
    Ok((summary, children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use serde_json::json;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_summary("P1", json!("Abstract: one"))
            .with_related("P1", json!([["P2", { "pmc_id": "P2", "title": "T2" }]]))
            .with_summary("P2", json!("Abstract: two"))
            .with_related("P2", json!({ "data": [["P1", { "pmc_id": "P1", "title": "T1" }]] }))
    }

    fn session(backend: InMemoryBackend) -> ExplorationSession<InMemoryBackend> {
        ExplorationSession::new(Arc::new(backend), RootNode::new("P1", "T1"), "cancer")
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = session(backend());
        assert_eq!(session.state(), FetchState::Idle);
        assert_eq!(session.latest_token(), 0);
        assert_eq!(session.path().ids(), vec!["P1"]);
    }

    #[tokio::test]
    async fn test_set_root_stamps_eagerly() {
        let session = session(backend());
        let pending = session.start();

        assert_eq!(session.latest_token(), 1);
        assert_eq!(session.state(), FetchState::Loading);

        assert_eq!(pending.await, Resolution::Ready);
        assert_eq!(session.state().children(), Some(&[Node::new("P2", "T2")][..]));
    }

    #[tokio::test]
    async fn test_select_child_requires_ready() {
        let session = session(backend());
        assert_eq!(
            session.select_child("P2").err(),
            Some(SessionError::NotReady { state: "idle" })
        );

        let _pending = session.start();
        assert_eq!(
            session.select_child("P2").err(),
            Some(SessionError::NotReady { state: "loading" })
        );
    }

    #[tokio::test]
    async fn test_select_unknown_child() {
        let session = session(backend());
        session.start().await;
        assert_eq!(
            session.select_child("P9").err(),
            Some(SessionError::UnknownChild("P9".into()))
        );
        assert_eq!(session.path().len(), 1);
    }

    #[tokio::test]
    async fn test_select_root_is_noop() {
        let session = session(backend());
        session.start().await;
        let before = session.snapshot();

        let resolution = session.select_child("P1").unwrap().await;

        assert_eq!(resolution, Resolution::Unchanged);
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_fetch_failure_replaces_ready_payload() {
        let backend = backend().with_related_error("P2", FetchError::Transport("reset".into()));
        let session = session(backend);
        session.start().await;

        let resolution = session.select_child("P2").unwrap().await;

        assert_eq!(resolution, Resolution::Failed);
        assert_eq!(
            session.state(),
            FetchState::Error { message: "Network error: reset".into() }
        );
        assert_eq!(session.path().ids(), vec!["P1", "P2"]);
    }

    #[tokio::test]
    async fn test_normalization_failure_is_error_state() {
        let backend = backend().with_summary("P1", json!({ "unexpected": true }));
        let session = session(backend);

        assert_eq!(session.start().await, Resolution::Failed);
        assert!(matches!(session.state(), FetchState::Error { message } if message.contains("summary")));
    }

    #[tokio::test]
    async fn test_error_is_recoverable() {
        let backend = backend().with_summary_error(
            "P1",
            FetchError::Status { status: 500, message: "boom".into() },
        );
        let session = session(backend);
        assert_eq!(session.start().await, Resolution::Failed);

        let resolution = session.set_root(RootNode::new("P2", "T2")).await;
        assert_eq!(resolution, Resolution::Ready);
        assert_eq!(session.root().id(), "P2");
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let session = session(backend());
        let mut rx = session.subscribe();

        let pending = session.start();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, FetchState::Loading);

        pending.await;
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.state.name(), "ready");
        assert_eq!(snapshot.token, 1);
    }
}
