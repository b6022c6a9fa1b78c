//! Interaction layer.
//!
//! A [`GraphView`] is what a host mounts to show one session. It pulls the
//! latest session snapshot and container size, keeps a layout that is rebuilt
//! only when either changed, tracks the hovered node, and forwards clicks to
//! the host. It never mutates the session: whether a child click navigates
//! is the host's decision.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::backend::KnowledgeBackend;
use crate::layout::{self, Dimensions, LayoutNode, LayoutParams, LayoutSnapshot, NodeKind};
use crate::session::{ExplorationSession, FetchState, SessionSnapshot};
use crate::types::{ExplorationPath, Node, Summary};
use crate::viewport::{ResizeSubscription, Viewport};

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoverTarget {
    /// The root marker.
    Root,
    /// A child marker, by id.
    Node(String),
}

/// What was clicked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickTarget {
    /// The root marker.
    Root,
    /// A child marker, by id.
    Child(String),
}

/// Host callback for node clicks.
///
/// Receives the child's id, or `None` when the root was clicked.
pub trait NodeClickHandler: Send + Sync {
    /// Handle a click.
    fn on_node_click(&self, node_id: Option<&str>);
}

impl<F> NodeClickHandler for F
where
    F: Fn(Option<&str>) + Send + Sync,
{
    fn on_node_click(&self, node_id: Option<&str>) {
        self(node_id)
    }
}

/// A positioned node plus its presentation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedNode {
    /// Geometry.
    #[serde(flatten)]
    pub layout: LayoutNode,
    /// Whether the node is under the pointer.
    pub highlighted: bool,
}

/// A root-to-child edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEdge {
    /// Child id.
    pub target: String,
    /// Start x (root center).
    pub x1: f64,
    /// Start y.
    pub y1: f64,
    /// End x (child center).
    pub x2: f64,
    /// End y.
    pub y2: f64,
    /// Whether the edge is emphasized by the current hover.
    pub emphasized: bool,
}

/// Ready-state render model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFrame {
    /// Root first, then children.
    pub nodes: Vec<RenderedNode>,
    /// One edge per child.
    pub edges: Vec<RenderedEdge>,
    /// Summary panel content.
    pub summary: Summary,
    /// Breadcrumb of visited roots.
    pub path: ExplorationPath,
    /// Version of the layout parameters in use.
    pub layout_id: String,
    /// Layout fingerprint, for change detection. Covers the parameters too.
    pub fingerprint: String,
}

/// Everything the host needs to draw the view at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Frame {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the root's data.
    Loading {
        /// Root being fetched.
        root: Node,
    },
    /// The whole view is replaced by one message.
    Error {
        /// Message to show.
        message: String,
    },
    /// Graph and summary.
    Graph(GraphFrame),
}

/// A mounted radial view.
///
/// Mounting acquires a session subscription and a resize subscription;
/// dropping the view releases both.
pub struct GraphView<H: NodeClickHandler> {
    params: LayoutParams,
    handler: H,
    updates: watch::Receiver<SessionSnapshot>,
    resize: ResizeSubscription,
    snapshot: SessionSnapshot,
    dimensions: Dimensions,
    layout: Option<LayoutSnapshot>,
    hover: Option<HoverTarget>,
    recomputes: usize,
}

impl<H: NodeClickHandler> GraphView<H> {
    /// Mount a view over `session`, sized by `viewport`.
    pub fn mount<B: KnowledgeBackend>(
        session: &ExplorationSession<B>,
        viewport: &Viewport,
        handler: H,
    ) -> Self {
        let updates = session.subscribe();
        let resize = viewport.observe();
        let mut view = Self {
            params: LayoutParams::default(),
            handler,
            snapshot: session.snapshot(),
            dimensions: resize.current(),
            updates,
            resize,
            layout: None,
            hover: None,
            recomputes: 0,
        };
        view.rebuild_layout();
        view
    }

    /// Use custom layout parameters.
    pub fn with_params(mut self, params: LayoutParams) -> Self {
        self.params = params;
        self.rebuild_layout();
        self
    }

    /// Pull pending session and resize updates.
    ///
    /// Returns whether the layout was rebuilt.
    pub fn sync(&mut self) -> bool {
        let mut dirty = false;

        if let Some(dimensions) = self.resize.poll_resize() {
            dirty |= dimensions != self.dimensions;
            self.dimensions = dimensions;
        }

        if self.updates.has_changed().unwrap_or(false) {
            let next = self.updates.borrow_and_update().clone();
            dirty |= node_set_changed(&self.snapshot, &next);
            self.snapshot = next;
        }

        if dirty {
            self.rebuild_layout();
        }
        dirty
    }

    fn rebuild_layout(&mut self) {
        self.layout = match &self.snapshot.state {
            FetchState::Ready { children, .. } => {
                self.recomputes += 1;
                Some(layout::compute(
                    &self.params,
                    self.dimensions,
                    &self.snapshot.root.node,
                    children,
                ))
            }
            _ => None,
        };

        let still_present = match (&self.hover, &self.layout) {
            (Some(HoverTarget::Node(id)), Some(layout)) => layout.find(id).is_some(),
            (Some(HoverTarget::Node(_)), None) => false,
            _ => true,
        };
        if !still_present {
            self.hover = None;
        }
    }

    /// Set or clear the highlighted node. Presentation only.
    pub fn hover(&mut self, target: Option<HoverTarget>) {
        self.hover = target;
    }

    /// Currently highlighted node.
    pub fn highlighted(&self) -> Option<&HoverTarget> {
        self.hover.as_ref()
    }

    /// Forward a click to the host.
    ///
    /// Child ids not in the current layout are ignored. Returns whether the
    /// handler was called.
    pub fn click(&self, target: ClickTarget) -> bool {
        match target {
            ClickTarget::Root => {
                self.handler.on_node_click(None);
                true
            }
            ClickTarget::Child(id) => {
                let known = self
                    .layout
                    .as_ref()
                    .and_then(|l| l.find(&id))
                    .is_some_and(|n| n.kind == NodeKind::Child);
                if known {
                    self.handler.on_node_click(Some(&id));
                } else {
                    debug!(node_id = %id, "ignoring click on unknown node");
                }
                known
            }
        }
    }

    /// Node marker under `(x, y)`, children checked before the root.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<ClickTarget> {
        let layout = self.layout.as_ref()?;
        let inside = |n: &LayoutNode| (n.x - x).hypot(n.y - y) <= n.radius;

        if let Some(child) = layout.children().iter().find(|n| inside(*n)) {
            return Some(ClickTarget::Child(child.node.id.clone()));
        }
        layout.root().filter(|n| inside(*n)).map(|_| ClickTarget::Root)
    }

    /// Pointer moved to `(x, y)`: update the highlight.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.hover = self.hit_test(x, y).map(|target| match target {
            ClickTarget::Root => HoverTarget::Root,
            ClickTarget::Child(id) => HoverTarget::Node(id),
        });
    }

    /// Pointer left the view.
    pub fn pointer_leave(&mut self) {
        self.hover = None;
    }

    /// Pointer clicked at `(x, y)`. Returns whether the handler was called.
    pub fn pointer_click(&self, x: f64, y: f64) -> bool {
        match self.hit_test(x, y) {
            Some(target) => self.click(target),
            None => false,
        }
    }

    /// Sync and build the current frame.
    pub fn frame(&mut self) -> Frame {
        self.sync();

        match (&self.snapshot.state, &self.layout) {
            (FetchState::Idle, _) => Frame::Idle,
            (FetchState::Loading, _) => Frame::Loading {
                root: self.snapshot.root.node.clone(),
            },
            (FetchState::Error { message }, _) => Frame::Error {
                message: message.clone(),
            },
            (FetchState::Ready { summary, .. }, Some(layout)) => {
                Frame::Graph(self.graph_frame(summary.clone(), layout))
            }
            // Ready always has a layout after sync
            (FetchState::Ready { .. }, None) => Frame::Loading {
                root: self.snapshot.root.node.clone(),
            },
        }
    }

    fn graph_frame(&self, summary: Summary, layout: &LayoutSnapshot) -> GraphFrame {
        let root_hovered = self.hover == Some(HoverTarget::Root);
        let is_hovered = |id: &str| matches!(&self.hover, Some(HoverTarget::Node(h)) if h == id);

        let nodes = layout
            .nodes
            .iter()
            .map(|n| RenderedNode {
                highlighted: match n.kind {
                    NodeKind::Root => root_hovered,
                    NodeKind::Child => is_hovered(&n.node.id),
                },
                layout: n.clone(),
            })
            .collect();

        let (x1, y1) = layout.root().map(|r| (r.x, r.y)).unwrap_or_default();
        let edges = layout
            .children()
            .iter()
            .map(|c| RenderedEdge {
                target: c.node.id.clone(),
                x1,
                y1,
                x2: c.x,
                y2: c.y,
                emphasized: root_hovered || is_hovered(&c.node.id),
            })
            .collect();

        GraphFrame {
            nodes,
            edges,
            summary,
            path: self.snapshot.path.clone(),
            layout_id: layout.layout_id.clone(),
            fingerprint: layout.fingerprint(),
        }
    }

    /// Current layout, if the session is ready.
    pub fn layout(&self) -> Option<&LayoutSnapshot> {
        self.layout.as_ref()
    }

    /// How many times the layout has been rebuilt.
    pub fn recompute_count(&self) -> usize {
        self.recomputes
    }
}

/// Whether the positioned node set differs between two snapshots.
fn node_set_changed(prev: &SessionSnapshot, next: &SessionSnapshot) -> bool {
    prev.root.node != next.root.node || prev.state.children() != next.state.children()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::types::RootNode;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn ready_session() -> ExplorationSession<InMemoryBackend> {
        let backend = InMemoryBackend::new()
            .with_summary("P1", json!("Abstract: one"))
            .with_related(
                "P1",
                json!([
                    ["P2", { "pmc_id": "P2", "title": "T2" }],
                    ["P3", { "pmc_id": "P3", "title": "T3" }]
                ]),
            );
        ExplorationSession::new(Arc::new(backend), RootNode::new("P1", "T1"), "q")
    }

    #[tokio::test]
    async fn test_frame_follows_session() {
        let session = ready_session();
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));
        let mut view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});
        assert_eq!(view.frame(), Frame::Idle);

        let pending = session.start();
        assert_eq!(view.frame(), Frame::Loading { root: Node::new("P1", "T1") });

        pending.await;
        let Frame::Graph(graph) = view.frame() else {
            panic!("expected graph frame");
        };
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.summary.abstract_text, "one");
    }

    #[tokio::test]
    async fn test_layout_rebuilt_only_on_change() {
        let session = ready_session();
        session.start().await;
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));
        let mut view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});
        assert_eq!(view.recompute_count(), 1);

        assert!(!view.sync());
        viewport.resize(600.0, 600.0);
        assert!(!view.sync());

        viewport.resize(900.0, 600.0);
        assert!(view.sync());
        assert_eq!(view.recompute_count(), 2);
        assert_eq!(view.layout().map(|l| l.dimensions.width), Some(900.0));
    }

    #[tokio::test]
    async fn test_params_change_is_visible_in_frame() {
        let session = ready_session();
        session.start().await;
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));

        let mut default_view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});
        let mut tuned_view = GraphView::mount(&session, &viewport, |_: Option<&str>| {})
            .with_params(LayoutParams {
                version: "radial_layout_tuned".to_string(),
                label_gap: 40.0,
                ..LayoutParams::default()
            });

        let (Frame::Graph(a), Frame::Graph(b)) = (default_view.frame(), tuned_view.frame()) else {
            panic!("expected graph frames");
        };
        assert_eq!(a.layout_id, crate::DEFAULT_LAYOUT_VERSION);
        assert_eq!(b.layout_id, "radial_layout_tuned");
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[tokio::test]
    async fn test_hover_emphasis() {
        let session = ready_session();
        session.start().await;
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));
        let mut view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});

        view.hover(Some(HoverTarget::Node("P3".into())));
        let Frame::Graph(graph) = view.frame() else { panic!("expected graph frame") };
        let emphasized: Vec<_> = graph.edges.iter().filter(|e| e.emphasized).map(|e| e.target.as_str()).collect();
        assert_eq!(emphasized, vec!["P3"]);
        assert!(graph.nodes.iter().any(|n| n.highlighted && n.layout.node.id == "P3"));

        view.hover(Some(HoverTarget::Root));
        let Frame::Graph(graph) = view.frame() else { panic!("expected graph frame") };
        assert!(graph.edges.iter().all(|e| e.emphasized));
        assert!(graph.nodes[0].highlighted);

        // Hover never touches the session
        assert_eq!(session.path().len(), 1);
        assert_eq!(session.latest_token(), 1);
    }

    #[tokio::test]
    async fn test_clicks_forward_to_host() {
        let session = ready_session();
        session.start().await;
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));
        let clicks: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
        let recorder = Arc::clone(&clicks);
        let view = GraphView::mount(&session, &viewport, move |id: Option<&str>| {
            recorder.lock().push(id.map(str::to_string));
        });

        assert!(view.click(ClickTarget::Child("P2".into())));
        assert!(view.click(ClickTarget::Root));
        assert!(!view.click(ClickTarget::Child("P9".into())));

        assert_eq!(*clicks.lock(), vec![Some("P2".to_string()), None]);
        assert_eq!(session.latest_token(), 1);
    }

    #[tokio::test]
    async fn test_pointer_hit_testing() {
        let session = ready_session();
        session.start().await;
        let viewport = Viewport::with_dimensions(Dimensions::new(600.0, 600.0));
        let mut view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});

        // Child 0 sits straight above the center at the orbit radius
        let (x, y) = {
            let child = &view.layout().unwrap().children()[0];
            (child.x, child.y)
        };
        view.pointer_move(x + 1.0, y);
        assert_eq!(view.highlighted(), Some(&HoverTarget::Node("P2".into())));

        view.pointer_move(300.0, 300.0);
        assert_eq!(view.highlighted(), Some(&HoverTarget::Root));

        view.pointer_move(5.0, 5.0);
        assert_eq!(view.highlighted(), None);
        assert!(!view.pointer_click(5.0, 5.0));
    }

    #[tokio::test]
    async fn test_unmount_releases_resize_subscription() {
        let session = ready_session();
        let viewport = Viewport::new();
        {
            let pending = session.start();
            let _view = GraphView::mount(&session, &viewport, |_: Option<&str>| {});
            assert_eq!(viewport.observer_count(), 1);
            drop(pending);
        }
        assert_eq!(viewport.observer_count(), 0);
    }
}
