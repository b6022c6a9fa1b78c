//! # radial-navigator
//!
//! Interactive radial exploration of a document corpus.
//!
//! One focal document (the root) sits at the center of a circle of related
//! documents. Selecting a related document promotes it to root and the
//! graph re-expands around it.
//!
//! ## Core Contract
//!
//! 1. Normalize both the legacy and the current backend response shapes into
//!    canonical [`Node`] / [`Publication`] records
//! 2. Lay out root + children deterministically for any container size
//! 3. Sequence fetch-on-select navigation so that a superseded request can
//!    never become visible
//!
//! ## Architecture
//!
//! ```text
//! host ──set_root──▶ ExplorationSession ──fan-out──▶ KnowledgeBackend
//!                          │  ▲                          │
//!                          │  └──── normalize ◀──────────┘
//!                          ▼
//!     Viewport ──▶ GraphView ──layout──▶ Frame ──click──▶ host callback
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same dimensions + same params + same node list → identical layout
//! - Child order is the backend's order; index 0 sits at 12 o'clock
//! - Only the most recently issued request may change session state

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod normalize;
pub mod layout;
pub mod canonical;
pub mod backend;
pub mod session;
pub mod viewport;
pub mod view;

// Re-exports
pub use types::{Node, RootNode, Publication, Summary, Year, ExplorationPath, UNKNOWN};
pub use normalize::{
    extract_abstract, parse_summary, parse_related, parse_search_results,
    NormalizationError, ABSTRACT_MARKERS,
};
pub use layout::{
    layout, compute, child_angle, wrap_label, label_lines,
    Dimensions, LabelLine, LayoutNode, LayoutParams, LayoutSnapshot, NodeKind, TextAnchor,
};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use backend::{KnowledgeBackend, FetchError, InMemoryBackend};
#[cfg(feature = "client")]
pub use backend::{BackendConfig, HttpBackend, Routes};
pub use session::{
    ExplorationSession, FetchState, PendingFetch, Resolution, SessionError, SessionSnapshot,
};
pub use viewport::{Viewport, ResizeSubscription};
pub use view::{
    ClickTarget, Frame, GraphFrame, GraphView, HoverTarget, NodeClickHandler,
    RenderedEdge, RenderedNode,
};

/// Default layout version identifier.
pub const DEFAULT_LAYOUT_VERSION: &str = "radial_layout_v1";
