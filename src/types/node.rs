//! Node types for the radial graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A document in the graph, identified by its corpus id.
///
/// `id` is unique within one graph snapshot. Ordered by `(id, label)` so
/// node sets can be compared deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Corpus identifier (e.g. a PMC id or an OSDR study id).
    pub id: String,
    /// Display title.
    pub label: String,
}

impl Node {
    /// Create a new node.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

/// The focal node at the center of the layout.
///
/// Carries display extras on top of the plain [`Node`]. A root promoted from
/// a child starts with no image, unit scale and empty `fields`; those are
/// pending until the host fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    /// Identity and label.
    #[serde(flatten)]
    pub node: Node,
    /// Optional image shown inside the root marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Display scale multiplier for the root marker.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Additional host-supplied fields, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

fn default_scale() -> f64 {
    1.0
}

impl RootNode {
    /// Create a root with only identity and label set.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::from(Node::new(id, label))
    }

    /// Set the display image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the display scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// The root's corpus id.
    pub fn id(&self) -> &str {
        &self.node.id
    }

    /// The root's label.
    pub fn label(&self) -> &str {
        &self.node.label
    }
}

impl From<Node> for RootNode {
    fn from(node: Node) -> Self {
        Self {
            node,
            image: None,
            scale: default_scale(),
            fields: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promoted_root_has_pending_extras() {
        let root = RootNode::from(Node::new("P2", "T2"));
        assert_eq!(root.id(), "P2");
        assert_eq!(root.label(), "T2");
        assert!(root.image.is_none());
        assert!(root.fields.is_empty());
        assert_eq!(root.scale, 1.0);
    }

    #[test]
    fn test_root_deserializes_host_payload() {
        let root: RootNode = serde_json::from_value(serde_json::json!({
            "id": "P1",
            "label": "T1",
            "image": "/img/p1.png",
        }))
        .unwrap();

        assert_eq!(root.node, Node::new("P1", "T1"));
        assert_eq!(root.image.as_deref(), Some("/img/p1.png"));
        assert_eq!(root.scale, 1.0);
    }
}
