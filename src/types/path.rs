//! Exploration path: the roots visited in one session.

use serde::{Deserialize, Serialize};

use super::node::Node;

/// Append-only history of visited roots.
///
/// Grows by exactly one entry per root promotion. Revisiting a node appends
/// it again; entries are never removed or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExplorationPath {
    entries: Vec<Node>,
}

impl ExplorationPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path whose first entry is `start`.
    pub fn starting_at(start: Node) -> Self {
        Self { entries: vec![start] }
    }

    /// Append a visited root.
    pub fn push(&mut self, node: Node) {
        self.entries.push(node);
    }

    /// Visited nodes in order.
    pub fn entries(&self) -> &[Node] {
        &self.entries
    }

    /// Visited ids in order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|n| n.id.as_str()).collect()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&Node> {
        self.entries.last()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the path has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revisits_accumulate() {
        let mut path = ExplorationPath::starting_at(Node::new("P1", "T1"));
        path.push(Node::new("P2", "T2"));
        path.push(Node::new("P1", "T1"));
        path.push(Node::new("P2", "T2"));

        assert_eq!(path.ids(), vec!["P1", "P2", "P1", "P2"]);
        assert_eq!(path.last().map(|n| n.id.as_str()), Some("P2"));
    }

    #[test]
    fn test_serializes_as_array() {
        let path = ExplorationPath::starting_at(Node::new("P1", "T1"));
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!([{ "id": "P1", "label": "T1" }]));
    }
}
