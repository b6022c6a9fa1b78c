//! Response normalization.
//!
//! The backend has shipped two shapes for each of its operations over time.
//! Both must keep working, so every parser here first classifies the
//! top-level shape strictly and then treats individual elements leniently:
//!
//! | Operation | Accepted top-level shapes |
//! |-----------|---------------------------|
//! | summary | `"text"` or `["text", {metadata}]` |
//! | related | `[[id, {metadata}], ...]` or `{"data": [[id, {metadata}], ...]}` |
//! | search | `[["text", {metadata}, [categories]], ...]` |
//!
//! A top-level mismatch is a [`NormalizationError`]. A malformed element
//! inside a well-shaped payload is dropped and logged, never escalated.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{Node, Publication, Summary, Year, UNKNOWN};

/// Markers that introduce the abstract inside summary text, in match order.
pub const ABSTRACT_MARKERS: [&str; 2] = ["Abstract:", "Description:"];

/// Primary identifier field (PubMed Central articles).
pub const PRIMARY_ID_FIELD: &str = "pmc_id";

/// Alternate identifier field (OSDR studies).
pub const ALTERNATE_ID_FIELD: &str = "osd_id";

/// Field that wraps the related-node list in the current response format.
pub const RELATED_WRAPPER_FIELD: &str = "data";

/// Error raised when a payload's top-level shape is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    /// Neither accepted shape matched.
    #[error("Unrecognized {operation} response: expected {expected}, found {found}")]
    UnrecognizedShape {
        /// Which upstream operation produced the payload.
        operation: &'static str,
        /// Human-readable list of accepted shapes.
        expected: &'static str,
        /// JSON kind that was actually received.
        found: &'static str,
    },
}

impl NormalizationError {
    fn shape(operation: &'static str, expected: &'static str, found: &Value) -> Self {
        Self::UnrecognizedShape {
            operation,
            expected,
            found: json_kind(found),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(a) if a.is_empty() => "empty array",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip a leading abstract marker from summary text.
///
/// Returns the trimmed text after the first occurrence of the first marker
/// in [`ABSTRACT_MARKERS`] that appears. Text without a marker is returned
/// unchanged.
pub fn extract_abstract(text: &str) -> &str {
    for marker in ABSTRACT_MARKERS {
        if let Some(pos) = text.find(marker) {
            return text[pos + marker.len()..].trim();
        }
    }
    text
}

/// Parse a summary response for `root`.
///
/// Metadata fields missing from the tuple form fall back to the root's id
/// and label; `journal` and `year` fall back to [`UNKNOWN`].
pub fn parse_summary(raw: &Value, root: &Node) -> Result<Summary, NormalizationError> {
    const EXPECTED: &str = "string or [text, metadata]";

    match raw {
        Value::String(text) => Ok(Summary::text_only(extract_abstract(text))),
        Value::Array(items) => match items.as_slice() {
            [Value::String(text), Value::Object(meta)] => {
                let abstract_text = extract_abstract(text).to_string();
                let publication = publication_from_metadata(meta, &abstract_text, None)
                    .with_fallback(root);
                Ok(Summary {
                    abstract_text,
                    publication: Some(publication),
                })
            }
            _ => Err(NormalizationError::shape("summary", EXPECTED, raw)),
        },
        other => Err(NormalizationError::shape("summary", EXPECTED, other)),
    }
}

/// Parse a related-nodes response for the root `root_id`.
///
/// The id comes from the metadata's `pmc_id`, then `osd_id`, then the pair's
/// own leading id. Elements without a resolvable id or title are dropped, as
/// are elements that resolve to the root itself or repeat an id already seen.
pub fn parse_related(raw: &Value, root_id: &str) -> Result<Vec<Node>, NormalizationError> {
    const EXPECTED: &str = "array of [id, metadata] or {\"data\": [...]}";

    let items = match raw {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get(RELATED_WRAPPER_FIELD) {
            Some(Value::Array(items)) => items,
            _ => return Err(NormalizationError::shape("related", EXPECTED, raw)),
        },
        other => return Err(NormalizationError::shape("related", EXPECTED, other)),
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some((pair_id, meta)) = pair_parts(item) else {
            debug!(index, "dropping related element: not an [id, metadata] pair");
            continue;
        };
        let Some(id) = resolve_id(meta).or_else(|| coerce_id(pair_id)) else {
            debug!(index, "dropping related element: no resolvable id");
            continue;
        };
        let Some(label) = non_empty_str(meta, "title") else {
            debug!(index, id = %id, "dropping related element: no title");
            continue;
        };
        if id == root_id {
            debug!(index, id = %id, "dropping related element: refers to the root");
            continue;
        }
        if !seen.insert(id.clone()) {
            debug!(index, id = %id, "dropping related element: duplicate id");
            continue;
        }
        nodes.push(Node::new(id, label));
    }

    if nodes.len() < items.len() {
        warn!(
            received = items.len(),
            kept = nodes.len(),
            root_id = %root_id,
            "related response contained unusable elements"
        );
    }

    Ok(nodes)
}

/// Parse a search response into publications.
///
/// Each element is `[text, metadata]` with an optional third element listing
/// categories; when absent, `metadata.categories` is used. Elements without a
/// resolvable id or title are dropped.
pub fn parse_search_results(raw: &Value) -> Result<Vec<Publication>, NormalizationError> {
    const EXPECTED: &str = "array of [text, metadata, categories]";

    let Value::Array(items) = raw else {
        return Err(NormalizationError::shape("search", EXPECTED, raw));
    };

    let mut publications = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Array(parts) = item else {
            debug!(index, "dropping search element: not an array");
            continue;
        };
        let (text, meta) = match (parts.first(), parts.get(1)) {
            (Some(Value::String(text)), Some(Value::Object(meta))) => (text, meta),
            _ => {
                debug!(index, "dropping search element: expected [text, metadata, ...]");
                continue;
            }
        };
        let categories = parts.get(2).map(string_list);
        let draft = publication_from_metadata(meta, extract_abstract(text), categories);
        match draft.complete() {
            Some(publication) => publications.push(publication),
            None => debug!(index, "dropping search element: no resolvable id or title"),
        }
    }

    Ok(publications)
}

/// A publication whose id and title may still be missing.
struct PublicationDraft {
    id: Option<String>,
    title: Option<String>,
    rest: Publication,
}

impl PublicationDraft {
    fn with_fallback(self, root: &Node) -> Publication {
        Publication {
            id: self.id.unwrap_or_else(|| root.id.clone()),
            title: self.title.unwrap_or_else(|| root.label.clone()),
            ..self.rest
        }
    }

    fn complete(self) -> Option<Publication> {
        Some(Publication {
            id: self.id?,
            title: self.title?,
            ..self.rest
        })
    }
}

fn publication_from_metadata(
    meta: &Map<String, Value>,
    abstract_text: &str,
    categories: Option<Vec<String>>,
) -> PublicationDraft {
    let categories = categories
        .or_else(|| meta.get("categories").map(string_list))
        .unwrap_or_default();

    PublicationDraft {
        id: resolve_id(meta),
        title: non_empty_str(meta, "title"),
        rest: Publication {
            id: String::new(),
            title: String::new(),
            authors: authors(meta.get("authors")),
            journal: non_empty_str(meta, "journal").unwrap_or_else(|| UNKNOWN.to_string()),
            link: non_empty_str(meta, "link").unwrap_or_default(),
            year: Year::from_json(meta.get("year")),
            abstract_text: abstract_text.to_string(),
            categories,
        },
    }
}

fn pair_parts(item: &Value) -> Option<(&Value, &Map<String, Value>)> {
    match item {
        Value::Array(parts) => match (parts.first(), parts.get(1)) {
            (Some(id), Some(Value::Object(meta))) => Some((id, meta)),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a node id: primary field, then alternate field, coerced to string.
fn resolve_id(meta: &Map<String, Value>) -> Option<String> {
    [PRIMARY_ID_FIELD, ALTERNATE_ID_FIELD]
        .iter()
        .find_map(|field| coerce_id(meta.get(*field)?))
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(meta: &Map<String, Value>, field: &str) -> Option<String> {
    match meta.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn authors(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(list @ Value::Array(_)) => string_list(list).join(", "),
        _ => String::new(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
