//! Canonical publication record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used for metadata the upstream did not provide.
pub const UNKNOWN: &str = "Unknown";

/// Publication year.
///
/// Upstream metadata carries the year as a number, a numeric string, or
/// not at all. Serialized untagged: a number when known, otherwise the
/// placeholder string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Year {
    /// Numeric year.
    Known(i64),
    /// Placeholder text.
    Unknown(String),
}

impl Year {
    /// Interpret a metadata value as a year.
    ///
    /// Integers and integer-valued strings become [`Year::Known`]; other
    /// non-empty strings are kept verbatim; anything else is [`UNKNOWN`].
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Number(n)) => match n.as_i64() {
                Some(y) => Self::Known(y),
                None => Self::Known(n.as_f64().unwrap_or_default().trunc() as i64),
            },
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(y) => Self::Known(y),
                    Err(_) if !s.is_empty() => Self::Unknown(s.to_string()),
                    Err(_) => Self::default(),
                }
            }
            _ => Self::default(),
        }
    }

    /// The numeric year, if known.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Known(y) => Some(*y),
            Self::Unknown(_) => None,
        }
    }
}

impl Default for Year {
    fn default() -> Self {
        Self::Unknown(UNKNOWN.to_string())
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(y) => write!(f, "{}", y),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Canonical document record shared by search, summary and detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Corpus identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Author list as a display string.
    pub authors: String,
    /// Journal name or [`UNKNOWN`].
    pub journal: String,
    /// Link to the full document.
    pub link: String,
    /// Publication year.
    pub year: Year,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Topic categories, in upstream order.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Summary of the current root, as shown next to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Abstract text with any leading marker removed.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Publication details, present when the upstream sent metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<Publication>,
}

impl Summary {
    /// Create a summary with no publication metadata.
    pub fn text_only(abstract_text: impl Into<String>) -> Self {
        Self {
            abstract_text: abstract_text.into(),
            publication: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_year_from_number_and_string() {
        assert_eq!(Year::from_json(Some(&json!(2020))), Year::Known(2020));
        assert_eq!(Year::from_json(Some(&json!(" 2019 "))), Year::Known(2019));
        assert_eq!(Year::from_json(Some(&json!("n.d."))), Year::Unknown("n.d.".into()));
    }

    #[test]
    fn test_year_missing_is_placeholder() {
        assert_eq!(Year::from_json(None), Year::Unknown(UNKNOWN.into()));
        assert_eq!(Year::from_json(Some(&json!(null))), Year::default());
        assert_eq!(Year::from_json(Some(&json!(""))), Year::default());
        assert_eq!(Year::default().as_i64(), None);
    }

    #[test]
    fn test_year_serializes_untagged() {
        assert_eq!(serde_json::to_value(Year::Known(2021)).unwrap(), json!(2021));
        assert_eq!(serde_json::to_value(Year::default()).unwrap(), json!("Unknown"));
    }
}
