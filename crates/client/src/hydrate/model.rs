//! Hydrated entity and summary types.

use holonet_core::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder display value for references that could not be described.
pub const UNKNOWN: &str = "Unknown";

/// Display label of a summary: `title` for films, `name` for people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "title")]
    Title(String),
    #[serde(rename = "name")]
    Name(String),
}

impl Label {
    fn for_kind(kind: ResourceKind, value: String) -> Self {
        match kind {
            ResourceKind::Film => Label::Title(value),
            ResourceKind::Person => Label::Name(value),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Title(s) | Label::Name(s) => s,
        }
    }
}

/// One-level-deep description of a referenced entity.
///
/// Serializes as `{id, url, title}` or `{id, url, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub id: u64,
    pub url: String,
    #[serde(flatten)]
    pub label: Label,
}

impl Summary {
    /// Build a summary from an upstream document, reading the display field
    /// from `result.properties` (or the top level); missing → `"Unknown"`.
    pub fn from_payload(kind: ResourceKind, id: u64, url: &str, payload: &Value) -> Self {
        let field = kind.display_field();
        let label = payload
            .pointer(&format!("/result/properties/{field}"))
            .or_else(|| payload.get(field))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN)
            .to_string();

        Self { id, url: url.to_string(), label: Label::for_kind(kind, label) }
    }

    /// Placeholder for a reference whose fetch failed.
    pub fn unknown(kind: ResourceKind, id: u64, url: &str) -> Self {
        Self { id, url: url.to_string(), label: Label::for_kind(kind, UNKNOWN.to_string()) }
    }

    pub fn is_unknown(&self) -> bool {
        self.label.as_str() == UNKNOWN
    }
}

/// A hydrated person or film.
///
/// `payload` is the upstream document with its cross-reference field
/// replaced by summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u64,
    pub kind: ResourceKind,
    pub payload: Value,
}

impl Entity {
    /// Properties object of the upstream envelope, if present.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.payload.pointer("/result/properties").and_then(Value::as_object)
    }

    /// Summaries in the cross-reference field.
    pub fn references(&self) -> Vec<Summary> {
        self.properties()
            .and_then(|props| props.get(self.kind.reference_field()))
            .cloned()
            .and_then(|refs| serde_json::from_value(refs).ok())
            .unwrap_or_default()
    }

    /// Payload with a top-level `"id"` inserted; the shape returned to callers.
    pub fn to_json(&self) -> Value {
        let mut json = self.payload.clone();
        if let Value::Object(map) = &mut json {
            map.insert("id".to_string(), Value::from(self.id));
        }
        json
    }
}

impl Serialize for Entity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
