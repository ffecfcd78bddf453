//! Extraction records - the output of a schema walk.
//!
//! A record always mirrors the schema's shape: extraction failure
//! degrades values to null or an empty list, never removes keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::schema::SchemaNode;

/// A single extracted value, mirroring one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Missing or unverifiable value.
    Null,

    /// A trimmed string value.
    Text(String),

    /// A whole number (no decimal point in the raw answer).
    Integer(i64),

    /// A fractional number.
    Float(f64),

    /// A coerced boolean.
    Bool(bool),

    /// An ordered list of items (scalars or objects).
    List(Vec<FieldValue>),

    /// A nested object, keys in schema declaration order.
    Object(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// Convert into plain JSON. This is the artifact contract consumers
    /// depend on: null for missing scalars, empty array for missing lists.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            Self::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Check that this value's shape mirrors the given schema node.
    ///
    /// Null scalars and empty lists count as matching; an object must
    /// carry exactly the schema's key set.
    pub fn matches_shape(&self, schema: &SchemaNode) -> bool {
        match (self, schema) {
            (Self::Null, SchemaNode::Scalar { .. }) => true,
            (Self::Text(_), SchemaNode::Scalar { .. }) => true,
            (Self::Integer(_) | Self::Float(_), SchemaNode::Scalar { .. }) => true,
            (Self::Bool(_), SchemaNode::Scalar { .. }) => true,
            (Self::List(_), SchemaNode::ScalarList { .. }) => true,
            (Self::List(items), SchemaNode::ObjectList { item_template }) => {
                items.iter().all(|item| match item {
                    Self::Object(fields) => {
                        fields.len() == item_template.len()
                            && fields.keys().eq(item_template.keys())
                    }
                    _ => false,
                })
            }
            (Self::Object(fields), SchemaNode::Object { fields: expected }) => {
                fields.len() == expected.len()
                    && fields.keys().eq(expected.keys())
                    && fields
                        .iter()
                        .zip(expected.values())
                        .all(|((_, v), node)| v.matches_shape(node))
            }
            _ => false,
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            // Debug formatting keeps the decimal point ("470.0"), so a
            // re-coerced float stays a float
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(_) | Self::Object(_) => f.write_str(&self.to_json().to_string()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from(serde_json::Value::deserialize(deserializer)?))
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Terminal outcome for one schema leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeafOutcome {
    /// Value extracted (and, for scalars, verified).
    Extracted,

    /// Model answered the not-found sentinel.
    NotFound,

    /// Every attempt failed the grounding or coercion gate.
    Exhausted {
        /// Model calls issued before giving up.
        attempts: u32,
    },

    /// The model call itself failed; degraded to null without retry.
    ModelError,

    /// List response was not a JSON array; degraded to an empty list.
    MalformedList,
}

impl LeafOutcome {
    /// True when the leaf produced a usable value.
    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted)
    }
}

/// Per-leaf verdict, addressed by dotted path into the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    /// Dotted path, e.g. `shipment.pickup.city`.
    pub path: String,

    /// What happened at this leaf.
    pub outcome: LeafOutcome,
}

impl FieldReport {
    /// Create a report for one leaf.
    pub fn new(path: impl Into<String>, outcome: LeafOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}

/// The full result of walking one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The assembled record, shaped exactly like the schema.
    pub record: FieldValue,

    /// One report per leaf, in traversal order.
    pub fields: Vec<FieldReport>,
}

impl ExtractionOutput {
    /// Paths of leaves that did not produce a value.
    pub fn failed_paths(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|r| !r.outcome.is_extracted())
            .map(|r| r.path.as_str())
            .collect()
    }

    /// Fraction of leaves that produced a value, in `[0, 1]`.
    pub fn fill_rate(&self) -> f32 {
        if self.fields.is_empty() {
            return 0.0;
        }
        let filled = self.fields.iter().filter(|r| r.outcome.is_extracted()).count();
        filled as f32 / self.fields.len() as f32
    }
}

/// Document-level terminal state.
///
/// A document rejected by the relevance gate yields `NotRelevant`, a
/// distinct marker rather than a populated tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The relevance gate excluded the document.
    NotRelevant {
        /// Diagnostic from the gate (e.g. a transport failure message).
        diagnostic: Option<String>,
    },

    /// The schema walk completed (possibly with null-filled leaves).
    Extracted(ExtractionOutput),
}
