//! Schema descriptors - the static tree describing desired output shape.
//!
//! A schema is built once and reused across many documents. It is a
//! closed set of tagged variants rather than a dynamically-typed tree:
//! traversal dispatches on the variant, never on value shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

/// Expected type of a scalar leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Free text, trimmed and passed through.
    #[default]
    String,

    /// Integer or float; thousands separators and currency symbols are
    /// stripped before parsing.
    Number,

    /// Permissive keyword-based boolean (see coercion rules).
    Boolean,
}

/// A node in the schema tree.
///
/// Leaves carry the human-readable description used verbatim in prompts.
/// Object nodes preserve declaration order so traversal (and logs) are
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// A single extracted value.
    Scalar {
        /// What to ask the model for, e.g. "Pickup City".
        description: String,

        /// Expected type, applied after the grounding check.
        #[serde(default)]
        value_type: ValueType,

        /// Derived fields (e.g. "Language of the text") are answered from
        /// the document but never quoted from it, so the grounding check
        /// is skipped.
        #[serde(default)]
        inferred: bool,
    },

    /// A nested object with ordered named children.
    Object {
        /// Child nodes in declaration order.
        fields: IndexMap<String, SchemaNode>,
    },

    /// A homogeneous list of scalar values.
    ScalarList {
        /// Description of one item, e.g. "Starboard Rate".
        item_description: String,
    },

    /// A homogeneous list of flat objects.
    ObjectList {
        /// One representative item shape. Template leaves must be scalars.
        item_template: IndexMap<String, SchemaNode>,
    },
}

impl SchemaNode {
    /// A string-typed scalar leaf.
    pub fn scalar(description: impl Into<String>) -> Self {
        Self::typed_scalar(description, ValueType::String)
    }

    /// A scalar leaf with an explicit expected type.
    pub fn typed_scalar(description: impl Into<String>, value_type: ValueType) -> Self {
        Self::Scalar {
            description: description.into(),
            value_type,
            inferred: false,
        }
    }

    /// A scalar leaf whose value is derived rather than quoted; exempt
    /// from the grounding check.
    pub fn inferred_scalar(description: impl Into<String>) -> Self {
        Self::Scalar {
            description: description.into(),
            value_type: ValueType::String,
            inferred: true,
        }
    }

    /// A number-typed scalar leaf.
    pub fn number(description: impl Into<String>) -> Self {
        Self::typed_scalar(description, ValueType::Number)
    }

    /// A boolean-typed scalar leaf.
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed_scalar(description, ValueType::Boolean)
    }

    /// An object node from `(name, node)` pairs, preserving order.
    pub fn object(fields: impl IntoIterator<Item = (impl Into<String>, SchemaNode)>) -> Self {
        Self::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A list of scalar items.
    pub fn scalar_list(item_description: impl Into<String>) -> Self {
        Self::ScalarList {
            item_description: item_description.into(),
        }
    }

    /// A list of objects matching one template shape.
    pub fn object_list(
        template: impl IntoIterator<Item = (impl Into<String>, SchemaNode)>,
    ) -> Self {
        Self::ObjectList {
            item_template: template.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Validate the whole tree. Schema errors are fatal configuration
    /// errors raised at startup, never per-document.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("$")
    }

    fn validate_at(&self, path: &str) -> Result<()> {
        let invalid = |reason: &str| ExtractionError::InvalidSchema {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        match self {
            Self::Scalar { description, .. } => {
                if description.trim().is_empty() {
                    return Err(invalid("empty description"));
                }
            }
            Self::Object { fields } => {
                if fields.is_empty() {
                    return Err(invalid("object has no fields"));
                }
                for (name, child) in fields {
                    child.validate_at(&format!("{path}.{name}"))?;
                }
            }
            Self::ScalarList { item_description } => {
                if item_description.trim().is_empty() {
                    return Err(invalid("empty item description"));
                }
            }
            Self::ObjectList { item_template } => {
                if item_template.is_empty() {
                    return Err(invalid("empty item template"));
                }
                for (name, child) in item_template {
                    let child_path = format!("{path}[].{name}");
                    match child {
                        Self::Scalar { .. } => child.validate_at(&child_path)?,
                        _ => {
                            return Err(ExtractionError::InvalidSchema {
                                path: child_path,
                                reason: "object-list templates may only contain scalar leaves"
                                    .to_string(),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Count the leaf nodes (scalars and lists) in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Scalar { .. } | Self::ScalarList { .. } | Self::ObjectList { .. } => 1,
            Self::Object { fields } => fields.values().map(SchemaNode::leaf_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_nested_schema() {
        let schema = SchemaNode::object([
            ("language", SchemaNode::inferred_scalar("Language of the text")),
            (
                "pickup",
                SchemaNode::object([
                    ("city", SchemaNode::scalar("Pickup City")),
                    ("zip_code", SchemaNode::scalar("Pickup Zip Code")),
                ]),
            ),
            (
                "dimensions",
                SchemaNode::object_list([
                    ("length", SchemaNode::number("Length")),
                    ("width", SchemaNode::number("Width")),
                ]),
            ),
            ("rates", SchemaNode::scalar_list("Supplementary Rate")),
        ]);

        schema.validate().unwrap();
        assert_eq!(schema.leaf_count(), 5);
    }

    #[test]
    fn test_validate_rejects_empty_description() {
        let schema = SchemaNode::object([("city", SchemaNode::scalar("  "))]);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("$.city"));
    }

    #[test]
    fn test_validate_rejects_nested_list_template() {
        let schema = SchemaNode::object_list([(
            "inner",
            SchemaNode::object([("x", SchemaNode::scalar("X"))]),
        )]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_object_preserves_declaration_order() {
        let schema = SchemaNode::object([
            ("zulu", SchemaNode::scalar("Z")),
            ("alpha", SchemaNode::scalar("A")),
        ]);

        if let SchemaNode::Object { fields } = &schema {
            let keys: Vec<_> = fields.keys().collect();
            assert_eq!(keys, vec!["zulu", "alpha"]);
        } else {
            panic!("expected object node");
        }
    }

    #[test]
    fn test_schema_round_trips_through_json() {
        let schema = SchemaNode::object([
            ("count", SchemaNode::number("Piece Count")),
            ("stackable", SchemaNode::boolean("Stackable")),
        ]);

        let json = serde_json::to_string(&schema).unwrap();
        let back: SchemaNode = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.leaf_count(), 2);
    }
}
