//! List extraction - one model call, one JSON array, no retry loop.
//!
//! Unlike the field path there is no per-item grounding: validating each
//! item individually would multiply model calls by item count times the
//! retry bound. Malformed responses degrade to an empty list.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::pipeline::coerce::coerce;
use crate::pipeline::prompts::{
    format_object_list_prompt, format_scalar_list_prompt, LIST_SYSTEM_PROMPT,
};
use crate::traits::model::{LanguageModel, SamplingConfig};
use crate::types::config::ExtractorConfig;
use crate::types::document::SourceDocument;
use crate::types::record::{FieldValue, LeafOutcome};
use crate::types::schema::SchemaNode;

/// The item shape a list query expects.
pub enum ListTemplate<'a> {
    /// A bare item description; the model returns an array of strings.
    Scalars(&'a str),

    /// One representative object shape; the model returns an array of
    /// objects carrying exactly these keys.
    Objects(&'a IndexMap<String, SchemaNode>),
}

/// Extracts one list leaf per call.
pub struct ListExtractor<M> {
    model: Arc<M>,
    config: ExtractorConfig,
}

impl<M: LanguageModel> ListExtractor<M> {
    /// Create an extractor over an injected model.
    pub fn new(model: Arc<M>, config: ExtractorConfig) -> Self {
        Self { model, config }
    }

    /// Extract a list. Never fails: malformed output degrades to an
    /// empty list with a reporting outcome.
    pub async fn extract(
        &self,
        doc: &SourceDocument,
        description: &str,
        template: ListTemplate<'_>,
    ) -> (FieldValue, LeafOutcome) {
        let user = match &template {
            ListTemplate::Scalars(_) => format_scalar_list_prompt(description, doc.text()),
            ListTemplate::Objects(item_template) => {
                format_object_list_prompt(description, item_template, doc.text())
            }
        };
        let sampling = SamplingConfig::deterministic(self.config.list_max_tokens);

        let raw = match self.model.complete(LIST_SYSTEM_PROMPT, &user, &sampling).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(list = description, error = %err, "model call failed; returning empty list");
                return (FieldValue::List(vec![]), LeafOutcome::ModelError);
            }
        };

        match parse_array(&raw) {
            Some(items) => {
                let values = match template {
                    ListTemplate::Scalars(_) => collect_scalar_items(description, items),
                    ListTemplate::Objects(item_template) => {
                        collect_object_items(description, items, item_template, &self.config)
                    }
                };
                debug!(list = description, count = values.len(), "list extracted");
                (FieldValue::List(values), LeafOutcome::Extracted)
            }
            None => {
                warn!(list = description, "response was not a JSON array; returning empty list");
                (FieldValue::List(vec![]), LeafOutcome::MalformedList)
            }
        }
    }
}

/// Parse the raw answer as a JSON array, tolerating a markdown code fence.
fn parse_array(raw: &str) -> Option<Vec<serde_json::Value>> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(serde_json::Value::Array(items)) => Some(items),
        Ok(_) => None,
        Err(_) => None,
    }
}

fn collect_scalar_items(description: &str, items: Vec<serde_json::Value>) -> Vec<FieldValue> {
    items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                warn!(list = description, "dropping non-scalar item from scalar list");
                None
            }
            other => Some(FieldValue::from(other)),
        })
        .collect()
}

/// Project each object item onto the template key set: keys in declared
/// order, missing keys null, extra keys dropped, scalars coerced per the
/// template leaf type.
fn collect_object_items(
    description: &str,
    items: Vec<serde_json::Value>,
    template: &IndexMap<String, SchemaNode>,
    config: &ExtractorConfig,
) -> Vec<FieldValue> {
    items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(mut raw_fields) => {
                let mut fields = IndexMap::with_capacity(template.len());
                for (key, node) in template {
                    let value = raw_fields
                        .remove(key)
                        .map(|v| coerce_item_value(v, node, config))
                        .unwrap_or(FieldValue::Null);
                    fields.insert(key.clone(), value);
                }
                Some(FieldValue::Object(fields))
            }
            _ => {
                warn!(list = description, "dropping non-object item from object list");
                None
            }
        })
        .collect()
}

fn coerce_item_value(
    value: serde_json::Value,
    node: &SchemaNode,
    config: &ExtractorConfig,
) -> FieldValue {
    let SchemaNode::Scalar { value_type, .. } = node else {
        return FieldValue::from(value);
    };

    match &value {
        serde_json::Value::String(s) => {
            coerce(s, *value_type, &config.truthy_keywords).unwrap_or(FieldValue::Null)
        }
        _ => FieldValue::from(value),
    }
}
