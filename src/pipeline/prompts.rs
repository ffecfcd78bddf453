//! LLM prompts for the extraction pipeline.
//!
//! Every prompt restricts the model to the supplied document text; the
//! field prompt additionally fixes the not-found sentinel so the
//! extractor can distinguish "absent" from "ungrounded".

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::types::schema::SchemaNode;

/// System instruction for single-field extraction.
pub const FIELD_SYSTEM_PROMPT: &str = "You are a data extraction expert. You respond with the \
single piece of requested information and nothing else. If the information is not found in the \
text, you respond with exactly {sentinel}.";

/// User prompt for single-field extraction.
pub const FIELD_PROMPT: &str = "Based *only* on the text provided below, what is the value for \
'{description}'?\n\n--- TEXT ---\n{text}\n--- END TEXT ---";

/// System instruction for list extraction.
pub const LIST_SYSTEM_PROMPT: &str =
    "You are a data extraction expert. You only respond with a valid JSON array.";

/// User prompt for list extraction.
pub const LIST_PROMPT: &str = "Based *only* on the text provided below, extract all items for \
'{description}'.\n{instruction}\nIf no items are found, return an empty list: [].\n\n--- TEXT \
---\n{text}\n--- END TEXT ---";

/// System instruction for the relevance gate.
pub const GATE_SYSTEM_PROMPT: &str = "You are a document triage classifier. Decide whether the \
following text is a business communication worth extracting data from (a quote, rate request, or \
shipment correspondence), as opposed to spam or an advertisement. Respond with exactly true or \
false.";

/// User prompt for the relevance gate.
pub const GATE_PROMPT: &str = "--- TEXT ---\n{text}\n--- END TEXT ---";

/// Format the field system prompt with the configured sentinel.
pub fn format_field_system_prompt(sentinel: &str) -> String {
    FIELD_SYSTEM_PROMPT.replace("{sentinel}", sentinel)
}

/// Format the field prompt for one description and document.
pub fn format_field_prompt(description: &str, text: &str) -> String {
    FIELD_PROMPT
        .replace("{description}", description)
        .replace("{text}", text)
}

/// Format the list prompt for a scalar-item list.
pub fn format_scalar_list_prompt(description: &str, text: &str) -> String {
    LIST_PROMPT
        .replace("{description}", description)
        .replace(
            "{instruction}",
            "Return the result as a JSON array of strings.",
        )
        .replace("{text}", text)
}

/// Format the list prompt for an object-item list, showing the template
/// as an example object (key -> item description).
pub fn format_object_list_prompt(
    description: &str,
    template: &IndexMap<String, SchemaNode>,
    text: &str,
) -> String {
    let example: serde_json::Map<String, serde_json::Value> = template
        .iter()
        .map(|(key, node)| {
            let desc = match node {
                SchemaNode::Scalar { description, .. } => description.clone(),
                // validate() forbids non-scalar template leaves
                _ => key.clone(),
            };
            (key.clone(), serde_json::Value::String(desc))
        })
        .collect();

    let instruction = format!(
        "Return the result as a JSON array of objects. Each object must use exactly these keys, \
as in this example: {}.",
        serde_json::Value::Object(example)
    );

    LIST_PROMPT
        .replace("{description}", description)
        .replace("{instruction}", &instruction)
        .replace("{text}", text)
}

/// Format the relevance-gate prompt.
pub fn format_gate_prompt(text: &str) -> String {
    GATE_PROMPT.replace("{text}", text)
}

/// Fingerprint of the field prompt templates, for invalidating any
/// response cache when prompt wording changes.
pub fn field_prompt_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(FIELD_SYSTEM_PROMPT.as_bytes());
    hasher.update(FIELD_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_prompt_contains_description_and_text() {
        let prompt = format_field_prompt("Pickup City", "Pickup in Dallas, TX");
        assert!(prompt.contains("'Pickup City'"));
        assert!(prompt.contains("Pickup in Dallas, TX"));
    }

    #[test]
    fn test_field_system_prompt_names_sentinel() {
        let system = format_field_system_prompt("N/A");
        assert!(system.contains("exactly N/A"));
    }

    #[test]
    fn test_object_list_prompt_shows_template_keys() {
        let template: IndexMap<String, SchemaNode> = [
            ("length".to_string(), SchemaNode::number("Length")),
            ("width".to_string(), SchemaNode::number("Width")),
        ]
        .into_iter()
        .collect();

        let prompt = format_object_list_prompt("List of dimensions", &template, "some text");
        assert!(prompt.contains(r#""length":"Length""#));
        assert!(prompt.contains(r#""width":"Width""#));
        assert!(prompt.contains("empty list: []"));
    }

    #[test]
    fn test_prompt_hash_is_consistent() {
        let hash1 = field_prompt_hash();
        let hash2 = field_prompt_hash();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 hex
    }
}
