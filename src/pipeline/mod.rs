//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Relevance gating (optional pre-filter)
//! - Schema walking (recursive per-variant dispatch)
//! - Field extraction with grounding and bounded retry
//! - List extraction with malformed-response degradation
//! - Document batches over an insert-once results cache

pub mod coerce;
pub mod field;
pub mod gate;
pub mod grounding;
pub mod list;
pub mod processor;
pub mod prompts;
pub mod walker;

pub use coerce::{coerce, CoerceError};
pub use field::FieldExtractor;
pub use gate::{GateDecision, RelevanceGate};
pub use grounding::{EmbeddingGrounding, Grounding, SubstringGrounding, Verdict};
pub use list::{ListExtractor, ListTemplate};
pub use processor::{DocumentInput, Processor};
pub use prompts::{
    field_prompt_hash, format_field_prompt, format_field_system_prompt, format_gate_prompt,
    format_object_list_prompt, format_scalar_list_prompt, FIELD_PROMPT, FIELD_SYSTEM_PROMPT,
    GATE_PROMPT, GATE_SYSTEM_PROMPT, LIST_PROMPT, LIST_SYSTEM_PROMPT,
};
pub use walker::SchemaWalker;
