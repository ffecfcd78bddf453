//! Domain types: schema descriptors, extraction records, documents,
//! and pipeline configuration.

pub mod config;
pub mod document;
pub mod record;
pub mod schema;

pub use config::{ExtractorConfig, ProcessorConfig};
pub use document::SourceDocument;
pub use record::{DocumentOutcome, ExtractionOutput, FieldReport, FieldValue, LeafOutcome};
pub use schema::{SchemaNode, ValueType};
