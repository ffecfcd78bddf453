//! Field-by-Field Grounded Extraction Library
//!
//! Extracts structured records from unstructured text (email bodies,
//! freeform shipment requests) by querying a language model one field at
//! a time and verifying every answer against the source document before
//! accepting it.
//!
//! # Design Philosophy
//!
//! **"Trust nothing the model says until the document backs it up"**
//!
//! - One model call per leaf, each answer checked for provenance
//! - Ungrounded or untypeable answers retried within a fixed budget,
//!   then degraded to null - keys are never dropped
//! - The output record always mirrors the schema shape
//! - Model and embedder are injected dependencies, never ambient
//!   singletons, so tests run on deterministic fakes
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fieldwise::{ExtractorConfig, SchemaNode, SchemaWalker, SourceDocument, SubstringGrounding};
//!
//! let schema = SchemaNode::object([
//!     ("city", SchemaNode::scalar("Pickup City")),
//!     ("pallets", SchemaNode::object_list([
//!         ("count", SchemaNode::number("Piece Count")),
//!     ])),
//! ]);
//! schema.validate()?;
//!
//! let walker = SchemaWalker::new(model, Arc::new(SubstringGrounding::new()), ExtractorConfig::default());
//! let doc = SourceDocument::new("Pickup in Dallas, TX. 3 pallets, count 12.");
//! let output = walker.walk(&schema, &doc).await?;
//! println!("{}", serde_json::to_string_pretty(&output.record)?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (LanguageModel, Embedder, ResultStore)
//! - [`types`] - Schema descriptors, records, documents, configuration
//! - [`pipeline`] - Gate, walker, field/list extraction, grounding
//! - [`stores`] - Results-cache implementations
//! - [`models`] - Model decorators (rate limiting)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ExtractionError, Result};
pub use traits::{
    model::{Embedder, LanguageModel, SamplingConfig},
    store::{cosine_similarity, JobEntry, JobStatus, ResultStore},
};
pub use types::{
    config::{ExtractorConfig, ProcessorConfig},
    document::SourceDocument,
    record::{DocumentOutcome, ExtractionOutput, FieldReport, FieldValue, LeafOutcome},
    schema::{SchemaNode, ValueType},
};

// Re-export pipeline components
pub use pipeline::{
    // Extraction
    FieldExtractor, ListExtractor, ListTemplate, SchemaWalker,
    // Gating
    GateDecision, RelevanceGate,
    // Grounding
    EmbeddingGrounding, Grounding, SubstringGrounding, Verdict,
    // Batch processing
    DocumentInput, Processor,
    // Coercion
    coerce, CoerceError,
};

// Re-export stores
pub use stores::MemoryResultStore;

// Re-export model decorators
pub use models::{ModelExt, RateLimitedModel};

#[cfg(feature = "openai")]
pub use ai::OpenAIModel;
