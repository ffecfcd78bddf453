//! Schema walker - recursive traversal assembling a mirror-shaped record.
//!
//! Dispatch is by schema variant: scalars go to the field extractor,
//! lists to the list extractor, objects recurse. Children are visited in
//! declaration order, one model call per leaf, sequentially. Per-leaf
//! failures degrade to null or an empty list and never abort the walk.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::pipeline::field::FieldExtractor;
use crate::pipeline::grounding::Grounding;
use crate::pipeline::list::{ListExtractor, ListTemplate};
use crate::traits::model::LanguageModel;
use crate::types::config::ExtractorConfig;
use crate::types::document::SourceDocument;
use crate::types::record::{ExtractionOutput, FieldReport, FieldValue};
use crate::types::schema::SchemaNode;

/// Walks a schema over one document at a time.
///
/// Dependencies are injected at construction; the walker holds no
/// ambient state and the same schema always yields a structurally
/// identical record.
pub struct SchemaWalker<M, G> {
    fields: FieldExtractor<M, G>,
    lists: ListExtractor<M>,
}

impl<M: LanguageModel, G: Grounding> SchemaWalker<M, G> {
    /// Create a walker over injected model and grounding oracle.
    pub fn new(model: Arc<M>, grounding: Arc<G>, config: ExtractorConfig) -> Self {
        Self {
            fields: FieldExtractor::new(Arc::clone(&model), grounding, config.clone()),
            lists: ListExtractor::new(model, config),
        }
    }

    /// Walk the schema over one document.
    pub async fn walk(&self, schema: &SchemaNode, doc: &SourceDocument) -> Result<ExtractionOutput> {
        self.walk_with_cancel(schema, doc, &CancellationToken::new())
            .await
    }

    /// Walk with cooperative cancellation.
    ///
    /// The token is checked before each leaf query; a triggered token
    /// stops new queries and returns `Cancelled` without a partial
    /// record (the caller's cache entry stays in `Processing`).
    pub async fn walk_with_cancel(
        &self,
        schema: &SchemaNode,
        doc: &SourceDocument,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutput> {
        let mut reports = Vec::with_capacity(schema.leaf_count());
        let record = self.visit(schema, doc, cancel, "$", &mut reports).await?;
        debug!(leaves = reports.len(), "walk complete");
        Ok(ExtractionOutput {
            record,
            fields: reports,
        })
    }

    fn visit<'a>(
        &'a self,
        node: &'a SchemaNode,
        doc: &'a SourceDocument,
        cancel: &'a CancellationToken,
        path: &'a str,
        reports: &'a mut Vec<FieldReport>,
    ) -> futures::future::BoxFuture<'a, Result<FieldValue>> {
        // Recursion through an async fn needs a boxed future.
        Box::pin(async move {
            match node {
                SchemaNode::Scalar {
                    description,
                    value_type,
                    inferred,
                } => {
                    if cancel.is_cancelled() {
                        return Err(ExtractionError::Cancelled);
                    }
                    let (value, outcome) = self
                        .fields
                        .extract(doc, description, *value_type, *inferred)
                        .await;
                    reports.push(FieldReport::new(path, outcome));
                    Ok(value)
                }
                SchemaNode::Object { fields } => {
                    let mut out = indexmap::IndexMap::with_capacity(fields.len());
                    for (name, child) in fields {
                        let child_path = join_path(path, name);
                        let value = self.visit(child, doc, cancel, &child_path, reports).await?;
                        out.insert(name.clone(), value);
                    }
                    Ok(FieldValue::Object(out))
                }
                SchemaNode::ScalarList { item_description } => {
                    if cancel.is_cancelled() {
                        return Err(ExtractionError::Cancelled);
                    }
                    let description = list_description(path, item_description);
                    let (value, outcome) = self
                        .lists
                        .extract(doc, &description, ListTemplate::Scalars(item_description))
                        .await;
                    reports.push(FieldReport::new(path, outcome));
                    Ok(value)
                }
                SchemaNode::ObjectList { item_template } => {
                    if cancel.is_cancelled() {
                        return Err(ExtractionError::Cancelled);
                    }
                    let description = list_description(path, "items");
                    let (value, outcome) = self
                        .lists
                        .extract(doc, &description, ListTemplate::Objects(item_template))
                        .await;
                    reports.push(FieldReport::new(path, outcome));
                    Ok(value)
                }
            }
        })
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "$" {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Human-readable list description derived from the leaf's key,
/// e.g. `shipment.starboard_rates` -> "List of starboard rates".
fn list_description(path: &str, fallback: &str) -> String {
    let key = path.rsplit('.').next().unwrap_or(fallback);
    let key = if key == "$" { fallback } else { key };
    format!("List of {}", key.replace('_', " "))
}
