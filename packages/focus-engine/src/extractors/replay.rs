//! Replay of recorded model output.
//!
//! A recorded batch is a JSON file holding the taxonomy, the documents and
//! what the model answered for each of them. Replaying it through the engine
//! reproduces a run without calling a model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ExtractorError, ExtractorResult, Result};
use crate::traits::extractor::Extractor;
use crate::types::batch::Batch;
use crate::types::document::{Document, DocumentId, RawExtraction};
use crate::types::taxonomy::Taxonomy;

/// One recorded model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedCall {
    /// The call failed with this message
    Failed { document_id: DocumentId, error: String },

    Completed(RawExtraction),
}

impl RecordedCall {
    pub fn document_id(&self) -> &DocumentId {
        match self {
            Self::Failed { document_id, .. } => document_id,
            Self::Completed(raw) => &raw.document_id,
        }
    }
}

/// A batch as recorded on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedBatch {
    /// Defaults to the taxonomy's rendered focus statement
    #[serde(default)]
    pub focus_statement: Option<String>,
    pub taxonomy: Taxonomy,
    pub documents: Vec<Document>,
    #[serde(default)]
    pub extractions: Vec<RecordedCall>,
}

impl RecordedBatch {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Split into the batch to run and the extractor that replays it.
    pub fn into_parts(self) -> (Batch, ReplayExtractor) {
        let mut batch = Batch::new(Arc::new(self.taxonomy), self.documents);
        if let Some(statement) = self.focus_statement {
            batch = batch.with_focus_statement(statement);
        }
        (batch, ReplayExtractor::new(self.extractions))
    }
}

/// Extractor that answers from recorded calls.
///
/// A document without a recording is a failed call.
#[derive(Debug, Clone, Default)]
pub struct ReplayExtractor {
    calls: HashMap<DocumentId, RecordedCall>,
}

impl ReplayExtractor {
    /// Later recordings for the same document replace earlier ones.
    pub fn new(calls: impl IntoIterator<Item = RecordedCall>) -> Self {
        Self {
            calls: calls
                .into_iter()
                .map(|call| (call.document_id().clone(), call))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[async_trait]
impl Extractor for ReplayExtractor {
    async fn extract(
        &self,
        document: &Document,
        _taxonomy: &Taxonomy,
    ) -> ExtractorResult<RawExtraction> {
        match self.calls.get(&document.id) {
            Some(RecordedCall::Completed(raw)) => Ok(raw.clone()),
            Some(RecordedCall::Failed { error, .. }) => Err(ExtractorError::Call(error.clone())),
            None => Err(ExtractorError::Call(format!(
                "no recorded response for document {}",
                document.id
            ))),
        }
    }
}
