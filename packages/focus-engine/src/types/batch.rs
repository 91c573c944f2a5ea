//! Batch input.

use std::collections::HashSet;
use std::sync::Arc;

use super::document::{Document, DocumentId};
use crate::error::{EngineError, Result};
use super::taxonomy::Taxonomy;

/// One extraction run: a focus statement evaluated over N documents.
///
/// Document order is the batch order used for report ordering.
#[derive(Debug, Clone)]
pub struct Batch {
    pub focus_statement: String,
    pub taxonomy: Arc<Taxonomy>,
    pub documents: Vec<Document>,
}

impl Batch {
    /// Create a batch whose focus statement is rendered from the taxonomy.
    pub fn new(taxonomy: Arc<Taxonomy>, documents: Vec<Document>) -> Self {
        Self {
            focus_statement: taxonomy.focus_statement(),
            taxonomy,
            documents,
        }
    }

    /// Override the focus statement.
    pub fn with_focus_statement(mut self, focus_statement: impl Into<String>) -> Self {
        self.focus_statement = focus_statement.into();
        self
    }

    /// Position of a document in batch order.
    pub fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| &d.id == id)
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }

    /// Check that document ids are unique.
    ///
    /// Fact ids are derived from document ids, so a repeated id would merge
    /// two documents' facts.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.documents.len());
        for document in &self.documents {
            if !seen.insert(&document.id) {
                return Err(EngineError::InvalidBatch {
                    reason: format!("duplicate document id {}", document.id),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::taxonomy::FocusPoint;

    #[test]
    fn test_focus_statement_defaults_to_taxonomy() {
        let taxonomy = Arc::new(
            Taxonomy::new([FocusPoint::new("Policy Release", "new government policies")]).unwrap(),
        );
        let batch = Batch::new(
            taxonomy,
            vec![
                Document::new("b", "https://b.example", "text"),
                Document::new("a", "https://a.example", "text"),
            ],
        );
        assert_eq!(
            batch.focus_statement,
            "<tag>Policy Release</tag>new government policies"
        );
        assert_eq!(batch.position(&DocumentId::new("a")), Some(1));

        let custom = batch.with_focus_statement("AI policy in education");
        assert_eq!(custom.focus_statement, "AI policy in education");
    }

    #[test]
    fn test_duplicate_document_ids_are_rejected() {
        let taxonomy = Arc::new(Taxonomy::new([FocusPoint::new("Tech", "")]).unwrap());
        let unique = Batch::new(
            taxonomy.clone(),
            vec![
                Document::new("a", "https://a.example", "text"),
                Document::new("b", "https://b.example", "text"),
            ],
        );
        assert!(unique.validate().is_ok());

        let repeated = Batch::new(
            taxonomy,
            vec![
                Document::new("a", "https://a.example", "text"),
                Document::new("a", "https://mirror.example", "text"),
            ],
        );
        let err = repeated.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_batch");
        assert_eq!(err.to_string(), "invalid batch: duplicate document id a");
    }
}
