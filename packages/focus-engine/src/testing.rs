//! Testing utilities including a mock extractor.
//!
//! Useful for testing batch logic without making real model calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ExtractorError, ExtractorResult};
use crate::traits::extractor::Extractor;
use crate::types::document::{Document, DocumentId, RawExtraction};
use crate::types::taxonomy::Taxonomy;

/// A mock extractor with canned responses per document.
///
/// Documents without a canned response get the "None" sentinel.
#[derive(Clone)]
pub struct MockExtractor {
    /// Raw responses by document id
    responses: Arc<RwLock<HashMap<DocumentId, String>>>,

    /// Injected failures by document id
    failures: Arc<RwLock<HashMap<DocumentId, ExtractorError>>>,

    /// Artificial latency by document id
    delays: Arc<RwLock<HashMap<DocumentId, Duration>>>,

    /// Latency for documents without their own delay
    default_delay: Option<Duration>,

    model_name: String,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,

    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockExtractorCall {
    pub document_id: DocumentId,
    pub focus_points: usize,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    /// Create a new mock extractor with default behavior.
    pub fn new() -> Self {
        Self {
            responses: Arc::default(),
            failures: Arc::default(),
            delays: Arc::default(),
            default_delay: None,
            model_name: "mock-model".to_string(),
            calls: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        }
    }

    /// Set the model name reported in raw extractions.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Add a canned raw response for a document.
    pub fn with_response(self, document_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(DocumentId::new(document_id), raw_text.into());
        self
    }

    /// Make the call for a document fail.
    pub fn with_failure(self, document_id: impl Into<String>, error: ExtractorError) -> Self {
        self.failures
            .write()
            .unwrap()
            .insert(DocumentId::new(document_id), error);
        self
    }

    /// Delay the call for a document.
    pub fn with_delay(self, document_id: impl Into<String>, delay: Duration) -> Self {
        self.delays
            .write()
            .unwrap()
            .insert(DocumentId::new(document_id), delay);
        self
    }

    /// Delay every call without its own delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Highest number of calls that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn delay_for(&self, id: &DocumentId) -> Option<Duration> {
        self.delays
            .read()
            .unwrap()
            .get(id)
            .copied()
            .or(self.default_delay)
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        document: &Document,
        taxonomy: &Taxonomy,
    ) -> ExtractorResult<RawExtraction> {
        self.calls.write().unwrap().push(MockExtractorCall {
            document_id: document.id.clone(),
            focus_points: taxonomy.len(),
        });

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay_for(&document.id) {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failures.read().unwrap().get(&document.id) {
            return Err(error.clone());
        }

        let raw_text = self
            .responses
            .read()
            .unwrap()
            .get(&document.id)
            .cloned()
            .unwrap_or_else(|| "None".to_string());

        Ok(RawExtraction::new(document.id.as_str(), self.model_name.clone(), raw_text.clone())
            .with_cost(0.0, document.text.chars().count() as u32, raw_text.chars().count() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::taxonomy::FocusPoint;

    #[tokio::test]
    async fn test_canned_response_and_default() {
        let mock = MockExtractor::new().with_response("a", "<tag>A</tag>Alpha summary text");
        let taxonomy = Taxonomy::new([FocusPoint::new("A", "")]).unwrap();

        let a = mock
            .extract(&Document::new("a", "https://a.example", "alpha"), &taxonomy)
            .await
            .unwrap();
        assert_eq!(a.raw_text, "<tag>A</tag>Alpha summary text");
        assert_eq!(a.model_name, "mock-model");
        assert_eq!(a.tokens_prompt, 5);

        let b = mock
            .extract(&Document::new("b", "https://b.example", "beta"), &taxonomy)
            .await
            .unwrap();
        assert_eq!(b.raw_text, "None");

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].document_id.as_str(), "b");
        assert_eq!(calls[1].focus_points, 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockExtractor::new().with_failure("a", ExtractorError::Call("rate limited".into()));
        let taxonomy = Taxonomy::new([FocusPoint::new("A", "")]).unwrap();
        let err = mock
            .extract(&Document::new("a", "https://a.example", "alpha"), &taxonomy)
            .await
            .unwrap_err();
        assert_eq!(err, ExtractorError::Call("rate limited".into()));

        mock.clear_calls();
        assert!(mock.calls().is_empty());
    }
}
