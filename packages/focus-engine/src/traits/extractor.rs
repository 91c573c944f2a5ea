//! Extractor trait for the model call.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExtractorResult;
use crate::types::document::{Document, RawExtraction};
use crate::types::taxonomy::Taxonomy;

/// Runs the extraction prompt for one document.
///
/// Implementations wrap a model provider (or replay recorded output) and
/// return the raw tagged-line response with its cost. They own prompting,
/// retries and rate limiting; the engine only bounds how many calls are in
/// flight.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        document: &Document,
        taxonomy: &Taxonomy,
    ) -> ExtractorResult<RawExtraction>;
}

#[async_trait]
impl<T: Extractor + ?Sized> Extractor for Arc<T> {
    async fn extract(
        &self,
        document: &Document,
        taxonomy: &Taxonomy,
    ) -> ExtractorResult<RawExtraction> {
        (**self).extract(document, taxonomy).await
    }
}
