//! Batch engine - drives the extractor over a batch.
//!
//! Model calls run concurrently up to a caller-supplied limit and finish in
//! any order. Each finished document is parsed and checked right away; the
//! deduplicator only runs after every document has completed or failed.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{EngineError, ExtractorError, ExtractorResult, Result};
use crate::pipeline::batch::{assemble_report, process_document, DocumentOutcome};
use crate::traits::extractor::Extractor;
use crate::types::batch::Batch;
use crate::types::config::EngineConfig;
use crate::types::document::{Document, RawExtraction};
use crate::types::report::{BatchReport, ReportStatus};
use crate::types::taxonomy::Taxonomy;

/// Runs batches through an extractor.
pub struct Engine<E: Extractor> {
    extractor: E,
    config: EngineConfig,
}

impl<E: Extractor> Engine<E> {
    /// Create an engine with default configuration.
    pub fn new(extractor: E) -> Self {
        Self::with_config(extractor, EngineConfig::default())
    }

    pub fn with_config(extractor: E, config: EngineConfig) -> Self {
        Self { extractor, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Run a batch to completion.
    pub async fn run(&self, batch: &Batch, concurrency: usize) -> Result<BatchReport> {
        self.run_with_cancel(batch, concurrency, CancellationToken::new())
            .await
    }

    /// Run a batch, stopping early if `cancel` fires.
    ///
    /// On cancellation, finished work is discarded and `Cancelled` is
    /// returned, unless best-effort mode is on: then a report marked
    /// partial is built from the documents that finished, with the rest
    /// annotated as cancelled.
    #[instrument(skip(self, batch, cancel), fields(documents = batch.documents.len()))]
    pub async fn run_with_cancel(
        &self,
        batch: &Batch,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<BatchReport> {
        self.config.validate()?;
        batch.validate()?;

        let taxonomy: &Taxonomy = &batch.taxonomy;
        let mut outcomes: Vec<Option<DocumentOutcome>> =
            batch.documents.iter().map(|_| None).collect();

        let cancelled = {
            let mut calls = pin!(stream::iter(batch.documents.iter().enumerate())
                .map(|(index, document)| async move {
                    let result = self.call(document, taxonomy).await;
                    let outcome =
                        process_document(document, result, taxonomy, &self.config, Utc::now());
                    (index, outcome)
                })
                .buffer_unordered(concurrency.max(1)));

            // Dropping the stream at the end of this block aborts calls in flight
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break true,
                    next = calls.next() => match next {
                        Some((index, outcome)) => outcomes[index] = Some(outcome),
                        None => break false,
                    },
                }
            }
        };

        let status = if cancelled {
            let finished = outcomes.iter().filter(|o| o.is_some()).count();
            if !self.config.best_effort || finished == 0 {
                info!(finished, "Batch cancelled; discarding finished documents");
                return Err(EngineError::Cancelled);
            }
            warn!(
                finished,
                total = batch.documents.len(),
                "Batch cancelled; building partial report"
            );
            ReportStatus::Partial
        } else {
            ReportStatus::Complete
        };

        let outcomes = batch
            .documents
            .iter()
            .zip(outcomes)
            .map(|(document, outcome)| {
                outcome.unwrap_or_else(|| {
                    DocumentOutcome::failed(document, &ExtractorError::Cancelled)
                })
            })
            .collect();

        assemble_report(batch, outcomes, &self.config, status)
    }

    async fn call(&self, document: &Document, taxonomy: &Taxonomy) -> ExtractorResult<RawExtraction> {
        let Some(limit) = self.config.call_timeout() else {
            return self.extractor.extract(document, taxonomy).await;
        };
        match tokio::time::timeout(limit, self.extractor.extract(document, taxonomy)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractorError::Timeout {
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }
}
