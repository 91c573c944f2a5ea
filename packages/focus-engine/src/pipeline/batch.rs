//! Per-document processing and batch assembly.
//!
//! `process_document` is the pure per-document stage (parse, validate,
//! check); `assemble_report` is the barrier that runs deduplication once
//! every document has an outcome.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{EngineError, ExtractorError, ExtractorResult, Result};
use crate::pipeline::dedup::deduplicate;
use crate::pipeline::grounding::{GroundednessChecker, GroundingTally};
use crate::pipeline::parse::parse_tagged_response;
use crate::pipeline::report::build_report;
use crate::pipeline::validate::validate_tags;
use crate::types::batch::Batch;
use crate::types::config::EngineConfig;
use crate::types::document::{Document, DocumentId, RawExtraction};
use crate::types::fact::{Fact, FactId};
use crate::types::report::{BatchReport, ReportStatus, SourceStats};
use crate::types::taxonomy::Taxonomy;

/// Checked facts and stats for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub stats: SourceStats,
    pub facts: Vec<Fact>,
}

impl DocumentOutcome {
    /// A document whose model call failed contributes no facts.
    pub fn failed(document: &Document, error: &ExtractorError) -> Self {
        let mut stats = SourceStats::new(document);
        stats.failure = Some(error.to_string());
        Self {
            stats,
            facts: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.stats.is_failed()
    }
}

/// Run one document's model output through parse, validate and check.
pub fn process_document(
    document: &Document,
    result: ExtractorResult<RawExtraction>,
    taxonomy: &Taxonomy,
    config: &EngineConfig,
    extracted_at: DateTime<Utc>,
) -> DocumentOutcome {
    let raw = match result.and_then(|raw| accept_raw(document, raw)) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(document_id = %document.id, error = %error, "Model call failed for document");
            return DocumentOutcome::failed(document, &error);
        }
    };

    let mut stats = SourceStats::new(document);
    stats.model_name = Some(raw.model_name.clone());
    stats.time_cost = raw.time_cost;
    stats.tokens_prompt = raw.tokens_prompt;
    stats.tokens_completion = raw.tokens_completion;

    let parsed = parse_tagged_response(&raw.raw_text, &config.parse);
    stats.parse_skips = parsed.skipped;
    stats.duplicates_collapsed = parsed.duplicates;
    stats.no_information = parsed.no_information;

    let validated = validate_tags(parsed.items, taxonomy);
    stats.unknown_tags = validated.unknown_tags;

    let checker = GroundednessChecker::for_document(document, &config.grounding);
    let facts: Vec<Fact> = validated
        .accepted
        .into_iter()
        .enumerate()
        .map(|(ordinal, item)| {
            let grounding = checker.check(&item.summary);
            Fact::new(
                FactId::new(document.id.clone(), ordinal as u32),
                item.tag,
                item.summary,
                extracted_at,
                grounding,
            )
        })
        .collect();

    let tally = GroundingTally::from_facts(&facts);
    stats.facts_considered = tally.considered;
    stats.hallucination_count = tally.hallucinations;
    stats.unverifiable_count = tally.unverifiable;

    if stats.source_unavailable && !facts.is_empty() {
        warn!(document_id = %document.id, facts = facts.len(), "Document has no text; facts marked ungrounded");
    }
    debug!(
        document_id = %document.id,
        facts = facts.len(),
        skipped = stats.parse_skips,
        unknown_tags = stats.unknown_tags.len(),
        hallucinations = stats.hallucination_count,
        "Processed document"
    );

    DocumentOutcome { stats, facts }
}

fn accept_raw(document: &Document, raw: RawExtraction) -> ExtractorResult<RawExtraction> {
    if raw.document_id != document.id {
        return Err(ExtractorError::Call(format!(
            "response is for document {}, expected {}",
            raw.document_id, document.id
        )));
    }
    if raw.raw_text.trim().is_empty() {
        return Err(ExtractorError::EmptyResponse);
    }
    Ok(raw)
}

/// Deduplicate and aggregate once every document has an outcome.
///
/// `outcomes` must be in batch order. Fails with `NoExtractableContent`
/// when every document failed (an empty batch is a valid empty report).
pub fn assemble_report(
    batch: &Batch,
    outcomes: Vec<DocumentOutcome>,
    config: &EngineConfig,
    status: ReportStatus,
) -> Result<BatchReport> {
    if !outcomes.is_empty() && outcomes.iter().all(DocumentOutcome::is_failed) {
        return Err(EngineError::NoExtractableContent {
            documents: outcomes.len(),
        });
    }

    let mut sources = Vec::with_capacity(outcomes.len());
    let mut facts = Vec::new();
    for outcome in outcomes {
        sources.push(outcome.stats);
        facts.extend(outcome.facts);
    }

    let dedup = deduplicate(facts, &config.dedup)?;
    Ok(build_report(batch, sources, dedup, config, status))
}

/// Build a report from already-collected model results.
///
/// Results may be in any order; they are matched to documents by id. A
/// document without a result counts as a failed call.
pub fn process_batch(
    batch: &Batch,
    results: Vec<(DocumentId, ExtractorResult<RawExtraction>)>,
    config: &EngineConfig,
) -> Result<BatchReport> {
    config.validate()?;
    batch.validate()?;

    let mut slots: Vec<Option<ExtractorResult<RawExtraction>>> =
        batch.documents.iter().map(|_| None).collect();
    for (id, result) in results {
        match batch.position(&id) {
            Some(i) => slots[i] = Some(result),
            None => warn!(document_id = %id, "Ignoring result for document outside batch"),
        }
    }

    let extracted_at = Utc::now();
    let outcomes = batch
        .documents
        .iter()
        .zip(slots)
        .map(|(document, slot)| {
            let result = slot.unwrap_or_else(|| {
                Err(ExtractorError::Call("no extraction result".to_string()))
            });
            process_document(document, result, &batch.taxonomy, config, extracted_at)
        })
        .collect();

    assemble_report(batch, outcomes, config, ReportStatus::Complete)
}
