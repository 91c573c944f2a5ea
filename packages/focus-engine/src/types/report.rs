//! Batch report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::document::{Document, DocumentId};
use super::fact::{EventCluster, Fact, Grounding};
use crate::error::Result;

/// Whether every document in the batch was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,

    /// Best-effort report from a cancelled batch
    Partial,
}

/// Provenance and quality counters for one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub document_id: DocumentId,
    pub source_uri: String,

    /// None when the model call failed
    pub model_name: Option<String>,
    pub time_cost: f64,
    pub tokens_prompt: u32,
    pub tokens_completion: u32,

    /// Facts that reached the groundedness checker
    pub facts_considered: usize,
    pub parse_skips: usize,
    pub duplicates_collapsed: usize,

    /// Labels dropped by taxonomy validation
    pub unknown_tags: Vec<String>,
    pub hallucination_count: usize,
    pub unverifiable_count: usize,

    /// Document had no text to verify against
    pub source_unavailable: bool,

    /// Model answered with the "no information" sentinel
    pub no_information: bool,

    /// Model-call failure, if any
    pub failure: Option<String>,
}

impl SourceStats {
    pub fn new(document: &Document) -> Self {
        Self {
            document_id: document.id.clone(),
            source_uri: document.source_uri.clone(),
            model_name: None,
            time_cost: 0.0,
            tokens_prompt: 0,
            tokens_completion: 0,
            facts_considered: 0,
            parse_skips: 0,
            duplicates_collapsed: 0,
            unknown_tags: Vec::new(),
            hallucination_count: 0,
            unverifiable_count: 0,
            source_unavailable: document.is_text_missing(),
            no_information: false,
            failure: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// One emitted fact: the canonical representative of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub fact: Fact,

    /// Size of the cluster this fact represents
    pub member_count: usize,

    /// Every document contributing to the cluster, in batch order
    pub source_document_ids: Vec<DocumentId>,
}

/// Final output of one batch. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub(crate) batch_id: Uuid,
    pub(crate) focus_statement: String,
    pub(crate) status: ReportStatus,
    pub(crate) strict_mode: bool,
    pub(crate) prompt_hash: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) facts: Vec<ReportEntry>,
    pub(crate) clusters: Vec<EventCluster>,
    pub(crate) total_facts_considered: usize,
    pub(crate) hallucination_count: usize,
    pub(crate) hallucination_rate: f64,
    pub(crate) unverifiable_count: usize,
    pub(crate) parse_skips: usize,
    pub(crate) unknown_tag_count: usize,
    pub(crate) sources: Vec<SourceStats>,
}

impl BatchReport {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn focus_statement(&self) -> &str {
        &self.focus_statement
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn is_partial(&self) -> bool {
        self.status == ReportStatus::Partial
    }

    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// SHA-256 of the extraction prompt the batch was run with
    pub fn prompt_hash(&self) -> &str {
        &self.prompt_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Canonical facts, one per emitted cluster, in report order
    pub fn facts(&self) -> &[ReportEntry] {
        &self.facts
    }

    /// Every cluster, including those filtered from `facts` in strict mode
    pub fn clusters(&self) -> &[EventCluster] {
        &self.clusters
    }

    pub fn total_facts_considered(&self) -> usize {
        self.total_facts_considered
    }

    pub fn hallucination_count(&self) -> usize {
        self.hallucination_count
    }

    /// `hallucination_count / total_facts_considered`, counted before
    /// deduplication
    pub fn hallucination_rate(&self) -> f64 {
        self.hallucination_rate
    }

    pub fn unverifiable_count(&self) -> usize {
        self.unverifiable_count
    }

    pub fn parse_skips(&self) -> usize {
        self.parse_skips
    }

    pub fn unknown_tag_count(&self) -> usize {
        self.unknown_tag_count
    }

    /// Per-document stats in batch order
    pub fn sources(&self) -> &[SourceStats] {
        &self.sources
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceStats> {
        self.sources.iter().filter(|s| s.is_failed())
    }

    pub fn total_time_cost(&self) -> f64 {
        self.sources.iter().map(|s| s.time_cost).sum()
    }

    pub fn total_tokens(&self) -> (u64, u64) {
        self.sources.iter().fold((0, 0), |(p, c), s| {
            (p + s.tokens_prompt as u64, c + s.tokens_completion as u64)
        })
    }

    /// Distinct model names in batch order.
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.sources.iter().filter_map(|s| s.model_name.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the plain-text report (same as `to_string()`).
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

/// Plain-text report.
///
/// Header (focus statement, raw materials, models, cost, hallucination
/// figures), then facts grouped by the source of their canonical fact, then
/// per-document failures.
impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prompt_tokens, completion_tokens) = self.total_tokens();

        writeln!(f, "Focus: {}", self.focus_statement)?;
        writeln!(
            f,
            "Batch: {} ({}{})",
            self.batch_id,
            match self.status {
                ReportStatus::Complete => "complete",
                ReportStatus::Partial => "partial",
            },
            if self.strict_mode { ", strict" } else { "" }
        )?;
        let materials: Vec<String> = self
            .sources
            .iter()
            .map(|s| format!("{} ({})", s.document_id, s.source_uri))
            .collect();
        writeln!(f, "Raw materials: {}", materials.join(", "))?;
        writeln!(f, "Models: {}", self.model_names().join(", "))?;
        writeln!(
            f,
            "Cost: {:.2}s, {} prompt tokens, {} completion tokens",
            self.total_time_cost(),
            prompt_tokens,
            completion_tokens
        )?;
        writeln!(
            f,
            "Hallucinations: {} of {} facts ({:.1}%), {} unverifiable",
            self.hallucination_count,
            self.total_facts_considered,
            self.hallucination_rate * 100.0,
            self.unverifiable_count
        )?;
        writeln!(
            f,
            "Parse skips: {}, unknown tags: {}",
            self.parse_skips, self.unknown_tag_count
        )?;

        for source in &self.sources {
            let entries: Vec<&ReportEntry> = self
                .facts
                .iter()
                .filter(|e| e.fact.source_document_id == source.document_id)
                .collect();
            if entries.is_empty() {
                continue;
            }

            writeln!(
                f,
                "\n== {} ({}): {} facts, {} hallucinated ==",
                source.document_id,
                source.source_uri,
                source.facts_considered,
                source.hallucination_count
            )?;
            for entry in entries {
                write!(
                    f,
                    "- [{}] {} ({}",
                    entry.fact.tag,
                    entry.fact.summary,
                    entry.fact.grounding.label()
                )?;
                if let Grounding::Fabricated { missing } = &entry.fact.grounding {
                    write!(f, ": {}", missing.join(", "))?;
                }
                let others: Vec<&str> = entry
                    .source_document_ids
                    .iter()
                    .filter(|id| **id != entry.fact.source_document_id)
                    .map(DocumentId::as_str)
                    .collect();
                if !others.is_empty() {
                    write!(f, "; also in {}", others.join(", "))?;
                }
                writeln!(f, ")")?;
            }
        }

        let failures: Vec<&SourceStats> = self.failed_sources().collect();
        if !failures.is_empty() {
            writeln!(f, "\nFailures:")?;
            for source in failures {
                writeln!(
                    f,
                    "- {}: {}",
                    source.document_id,
                    source.failure.as_deref().unwrap_or_default()
                )?;
            }
        }

        Ok(())
    }
}
