//! Report aggregation.

use chrono::Utc;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::dedup::DedupOutcome;
use crate::pipeline::grounding::GroundingTally;
use crate::pipeline::prompts::extract_prompt_hash;
use crate::types::batch::Batch;
use crate::types::config::EngineConfig;
use crate::types::document::DocumentId;
use crate::types::report::{BatchReport, ReportEntry, ReportStatus, SourceStats};

/// Assemble the final report from clustered facts and per-document stats.
///
/// The hallucination figures cover every fact that reached the checker;
/// `facts` holds one canonical fact per cluster, ordered by the batch
/// position of its source document, then ordinal. In strict mode clusters
/// whose canonical fact is not grounded are left out of `facts`.
pub fn build_report(
    batch: &Batch,
    sources: Vec<SourceStats>,
    dedup: DedupOutcome,
    config: &EngineConfig,
    status: ReportStatus,
) -> BatchReport {
    let tally = GroundingTally::from_facts(&dedup.facts);

    let positions: HashMap<&DocumentId, usize> = batch
        .documents
        .iter()
        .enumerate()
        .map(|(i, d)| (&d.id, i))
        .collect();
    let position = |id: &DocumentId| positions.get(id).copied().unwrap_or(usize::MAX);

    let mut entries: Vec<ReportEntry> = Vec::with_capacity(dedup.clusters.len());
    for cluster in &dedup.clusters {
        let Some(canonical) = dedup.fact(&cluster.canonical_fact_id) else {
            continue;
        };
        if config.strict_mode && !canonical.grounded {
            continue;
        }

        let mut source_document_ids: Vec<DocumentId> = Vec::new();
        for id in &cluster.member_fact_ids {
            if !source_document_ids.contains(&id.document_id) {
                source_document_ids.push(id.document_id.clone());
            }
        }
        source_document_ids.sort_by_key(|id| position(id));

        entries.push(ReportEntry {
            fact: canonical.clone(),
            member_count: cluster.len(),
            source_document_ids,
        });
    }
    entries.sort_by(|a, b| {
        position(&a.fact.source_document_id)
            .cmp(&position(&b.fact.source_document_id))
            .then(a.fact.id.ordinal.cmp(&b.fact.id.ordinal))
    });

    let report = BatchReport {
        batch_id: Uuid::new_v4(),
        focus_statement: batch.focus_statement.clone(),
        status,
        strict_mode: config.strict_mode,
        prompt_hash: extract_prompt_hash(&batch.taxonomy, &config.parse.sentinel),
        created_at: Utc::now(),
        facts: entries,
        total_facts_considered: tally.considered,
        hallucination_count: tally.hallucinations,
        hallucination_rate: tally.rate(),
        unverifiable_count: tally.unverifiable,
        parse_skips: sources.iter().map(|s| s.parse_skips).sum(),
        unknown_tag_count: sources.iter().map(|s| s.unknown_tags.len()).sum(),
        clusters: dedup.clusters,
        sources,
    };

    info!(
        batch_id = %report.batch_id,
        status = ?report.status,
        facts = report.facts.len(),
        considered = report.total_facts_considered,
        hallucinations = report.hallucination_count,
        rate = report.hallucination_rate,
        "Built batch report"
    );

    report
}
