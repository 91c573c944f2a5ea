//! End-to-end batch tests through the engine and the mock extractor.

use focus_engine::testing::MockExtractor;
use focus_engine::{
    Batch, Document, DocumentId, EngineConfig, EngineError, Engine, ExtractorError, FocusPoint,
    Grounding, RecordedBatch, ReportStatus, Taxonomy,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLICY_DOC: &str = "On 2024-02-01, the State Council released Policy X.";
const FIXTURE: &str = include_str!("../fixtures/policy_batch.json");

fn policy_taxonomy() -> Arc<Taxonomy> {
    Arc::new(
        Taxonomy::new([
            FocusPoint::new("Policy Release", "New policies from government bodies"),
            FocusPoint::new("Tech", "Developer tooling and AI model integrations"),
        ])
        .unwrap(),
    )
}

fn single_doc_batch(text: &str) -> Batch {
    Batch::new(
        policy_taxonomy(),
        vec![Document::new("doc-1", "https://gov.example/policy-x", text)],
    )
}

#[tokio::test]
async fn test_clean_extraction() {
    let extractor = MockExtractor::new().with_response(
        "doc-1",
        "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X.",
    );
    let report = Engine::new(extractor)
        .run(&single_doc_batch(POLICY_DOC), 1)
        .await
        .unwrap();

    assert_eq!(report.facts().len(), 1);
    assert!(report.facts()[0].fact.grounded);
    assert_eq!(report.hallucination_count(), 0);
    assert_eq!(report.hallucination_rate(), 0.0);
    assert_eq!(report.status(), ReportStatus::Complete);
}

#[tokio::test]
async fn test_fabricated_fact() {
    let extractor = MockExtractor::new().with_response(
        "doc-1",
        "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy Y and allocated $5 billion.",
    );
    let report = Engine::new(extractor)
        .run(&single_doc_batch(POLICY_DOC), 1)
        .await
        .unwrap();

    assert_eq!(report.facts().len(), 1);
    let fact = &report.facts()[0].fact;
    assert!(!fact.grounded);
    assert!(matches!(fact.grounding, Grounding::Fabricated { .. }));
    assert_eq!(report.hallucination_count(), 1);
    assert_eq!(report.hallucination_rate(), 1.0);
    assert_eq!(report.sources()[0].hallucination_count, 1);
}

#[tokio::test]
async fn test_amount_next_to_a_date_is_checked() {
    let extractor = MockExtractor::new().with_response(
        "doc-1",
        "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X with 2 billion in funding.",
    );
    let report = Engine::new(extractor)
        .run(&single_doc_batch(POLICY_DOC), 1)
        .await
        .unwrap();

    assert_eq!(
        report.facts()[0].fact.grounding,
        Grounding::Fabricated {
            missing: vec!["2".to_string()]
        }
    );
    assert_eq!(report.hallucination_rate(), 1.0);
}

#[tokio::test]
async fn test_duplicate_document_ids_are_rejected() {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new("a", "https://a.example", POLICY_DOC),
            Document::new("a", "https://b.example", POLICY_DOC),
        ],
    );
    let extractor = MockExtractor::new();

    let engine = Engine::new(extractor);
    let err = engine.run(&batch, 2).await.unwrap_err();
    assert_eq!(err.code(), "invalid_batch");
    assert!(engine.extractor().calls().is_empty());
}

#[tokio::test]
async fn test_unknown_tag_dropped() {
    let extractor = MockExtractor::new().with_response("doc-1", "<tag>Rumor</tag>Something happened.");
    let report = Engine::new(extractor)
        .run(&single_doc_batch(POLICY_DOC), 1)
        .await
        .unwrap();

    assert!(report.facts().is_empty());
    assert_eq!(report.unknown_tag_count(), 1);
    assert_eq!(report.sources()[0].unknown_tags, vec!["Rumor"]);
    assert_eq!(report.hallucination_rate(), 0.0);
}

#[tokio::test]
async fn test_cross_document_dedup() {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new(
                "doc-a",
                "https://news.example/a",
                "Spring AI integrates DeepSeek to build translation agents.",
            ),
            Document::new(
                "doc-b",
                "https://blog.example/b",
                "Spring AI now integrates DeepSeek for multilingual translation agents.",
            ),
        ],
    );
    let extractor = MockExtractor::new()
        .with_response("doc-a", "<tag>Tech</tag>Spring AI integrates DeepSeek to build translation agents")
        .with_response(
            "doc-b",
            "<tag>Tech</tag>Spring AI now integrates DeepSeek for multilingual translation agents",
        );

    let report = Engine::new(extractor).run(&batch, 2).await.unwrap();

    assert_eq!(report.total_facts_considered(), 2);
    assert_eq!(report.facts().len(), 1);
    assert_eq!(report.clusters().len(), 1);
    let entry = &report.facts()[0];
    assert_eq!(entry.member_count, 2);
    let sources: Vec<&str> = entry.source_document_ids.iter().map(DocumentId::as_str).collect();
    assert_eq!(sources, vec!["doc-a", "doc-b"]);
}

#[tokio::test]
async fn test_no_information() {
    let extractor = MockExtractor::new().with_response("doc-1", "None");
    let report = Engine::new(extractor)
        .run(&single_doc_batch(POLICY_DOC), 1)
        .await
        .unwrap();

    assert!(report.facts().is_empty());
    assert!(report.sources()[0].no_information);
    assert!(report.sources()[0].failure.is_none());
    assert_eq!(report.hallucination_rate(), 0.0);
}

#[tokio::test]
async fn test_missing_document_text() {
    let extractor = MockExtractor::new()
        .with_response("doc-1", "<tag>Policy Release</tag>Policy X was released by the council");
    let report = Engine::new(extractor).run(&single_doc_batch(""), 1).await.unwrap();

    assert!(report.sources()[0].source_unavailable);
    assert_eq!(report.facts()[0].fact.grounding, Grounding::SourceUnavailable);
    assert_eq!(report.hallucination_rate(), 1.0);
}

#[tokio::test]
async fn test_recorded_fixture() {
    let (batch, extractor) = RecordedBatch::from_json(FIXTURE).unwrap().into_parts();
    let report = Engine::new(extractor).run(&batch, 3).await.unwrap();

    // Five facts reach the checker; one is fabricated
    assert_eq!(report.total_facts_considered(), 5);
    assert_eq!(report.hallucination_count(), 1);
    assert!((report.hallucination_rate() - 0.2).abs() < 1e-9);
    assert_eq!(report.unknown_tag_count(), 1);
    assert_eq!(report.clusters().len(), 3);
    assert!(report.facts().iter().all(|e| batch.taxonomy.contains(&e.fact.tag)));
    assert_eq!(report.sources()[0].unknown_tags, vec!["Rumor"]);

    let order: Vec<String> = report.facts().iter().map(|e| e.fact.id.to_string()).collect();
    assert_eq!(order, vec!["gov-1#0", "blog-3#0", "blog-3#1"]);

    let policy = &report.facts()[0];
    let policy_sources: Vec<&str> = policy.source_document_ids.iter().map(DocumentId::as_str).collect();
    assert_eq!(policy_sources, vec!["gov-1", "news-2"]);

    let failed: Vec<&str> = report.failed_sources().map(|s| s.document_id.as_str()).collect();
    assert_eq!(failed, vec!["feed-4"]);
    assert!(report.sources()[4].no_information);

    let text = report.render_text();
    assert!(text.contains("Models: gpt-4o-mini-2024-07-18"));
    assert!(text.contains("Hallucinations: 1 of 5 facts (20.0%)"));
    assert!(text.contains("(fabricated: 2, Tencent)"));
    assert!(text.contains("- feed-4: model call failed: upstream returned 503"));
}

#[tokio::test]
async fn test_recorded_fixture_strict() {
    let (batch, extractor) = RecordedBatch::from_json(FIXTURE).unwrap().into_parts();
    let config = EngineConfig::default().with_strict_mode(true);
    let report = Engine::with_config(extractor, config).run(&batch, 3).await.unwrap();

    assert_eq!(report.facts().len(), 2);
    assert!(report.facts().iter().all(|e| e.fact.grounded));
    // The rate is unaffected by filtering
    assert!((report.hallucination_rate() - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn test_shuffled_documents_give_same_partition() {
    let recorded = RecordedBatch::from_json(FIXTURE).unwrap();

    let (batch, extractor) = recorded.clone().into_parts();
    let forward = Engine::new(extractor).run(&batch, 1).await.unwrap();

    let mut shuffled = recorded;
    shuffled.documents.reverse();
    shuffled.extractions.rotate_left(2);
    let (batch, extractor) = shuffled.into_parts();
    let backward = Engine::new(extractor).run(&batch, 4).await.unwrap();

    let partition = |clusters: &[focus_engine::EventCluster]| -> BTreeSet<Vec<String>> {
        clusters
            .iter()
            .map(|c| c.member_fact_ids.iter().map(|id| id.to_string()).collect())
            .collect()
    };
    assert_eq!(partition(forward.clusters()), partition(backward.clusters()));
    assert_eq!(forward.hallucination_rate(), backward.hallucination_rate());

    // Only the order of emitted facts follows document order
    let first: Vec<String> = backward.facts().iter().map(|e| e.fact.id.to_string()).collect();
    assert_eq!(first, vec!["blog-3#0", "blog-3#1", "gov-1#0"]);
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let documents: Vec<Document> = (0..8)
        .map(|i| Document::new(format!("doc-{}", i), "https://example.com", POLICY_DOC))
        .collect();
    let batch = Batch::new(policy_taxonomy(), documents);
    let extractor = MockExtractor::new().with_default_delay(Duration::from_millis(20));

    let engine = Engine::new(extractor);
    let report = engine.run(&batch, 3).await.unwrap();

    assert_eq!(report.sources().len(), 8);
    assert_eq!(engine.extractor().calls().len(), 8);
    assert!(engine.extractor().max_in_flight() <= 3);
    assert!(engine.extractor().max_in_flight() >= 2);
}

#[tokio::test]
async fn test_results_in_any_order_keep_batch_order() {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new("slow", "https://a.example", POLICY_DOC),
            Document::new("fast", "https://b.example", "Spring AI integrates DeepSeek for translation agents."),
        ],
    );
    let extractor = MockExtractor::new()
        .with_response("slow", "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X.")
        .with_response("fast", "<tag>Tech</tag>Spring AI integrates DeepSeek for translation agents")
        .with_delay("slow", Duration::from_millis(50));

    let report = Engine::new(extractor).run(&batch, 2).await.unwrap();
    let order: Vec<&str> = report.facts().iter().map(|e| e.fact.source_document_id.as_str()).collect();
    assert_eq!(order, vec!["slow", "fast"]);
}

#[tokio::test]
async fn test_call_timeout_is_a_document_failure() {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new("slow", "https://a.example", POLICY_DOC),
            Document::new("ok", "https://b.example", POLICY_DOC),
        ],
    );
    let extractor = MockExtractor::new()
        .with_response("ok", "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X.")
        .with_delay("slow", Duration::from_secs(5));
    let config = EngineConfig::default().with_call_timeout(Duration::from_millis(50));

    let report = Engine::with_config(extractor, config).run(&batch, 2).await.unwrap();
    assert_eq!(
        report.sources()[0].failure.as_deref(),
        Some("model call timed out after 50 ms")
    );
    assert_eq!(report.facts().len(), 1);
}

#[tokio::test]
async fn test_every_document_failing_fails_the_batch() {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new("a", "https://a.example", POLICY_DOC),
            Document::new("b", "https://b.example", POLICY_DOC),
        ],
    );
    let extractor = MockExtractor::new()
        .with_failure("a", ExtractorError::Call("503".into()))
        .with_failure("b", ExtractorError::EmptyResponse);

    let err = Engine::new(extractor).run(&batch, 2).await.unwrap_err();
    assert!(matches!(err, EngineError::NoExtractableContent { documents: 2 }));
}

#[tokio::test]
async fn test_empty_batch_gives_empty_report() {
    let batch = Batch::new(policy_taxonomy(), vec![]);
    let report = Engine::new(MockExtractor::new()).run(&batch, 4).await.unwrap();
    assert!(report.facts().is_empty());
    assert_eq!(report.total_facts_considered(), 0);
}

fn cancellable_batch() -> (Batch, MockExtractor) {
    let batch = Batch::new(
        policy_taxonomy(),
        vec![
            Document::new("fast", "https://a.example", POLICY_DOC),
            Document::new("stuck", "https://b.example", POLICY_DOC),
        ],
    );
    let extractor = MockExtractor::new()
        .with_response("fast", "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X.")
        .with_delay("stuck", Duration::from_secs(30));
    (batch, extractor)
}

#[tokio::test]
async fn test_cancellation_discards_results() {
    let (batch, extractor) = cancellable_batch();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = Engine::new(extractor)
        .run_with_cancel(&batch, 2, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(err.code(), "cancelled");
}

#[tokio::test]
async fn test_best_effort_cancellation_gives_partial_report() {
    let (batch, extractor) = cancellable_batch();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let config = EngineConfig::default().with_best_effort(true);
    let report = Engine::with_config(extractor, config)
        .run_with_cancel(&batch, 2, cancel)
        .await
        .unwrap();

    assert!(report.is_partial());
    assert_eq!(report.facts().len(), 1);
    assert_eq!(
        report.sources()[1].failure.as_deref(),
        Some("cancelled before completion")
    );
    assert!(report.render_text().contains("(partial)"));
}

#[tokio::test]
async fn test_best_effort_with_nothing_finished_is_cancelled() {
    let (batch, extractor) = cancellable_batch();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = EngineConfig::default().with_best_effort(true);
    let err = Engine::with_config(extractor, config)
        .run_with_cancel(&batch, 2, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}
