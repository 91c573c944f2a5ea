//! Property tests for the pure pipeline stages.

use chrono::{TimeZone, Utc};
use focus_engine::pipeline::{
    check_groundedness, deduplicate, parse_tagged_response, verify_partition, GroundingTally,
    TaggedItem,
};
use focus_engine::testing::MockExtractor;
use focus_engine::{
    Batch, DedupConfig, Document, DocumentId, Engine, Fact, FactId, FocusPoint, Grounding,
    GroundingConfig, ParseConfig, Taxonomy,
};
use proptest::prelude::*;
use std::sync::Arc;

const WORDS: &[&str] = &[
    "Spring", "AI", "DeepSeek", "integrates", "translation", "agents", "State", "Council",
    "released", "Policy", "X", "on", "2024-02-01", "the", "30", "schools", "Tencent", "raised",
    "$2", "billion", "OpenAI", "launched", "model", "in", "March",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 3..10).prop_map(|words| words.join(" "))
}

fn raw_line() -> impl Strategy<Value = String> {
    prop_oneof![
        sentence().prop_map(|s| format!("<tag>Tech</tag>{}", s)),
        sentence().prop_map(|s| format!("- <TAG> Policy Release </TAG>: {}\"", s)),
        sentence().prop_map(|s| format!("<tag>Tech</tag>{}<tag>Tech</tag>None", s)),
        "[a-zA-Z0-9 :\"<>/.]{0,40}",
        Just("None".to_string()),
    ]
}

fn render(items: &[TaggedItem]) -> String {
    items
        .iter()
        .map(|item| format!("<tag>{}</tag>{}", item.tag, item.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fact(doc: usize, ordinal: u32, summary: &str, grounding: Grounding) -> Fact {
    Fact::new(
        FactId::new(DocumentId::new(format!("doc-{}", doc)), ordinal),
        "Tech",
        summary,
        Utc.with_ymd_and_hms(2024, 2, 2, 8, 0, 0).unwrap(),
        grounding,
    )
}

proptest! {
    #[test]
    fn parse_is_idempotent(lines in prop::collection::vec(raw_line(), 0..8)) {
        let config = ParseConfig::default();
        let first = parse_tagged_response(&lines.join("\n"), &config);
        let second = parse_tagged_response(&render(&first.items), &config);

        prop_assert_eq!(&second.items, &first.items);
        prop_assert_eq!(second.skipped, 0);
        prop_assert_eq!(second.duplicates, 0);
    }

    #[test]
    fn dedup_ignores_arrival_order(
        summaries in prop::collection::vec(sentence(), 1..12),
        seed in any::<u64>(),
    ) {
        let facts: Vec<Fact> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| fact(i % 3, (i / 3) as u32, s, Grounding::Unverifiable))
            .collect();

        let mut shuffled = facts.clone();
        let len = shuffled.len();
        for i in (1..len).rev() {
            let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        let config = DedupConfig::default();
        let forward = deduplicate(facts, &config).unwrap();
        let backward = deduplicate(shuffled, &config).unwrap();

        prop_assert_eq!(&forward.clusters, &backward.clusters);
        prop_assert!(verify_partition(&backward.facts, &backward.clusters).is_ok());
        let members: usize = forward.clusters.iter().map(|c| c.len()).sum();
        prop_assert_eq!(members, len);
    }

    #[test]
    fn hallucination_rate_is_a_fraction(
        source in sentence(),
        summaries in prop::collection::vec(sentence(), 0..10),
    ) {
        let document = Document::new("doc-0", "https://example.com", source);
        let config = GroundingConfig::default();
        let facts: Vec<Fact> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| fact(0, i as u32, s, check_groundedness(s, &document, &config)))
            .collect();

        let tally = GroundingTally::from_facts(&facts);
        prop_assert!(tally.hallucinations <= tally.considered);
        prop_assert!((0.0..=1.0).contains(&tally.rate()));
    }

    #[test]
    fn engine_report_ignores_document_order(
        summaries in prop::collection::vec(sentence(), 1..6),
    ) {
        let taxonomy = Arc::new(Taxonomy::new([FocusPoint::new("Tech", "")]).unwrap());
        let documents: Vec<Document> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| Document::new(format!("doc-{}", i), "https://example.com", s.clone()))
            .collect();
        let extractor = summaries.iter().enumerate().fold(MockExtractor::new(), |mock, (i, s)| {
            mock.with_response(format!("doc-{}", i), format!("<tag>Tech</tag>{}", s))
        });

        let mut reversed = documents.clone();
        reversed.reverse();

        let engine = Engine::new(extractor);
        let forward = tokio_test::block_on(engine.run(&Batch::new(taxonomy.clone(), documents), 3)).unwrap();
        let backward = tokio_test::block_on(engine.run(&Batch::new(taxonomy, reversed), 3)).unwrap();

        prop_assert_eq!(forward.clusters(), backward.clusters());
        prop_assert_eq!(forward.hallucination_rate(), backward.hallucination_rate());
        prop_assert_eq!(forward.facts().len(), backward.facts().len());
    }
}
