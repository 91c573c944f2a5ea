//! The extraction and verification pipeline.
//!
//! Leaf-first:
//! - Tag parsing of raw model output
//! - Taxonomy validation
//! - Groundedness checking against the source text
//! - Event deduplication (union-find over candidate pairs)
//! - Report aggregation
//! - The batch engine that drives an extractor across documents

pub mod batch;
pub mod dedup;
pub mod engine;
pub mod grounding;
pub mod parse;
pub mod prompts;
pub mod report;
pub mod terms;
pub mod validate;

pub use batch::{assemble_report, process_batch, process_document, DocumentOutcome};
pub use dedup::{deduplicate, overlap_coefficient, verify_partition, DedupOutcome};
pub use engine::Engine;
pub use grounding::{
    check_groundedness, filter_grounded, GroundednessChecker, GroundingTally, SourceIndex,
};
pub use parse::{parse_tagged_response, ParseOutcome, TaggedItem};
pub use prompts::{
    extract_prompt_hash, format_extract_prompt, Language, EXTRACT_PROMPT_EN, EXTRACT_PROMPT_ZH,
};
pub use report::build_report;
pub use terms::{token_set, ClaimTerms, DateClaim};
pub use validate::{validate_tags, ValidationOutcome};
