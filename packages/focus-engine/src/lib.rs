//! Focus-Driven Extraction & Verification Engine
//!
//! Turns raw per-document model output into a verified, deduplicated set of
//! facts tagged by focus point, with a hallucination score per batch.
//!
//! # Design
//!
//! - The model call is the only non-deterministic step, behind the
//!   [`Extractor`] trait
//! - Parsing, validation, groundedness and clustering are pure and
//!   repeatable, so they can be tested with fixed strings
//! - The taxonomy is an immutable value threaded through each batch, never
//!   a global
//! - Clustering is transitive (union-find) and independent of arrival order
//!
//! # Usage
//!
//! ```rust,ignore
//! use focus_engine::{Batch, Document, Engine, FocusPoint, Taxonomy};
//! use focus_engine::testing::MockExtractor;
//! use std::sync::Arc;
//!
//! let taxonomy = Arc::new(Taxonomy::new([
//!     FocusPoint::new("Policy Release", "new policies from government bodies"),
//! ])?);
//! let batch = Batch::new(taxonomy, vec![
//!     Document::new("doc-1", "https://gov.example/x", "On 2024-02-01, the State Council released Policy X."),
//! ]);
//!
//! let extractor = MockExtractor::new().with_response(
//!     "doc-1",
//!     "<tag>Policy Release</tag>On 2024-02-01, the State Council released Policy X.",
//! );
//! let report = Engine::new(extractor).run(&batch, 4).await?;
//! assert_eq!(report.hallucination_rate(), 0.0);
//! println!("{}", report.render_text());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - The `Extractor` seam for model calls
//! - [`types`] - Documents, taxonomy, facts, config and reports
//! - [`pipeline`] - Parser, validator, checker, deduplicator, aggregator, engine
//! - [`extractors`] - Replay of recorded model output
//! - [`testing`] - Mock extractor for tests

pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{EngineError, ExtractorError, ExtractorResult, Result};
pub use extractors::{RecordedBatch, RecordedCall, ReplayExtractor};
pub use pipeline::{process_batch, Engine};
pub use traits::extractor::Extractor;
pub use types::{
    batch::Batch,
    config::{DedupConfig, EngineConfig, GroundingConfig, ParseConfig},
    document::{Document, DocumentId, RawExtraction},
    fact::{ClusterId, EventCluster, Fact, FactId, Grounding},
    report::{BatchReport, ReportEntry, ReportStatus, SourceStats},
    taxonomy::{FocusPoint, Taxonomy},
};
