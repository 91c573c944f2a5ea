//! Typed errors for the focus engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! the batch-level failure reason.

use thiserror::Error;

/// Batch-level failures. A caller receives either a complete
/// [`BatchReport`](crate::types::report::BatchReport) or one of these.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Every document in the batch failed at the model-call stage
    #[error("no extractable content: all {documents} documents failed extraction")]
    NoExtractableContent { documents: usize },

    /// A cluster ended up empty or without its canonical fact
    #[error("cluster contradiction in cluster {cluster_id}: {reason}")]
    ClusterContradiction { cluster_id: usize, reason: String },

    /// Batch input is inconsistent (e.g. repeated document ids)
    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },

    /// Taxonomy could not be built
    #[error("invalid taxonomy: {reason}")]
    InvalidTaxonomy { reason: String },

    /// Configuration value could not be parsed or is out of range
    #[error("config error for {key}: {reason}")]
    Config { key: String, reason: String },

    /// Batch was cancelled and best-effort mode was off
    #[error("batch cancelled")]
    Cancelled,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable reason code for callers that persist or display failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoExtractableContent { .. } => "no_extractable_content",
            Self::ClusterContradiction { .. } => "cluster_contradiction",
            Self::InvalidBatch { .. } => "invalid_batch",
            Self::InvalidTaxonomy { .. } => "invalid_taxonomy",
            Self::Config { .. } => "config",
            Self::Cancelled => "cancelled",
            Self::Json(_) => "json",
        }
    }
}

/// Failures of the external model call for a single document.
///
/// These never abort a batch on their own; they are recorded against the
/// document in the report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractorError {
    /// Model call returned an error
    #[error("model call failed: {0}")]
    Call(String),

    /// Model call exceeded the configured timeout
    #[error("model call timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Model returned an empty or whitespace-only response
    #[error("model returned an empty response")]
    EmptyResponse,

    /// Batch was cancelled before this document finished
    #[error("cancelled before completion")]
    Cancelled,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for model calls.
pub type ExtractorResult<T> = std::result::Result<T, ExtractorError>;
