//! Document types - source documents and raw model output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a source document, assigned by the acquisition layer.
///
/// Ordered lexicographically; that order is the fixed tie-break used when
/// choosing canonical facts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A normalized document produced by the acquisition layer.
///
/// Immutable once created; the engine only ever borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier
    pub id: DocumentId,

    /// Where the document came from (URL, feed item, account handle)
    pub source_uri: String,

    /// Extracted plain text; may be empty when acquisition failed
    #[serde(default)]
    pub text: String,

    /// When the document was fetched
    pub fetched_at: DateTime<Utc>,

    /// Title if the source had one
    #[serde(default)]
    pub title: Option<String>,
}

impl Document {
    /// Create a new document fetched now.
    pub fn new(
        id: impl Into<String>,
        source_uri: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new(id),
            source_uri: source_uri.into(),
            text: text.into(),
            fetched_at: Utc::now(),
            title: None,
        }
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// True when there is no text to verify facts against.
    pub fn is_text_missing(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Output of one model call for one document.
///
/// Consumed once by the tag parser; only its cost metadata survives into
/// the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtraction {
    pub document_id: DocumentId,

    /// Model that produced the response
    pub model_name: String,

    /// Raw response text in the tagged-line format
    pub raw_text: String,

    /// Wall-clock cost of the call in seconds
    #[serde(default)]
    pub time_cost: f64,

    #[serde(default)]
    pub tokens_prompt: u32,

    #[serde(default)]
    pub tokens_completion: u32,
}

impl RawExtraction {
    /// Create a raw extraction with zero cost metadata.
    pub fn new(
        document_id: impl Into<String>,
        model_name: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            document_id: DocumentId::new(document_id),
            model_name: model_name.into(),
            raw_text: raw_text.into(),
            time_cost: 0.0,
            tokens_prompt: 0,
            tokens_completion: 0,
        }
    }

    /// Set the call cost.
    pub fn with_cost(mut self, time_cost: f64, tokens_prompt: u32, tokens_completion: u32) -> Self {
        self.time_cost = time_cost;
        self.tokens_prompt = tokens_prompt;
        self.tokens_completion = tokens_completion;
        self
    }
}
