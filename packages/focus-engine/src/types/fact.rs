//! Fact types - the central entity flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::document::DocumentId;

/// Identifier of a fact: its document plus its position among that
/// document's validated facts.
///
/// Independent of document arrival order, so the same batch always yields
/// the same ids. The derived `Ord` (document id, then ordinal) is the
/// canonical ordering used by the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactId {
    pub document_id: DocumentId,
    pub ordinal: u32,
}

impl FactId {
    pub fn new(document_id: DocumentId, ordinal: u32) -> Self {
        Self {
            document_id,
            ordinal,
        }
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document_id, self.ordinal)
    }
}

/// Verdict of the groundedness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Grounding {
    /// Every checkable term was found in the source text
    Verified { checked: usize },

    /// The summary has no checkable terms (purely qualitative)
    Unverifiable,

    /// At least one checkable term is absent from the source text
    Fabricated { missing: Vec<String> },

    /// The source document had no text to check against
    SourceUnavailable,
}

impl Grounding {
    /// Whether the fact counts as grounded.
    ///
    /// Unverifiable facts pass; source-unavailable facts do not.
    pub fn is_grounded(&self) -> bool {
        matches!(self, Self::Verified { .. } | Self::Unverifiable)
    }

    pub fn is_unverifiable(&self) -> bool {
        matches!(self, Self::Unverifiable)
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable)
    }

    /// Short label for text reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::Unverifiable => "unverifiable",
            Self::Fabricated { .. } => "fabricated",
            Self::SourceUnavailable => "source unavailable",
        }
    }
}

/// Identifier of an event cluster within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parsed, taxonomy-validated, groundedness-checked unit of
/// information tied to one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,

    /// Focus point name (always present in the run's taxonomy)
    pub tag: String,

    pub summary: String,

    pub source_document_id: DocumentId,

    pub extracted_at: DateTime<Utc>,

    /// Shorthand for `grounding.is_grounded()`
    pub grounded: bool,

    pub grounding: Grounding,

    /// Set by the deduplicator
    #[serde(default)]
    pub cluster_id: Option<ClusterId>,
}

impl Fact {
    /// Create a checked fact that has not been clustered yet.
    pub fn new(
        id: FactId,
        tag: impl Into<String>,
        summary: impl Into<String>,
        extracted_at: DateTime<Utc>,
        grounding: Grounding,
    ) -> Self {
        Self {
            source_document_id: id.document_id.clone(),
            id,
            tag: tag.into(),
            summary: summary.into(),
            extracted_at,
            grounded: grounding.is_grounded(),
            grounding,
            cluster_id: None,
        }
    }
}

/// A set of facts judged to describe the same real-world event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCluster {
    pub cluster_id: ClusterId,
    pub canonical_fact_id: FactId,
    pub member_fact_ids: BTreeSet<FactId>,
}

impl EventCluster {
    pub fn len(&self) -> usize {
        self.member_fact_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_fact_ids.is_empty()
    }

    pub fn contains(&self, id: &FactId) -> bool {
        self.member_fact_ids.contains(id)
    }
}
