//! Groundedness checking.
//!
//! Decides locally, without another model call, whether a fact's summary is
//! supported by its source document. Every date, number, quoted span and
//! proper-noun-like phrase in the summary must be present in the source.

use std::collections::HashSet;

use crate::pipeline::terms::{is_cjk, normalize, ClaimTerms, DateClaim};
use crate::types::config::GroundingConfig;
use crate::types::document::Document;
use crate::types::fact::{Fact, Grounding};

/// Precomputed view of a document's text for repeated checks.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    /// Normalized text padded with spaces for whole-word lookups
    padded: String,
    dates: Vec<DateClaim>,
    numbers: HashSet<String>,
}

impl SourceIndex {
    pub fn new(text: &str) -> Self {
        let terms = ClaimTerms::extract(text);

        // Digits inside dates and standalone years are dates, not amounts
        Self {
            padded: format!(" {} ", normalize(text)),
            dates: terms.dates,
            numbers: terms.numbers.into_iter().collect(),
        }
    }

    pub fn has_number(&self, number: &str) -> bool {
        self.numbers.contains(number)
    }

    pub fn has_date(&self, date: &DateClaim) -> bool {
        self.dates.iter().any(|source| date.is_supported_by(source))
    }

    /// Case-insensitive, punctuation-normalized phrase lookup.
    ///
    /// Latin phrases must sit on word boundaries; phrases containing CJK
    /// characters are matched as substrings.
    pub fn has_phrase(&self, phrase: &str) -> bool {
        let needle = normalize(phrase);
        if needle.is_empty() {
            return true;
        }
        if needle.chars().any(is_cjk) {
            self.padded.contains(&needle)
        } else {
            self.padded.contains(&format!(" {} ", needle))
        }
    }
}

/// Checks summaries against one document.
#[derive(Debug, Clone)]
pub struct GroundednessChecker<'a> {
    source: Option<SourceIndex>,
    config: &'a GroundingConfig,
}

impl<'a> GroundednessChecker<'a> {
    /// Build a checker; a document without text yields `SourceUnavailable`
    /// for every summary.
    pub fn for_document(document: &Document, config: &'a GroundingConfig) -> Self {
        let source = (!document.is_text_missing()).then(|| SourceIndex::new(&document.text));
        Self { source, config }
    }

    pub fn check(&self, summary: &str) -> Grounding {
        let Some(source) = &self.source else {
            return Grounding::SourceUnavailable;
        };

        let terms = ClaimTerms::extract(summary);
        let mut checked = 0;
        let mut missing = Vec::new();

        if self.config.check_dates {
            for date in &terms.dates {
                checked += 1;
                if !source.has_date(date) {
                    missing.push(date.to_string());
                }
            }
        }

        if self.config.check_numbers {
            for number in &terms.numbers {
                checked += 1;
                if !source.has_number(number) {
                    missing.push(number.clone());
                }
            }
        }

        if self.config.check_entities {
            for phrase in terms.quoted.iter().chain(terms.entities.iter()) {
                checked += 1;
                if !source.has_phrase(phrase) {
                    missing.push(phrase.clone());
                }
            }
        }

        if self.config.check_leading_words {
            for word in &terms.leading_words {
                checked += 1;
                if !source.has_phrase(word) {
                    missing.push(word.clone());
                }
            }
        }

        if checked == 0 {
            Grounding::Unverifiable
        } else if missing.is_empty() {
            Grounding::Verified { checked }
        } else {
            Grounding::Fabricated { missing }
        }
    }
}

/// Check a single summary against a document.
pub fn check_groundedness(summary: &str, document: &Document, config: &GroundingConfig) -> Grounding {
    GroundednessChecker::for_document(document, config).check(summary)
}

/// Counts over the facts considered by the checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundingTally {
    pub considered: usize,
    pub hallucinations: usize,
    pub unverifiable: usize,
    pub source_unavailable: usize,
}

impl GroundingTally {
    pub fn from_facts<'f>(facts: impl IntoIterator<Item = &'f Fact>) -> Self {
        let mut tally = Self::default();
        for fact in facts {
            tally.considered += 1;
            if !fact.grounded {
                tally.hallucinations += 1;
            }
            if fact.grounding.is_unverifiable() {
                tally.unverifiable += 1;
            }
            if fact.grounding.is_source_unavailable() {
                tally.source_unavailable += 1;
            }
        }
        tally
    }

    /// `hallucinations / considered`, 0 when nothing was considered.
    pub fn rate(&self) -> f64 {
        if self.considered == 0 {
            0.0
        } else {
            self.hallucinations as f64 / self.considered as f64
        }
    }
}

/// Keep only grounded facts.
pub fn filter_grounded(facts: Vec<Fact>) -> Vec<Fact> {
    facts.into_iter().filter(|f| f.grounded).collect()
}
