//! Tag parser for raw extraction responses.
//!
//! The extraction prompt asks the model for one `<tag>LABEL</tag>SUMMARY`
//! item per line, or the bare "no information" sentinel. Models drift from
//! that format, so the parser is lenient about delimiter case, list markers
//! and several items on one line, and strict about everything it keeps.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::config::ParseConfig;

lazy_static! {
    static ref TAG_OPEN: Regex = Regex::new(r"(?i)<\s*tag\s*>").unwrap();
    static ref TAG_CLOSE: Regex = Regex::new(r"(?i)<\s*/\s*tag\s*>").unwrap();
}

const TRAILING_QUOTES: &[char] = &['"', '”'];
const LEADING_SEPARATORS: &[char] = &[':', '：'];

/// One `(tag, summary)` record, label not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedItem {
    pub tag: String,
    pub summary: String,
}

impl TaggedItem {
    pub fn new(tag: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            summary: summary.into(),
        }
    }
}

/// Result of parsing one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Items in response order
    pub items: Vec<TaggedItem>,

    /// Malformed, no-information or too-short items
    pub skipped: usize,

    /// Consecutive repeats collapsed into the previous item
    pub duplicates: usize,

    /// The whole response was the "no information" sentinel
    pub no_information: bool,
}

/// Parse a raw response into tagged items.
///
/// Never fails: bad items are counted in `skipped` and the rest are kept.
pub fn parse_tagged_response(raw: &str, config: &ParseConfig) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    if raw.trim() == config.sentinel {
        outcome.no_information = true;
        return outcome;
    }

    for line in raw.lines() {
        let openers: Vec<_> = TAG_OPEN.find_iter(line).collect();

        // Anything before the first opener (list markers, prose) is ignored
        for (i, open) in openers.iter().enumerate() {
            let end = openers.get(i + 1).map_or(line.len(), |next| next.start());
            let segment = &line[open.end()..end];

            match parse_segment(segment, config) {
                Some(item) => {
                    if outcome.items.last() == Some(&item) {
                        outcome.duplicates += 1;
                    } else {
                        outcome.items.push(item);
                    }
                }
                None => outcome.skipped += 1,
            }
        }
    }

    if outcome.skipped > 0 || outcome.duplicates > 0 {
        debug!(
            items = outcome.items.len(),
            skipped = outcome.skipped,
            duplicates = outcome.duplicates,
            "Parsed response with skips"
        );
    }

    outcome
}

/// Parse the text following one opening delimiter.
fn parse_segment(segment: &str, config: &ParseConfig) -> Option<TaggedItem> {
    let Some(close) = TAG_CLOSE.find(segment) else {
        debug!(segment, "Skipping item without closing tag");
        return None;
    };

    let tag = segment[..close.start()].trim();
    let summary = clean_summary(&segment[close.end()..]);

    if tag.is_empty() || summary.is_empty() {
        debug!(segment, "Skipping item with empty label or summary");
        return None;
    }

    if config
        .no_info_markers
        .iter()
        .any(|marker| starts_with_marker(summary, marker))
    {
        debug!(tag, summary, "Skipping no-information item");
        return None;
    }

    if summary.chars().count() < config.min_summary_chars {
        debug!(tag, summary, "Skipping too-short item");
        return None;
    }

    Some(TaggedItem::new(tag, summary))
}

/// Prefix match; Latin markers must end on a word boundary so "None" does
/// not swallow "Nonetheless".
fn starts_with_marker(summary: &str, marker: &str) -> bool {
    let Some(rest) = summary.strip_prefix(marker) else {
        return false;
    };
    if marker.is_empty() {
        return false;
    }
    let latin_end = marker.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());
    !latin_end || !rest.chars().next().is_some_and(|c| c.is_alphanumeric())
}

fn clean_summary(text: &str) -> &str {
    let mut summary = text
        .trim_start_matches(|c: char| LEADING_SEPARATORS.contains(&c) || c.is_whitespace())
        .trim_end();
    while let Some(stripped) = summary.strip_suffix(TRAILING_QUOTES) {
        summary = stripped.trim_end();
    }
    summary
}
