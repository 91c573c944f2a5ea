//! Claim terms - the checkable and salient parts of a summary.
//!
//! Recognizes dates, numbers, quoted spans and proper-noun-like phrases.
//! The same scanner feeds the groundedness checker (every term must be in
//! the source) and the deduplicator (shared terms mark the same event).

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

const MONTH_PATTERN: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

lazy_static! {
    // 2024年2月1日, 2024年2月, 2024年
    static ref CJK_DATE: Regex = Regex::new(
        r"(\d{4})\s*年\s*(?:(\d{1,2})\s*月\s*(?:(\d{1,2})\s*[日号])?)?"
    ).unwrap();

    // 2024-02-01, 2024/2/1, 2024.02.01, 2024-02
    static ref NUMERIC_DATE: Regex = Regex::new(
        r"(\d{4})[-/.](\d{1,2})(?:[-/.](\d{1,2}))?"
    ).unwrap();

    // 20240201
    static ref COMPACT_DATE: Regex = Regex::new(r"(\d{4})(\d{2})(\d{2})").unwrap();

    // 1 February 2024
    static ref DAY_MONTH_YEAR: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{}\.?,?\s+(\d{{4}})\b",
        MONTH_PATTERN
    )).unwrap();

    // February 1, 2024 / February 2024
    static ref MONTH_DAY_YEAR: Regex = Regex::new(&format!(
        r"(?i)\b{}\.?\s+(?:(\d{{1,2}})(?:st|nd|rd|th)?,?\s+)?(\d{{4}})\b",
        MONTH_PATTERN
    )).unwrap();

    static ref NUMBER: Regex = Regex::new(r"\d+(?:[.,]\d+)*").unwrap();

    static ref QUOTED: Regex = Regex::new(
        r#""([^"\n]{1,120})"|“([^”\n]{1,120})”|《([^》\n]{1,120})》|「([^」\n]{1,120})」|『([^』\n]{1,120})』"#
    ).unwrap();

    static ref WORD: Regex = Regex::new(r"[A-Za-z][A-Za-z0-9'’&.\-]*[A-Za-z0-9]|[A-Za-z]").unwrap();

    static ref POSSESSIVE: Regex = Regex::new(r"['’]s\b").unwrap();

    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "the", "on", "in", "at", "by", "for", "of", "to", "and", "or", "but",
        "with", "from", "into", "as", "is", "are", "was", "were", "be", "been", "has",
        "have", "had", "will", "would", "can", "could", "this", "that", "these", "those",
        "it", "its", "he", "she", "they", "we", "i", "you", "his", "her", "their", "our",
        "there", "then", "than", "when", "while", "since", "after", "before", "during",
        "according", "meanwhile", "however", "also", "about", "over", "under", "per",
        "via", "so", "not", "no", "if", "which", "who", "what", "where", "how",
        "additionally", "separately", "furthermore", "moreover", "overall", "recently",
        "today", "yesterday",
    ]
    .into_iter()
    .collect();
}

const SENTENCE_BREAKS: &[char] = &['.', '!', '?', ':', ';', '\n', '。', '！', '？', '：', '；'];

/// A date stated in text, at the granularity the text states it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateClaim {
    pub year: u16,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl DateClaim {
    /// Build a date, rejecting impossible months and days.
    pub fn new(year: u16, month: Option<u8>, day: Option<u8>) -> Option<Self> {
        if !(1000..=2999).contains(&year) {
            return None;
        }
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return None;
            }
        }
        match (month, day) {
            (None, Some(_)) => return None,
            (_, Some(d)) if !(1..=31).contains(&d) => return None,
            _ => {}
        }
        Some(Self { year, month, day })
    }

    /// Whether a date found in the source supports this claimed date.
    ///
    /// Years must match. A claimed month needs the same month in the source;
    /// days are compared only when both sides state one.
    pub fn is_supported_by(&self, source: &DateClaim) -> bool {
        if self.year != source.year {
            return false;
        }
        match (self.month, source.month) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) if a != b => false,
            _ => match (self.day, source.day) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            },
        }
    }
}

impl fmt::Display for DateClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(m) = self.month {
            write!(f, "-{:02}", m)?;
        }
        if let Some(d) = self.day {
            write!(f, "-{:02}", d)?;
        }
        Ok(())
    }
}

/// Checkable terms found in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTerms {
    pub dates: Vec<DateClaim>,

    /// Normalized numbers (thousands separators removed)
    pub numbers: Vec<String>,

    /// Quoted spans as written
    pub quoted: Vec<String>,

    /// Proper-noun-like phrases as written
    pub entities: Vec<String>,

    /// Single capitalized words opening a sentence, as written
    ///
    /// These may be names or ordinary words; the checker only needs their
    /// lower-cased form somewhere in the source.
    pub leading_words: Vec<String>,
}

impl ClaimTerms {
    /// Scan text for claim terms.
    ///
    /// Quoted spans are taken first, then dates, then numbers; each stage
    /// skips text already consumed by an earlier one.
    pub fn extract(text: &str) -> Self {
        let mut covered = Covered::default();
        let mut terms = Self {
            quoted: scan_quoted(text, &mut covered),
            ..Default::default()
        };
        terms.dates = scan_dates(text, &mut covered);

        for m in NUMBER.find_iter(text) {
            if covered.overlaps(&m.range()) {
                continue;
            }
            let raw = m.as_str();
            if let Some(year) = standalone_year(raw) {
                push_unique(&mut terms.dates, year);
            } else {
                push_unique(&mut terms.numbers, normalize_number(raw));
            }
        }

        let (entities, leading_words) = scan_entities(text, &covered);
        terms.entities = entities;
        terms.leading_words = leading_words;
        terms
    }

    /// Total number of checkable terms.
    pub fn len(&self) -> usize {
        self.dates.len()
            + self.numbers.len()
            + self.quoted.len()
            + self.entities.len()
            + self.leading_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized salient terms, comparable across summaries.
    pub fn salient(&self) -> BTreeSet<String> {
        let mut salient: BTreeSet<String> = self.dates.iter().map(|d| d.to_string()).collect();
        salient.extend(self.numbers.iter().cloned());
        salient.extend(
            self.quoted
                .iter()
                .chain(self.entities.iter())
                .map(|t| normalize(t))
                .filter(|t| !t.is_empty()),
        );
        salient
    }
}

/// Lower-case, drop possessive `'s`, turn punctuation into single spaces.
pub fn normalize(text: &str) -> String {
    let text = POSSESSIVE.replace_all(text, "");
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalized content tokens used for similarity.
///
/// Latin words minus stop words, numbers in normalized form, and CJK
/// character bigrams.
pub fn token_set(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for word in normalize(text).split(' ').filter(|w| !w.is_empty()) {
        if word.chars().any(is_cjk) {
            push_cjk_tokens(word, &mut tokens);
        } else if word.chars().all(|c| c.is_ascii_digit()) {
            tokens.insert(normalize_number(word));
        } else if !STOP_WORDS.contains(word) {
            tokens.insert(word.to_string());
        }
    }
    tokens
}

/// Remove thousands separators and insignificant zeros.
pub fn normalize_number(raw: &str) -> String {
    let cleaned = raw.replace(',', "");
    let (int, frac) = match cleaned.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (cleaned.as_str(), ""),
    };
    let int = int.trim_start_matches('0');
    let int = if int.is_empty() { "0" } else { int };
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{}.{}", int, frac)
    }
}

pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{3040}'..='\u{30ff}'
        | '\u{ac00}'..='\u{d7af}'
    )
}

fn push_cjk_tokens(word: &str, tokens: &mut BTreeSet<String>) {
    let mut run: Vec<char> = Vec::new();
    let mut other = String::new();
    let flush_run = |run: &mut Vec<char>, tokens: &mut BTreeSet<String>| {
        match run.len() {
            0 => {}
            1 => {
                tokens.insert(run[0].to_string());
            }
            _ => {
                for pair in run.windows(2) {
                    tokens.insert(pair.iter().collect());
                }
            }
        }
        run.clear();
    };
    for c in word.chars() {
        if is_cjk(c) {
            if !other.is_empty() {
                tokens.insert(std::mem::take(&mut other));
            }
            run.push(c);
        } else {
            flush_run(&mut run, tokens);
            other.push(c);
        }
    }
    flush_run(&mut run, tokens);
    if !other.is_empty() {
        tokens.insert(other);
    }
}

#[derive(Debug, Default)]
struct Covered(Vec<Range<usize>>);

impl Covered {
    fn overlaps(&self, range: &Range<usize>) -> bool {
        self.0
            .iter()
            .any(|c| c.start < range.end && range.start < c.end)
    }

    fn add(&mut self, range: Range<usize>) {
        self.0.push(range);
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn digit_bounded(text: &str, range: &Range<usize>) -> bool {
    let before = text[..range.start].chars().next_back();
    let after = text[range.end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

fn group<T: FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn month_from_name(name: &str) -> Option<u8> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn standalone_year(raw: &str) -> Option<DateClaim> {
    if raw.len() != 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: u16 = raw.parse().ok()?;
    (1900..=2199)
        .contains(&year)
        .then(|| DateClaim::new(year, None, None))
        .flatten()
}

fn scan_quoted(text: &str, covered: &mut Covered) -> Vec<String> {
    let mut quoted = Vec::new();
    for caps in QUOTED.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = (1..caps.len())
            .find_map(|i| caps.get(i))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if inner.is_empty() {
            continue;
        }
        covered.add(whole.range());
        push_unique(&mut quoted, inner.to_string());
    }
    quoted
}

fn collect_dates(
    re: &Regex,
    text: &str,
    digit_guard: bool,
    covered: &mut Covered,
    dates: &mut Vec<DateClaim>,
    parse: impl Fn(&Captures<'_>) -> Option<DateClaim>,
) {
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let range = whole.range();
        if covered.overlaps(&range) || (digit_guard && !digit_bounded(text, &range)) {
            continue;
        }
        if let Some(date) = parse(&caps) {
            covered.add(range);
            push_unique(dates, date);
        }
    }
}

fn scan_dates(text: &str, covered: &mut Covered) -> Vec<DateClaim> {
    let mut dates = Vec::new();
    collect_dates(&CJK_DATE, text, true, covered, &mut dates, |c| {
        DateClaim::new(group(c, 1)?, group(c, 2), group(c, 3))
    });
    collect_dates(&NUMERIC_DATE, text, true, covered, &mut dates, |c| {
        DateClaim::new(group(c, 1)?, Some(group(c, 2)?), group(c, 3))
    });
    collect_dates(&COMPACT_DATE, text, true, covered, &mut dates, |c| {
        let year: u16 = group(c, 1)?;
        if !(1900..=2199).contains(&year) {
            return None;
        }
        DateClaim::new(year, Some(group(c, 2)?), Some(group(c, 3)?))
    });
    collect_dates(&DAY_MONTH_YEAR, text, false, covered, &mut dates, |c| {
        let month = month_from_name(c.get(2)?.as_str())?;
        DateClaim::new(group(c, 3)?, Some(month), Some(group(c, 1)?))
    });
    collect_dates(&MONTH_DAY_YEAR, text, false, covered, &mut dates, |c| {
        let month = month_from_name(c.get(1)?.as_str())?;
        DateClaim::new(group(c, 3)?, Some(month), group(c, 2))
    });
    dates
}

fn is_proper_like(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase())
}

/// Internal capitals, all caps, or digits: a name even at sentence start.
fn is_strong_name(word: &str) -> bool {
    word.chars().skip(1).any(|c| c.is_uppercase()) || word.chars().any(|c| c.is_ascii_digit())
}

/// Proper-noun-like phrases, and the lone capitalized words that open a
/// sentence (kept apart since capitalization proves nothing there).
fn scan_entities(text: &str, covered: &Covered) -> (Vec<String>, Vec<String>) {
    let mut entities = Vec::new();
    let mut leading = Vec::new();
    let mut phrase: Vec<&str> = Vec::new();
    let mut phrase_at_start = false;
    let mut last_end: Option<usize> = None;

    for m in WORD.find_iter(text) {
        let word = m.as_str();
        let gap = &text[last_end.unwrap_or(0)..m.start()];
        let at_start = last_end.is_none() || gap.contains(SENTENCE_BREAKS);
        let adjacent = !gap.is_empty() && gap.chars().all(|c| c == ' ');
        last_end = Some(m.end());

        if !adjacent || covered.overlaps(&m.range()) {
            flush_phrase(&mut phrase, phrase_at_start, &mut entities, &mut leading);
        }
        if covered.overlaps(&m.range()) {
            continue;
        }

        if is_proper_like(word) {
            if phrase.is_empty() {
                phrase_at_start = at_start;
            }
            phrase.push(word);
        } else {
            flush_phrase(&mut phrase, phrase_at_start, &mut entities, &mut leading);
        }
    }
    flush_phrase(&mut phrase, phrase_at_start, &mut entities, &mut leading);
    (entities, leading)
}

fn flush_phrase(
    phrase: &mut Vec<&str>,
    at_start: bool,
    entities: &mut Vec<String>,
    leading: &mut Vec<String>,
) {
    let leading_stops = phrase
        .iter()
        .take_while(|w| STOP_WORDS.contains(w.to_lowercase().as_str()))
        .count();
    let kept = &phrase[leading_stops..];

    let ambiguous = kept.len() == 1 && at_start && leading_stops == 0 && !is_strong_name(kept[0]);
    if ambiguous {
        push_unique(leading, kept[0].to_string());
    } else if !kept.is_empty() {
        push_unique(entities, kept.join(" "));
    }
    phrase.clear();
}
