//! Configuration types for parsing, verification, clustering and batching.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Sentinel the extraction prompt asks the model to answer with when a
/// document has nothing relevant.
pub const DEFAULT_NO_INFO_SENTINEL: &str = "None";

/// Configuration for the tag parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Whole-response "no relevant information" sentinel (exact match after trim).
    pub sentinel: String,

    /// Summary prefixes that mean the model found nothing for that tag.
    pub no_info_markers: Vec<String>,

    /// Summaries shorter than this many characters are skipped.
    ///
    /// Default: 7.
    pub min_summary_chars: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_NO_INFO_SENTINEL.to_string(),
            no_info_markers: vec![
                DEFAULT_NO_INFO_SENTINEL.to_string(),
                "无相关信息".to_string(),
                "该新闻未提及".to_string(),
                "未提及".to_string(),
            ],
            min_summary_chars: 7,
        }
    }
}

/// Configuration for the groundedness checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Require numbers in the summary to appear in the source.
    pub check_numbers: bool,

    /// Require dates in the summary to have a compatible source date.
    pub check_dates: bool,

    /// Require quoted spans and proper-noun-like phrases to appear in the source.
    pub check_entities: bool,

    /// Require a lone capitalized word opening a sentence to appear in the
    /// source in any case ("Microsoft", but also "Officials").
    pub check_leading_words: bool,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            check_numbers: true,
            check_dates: true,
            check_entities: true,
            check_leading_words: true,
        }
    }
}

/// Configuration for the event deduplicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum overlap coefficient `|A∩B| / min(|A|,|B|)` for two facts to
    /// be candidates for the same cluster.
    ///
    /// Default: 0.5.
    pub overlap_threshold: f32,

    /// Also require at least one shared salient term (entity, number, date).
    ///
    /// Default: true.
    pub require_shared_salient: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
            require_shared_salient: true,
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub parse: ParseConfig,

    pub grounding: GroundingConfig,

    pub dedup: DedupConfig,

    /// Drop non-grounded facts from the emitted fact list.
    ///
    /// When false (default): they are kept and carry their verdict.
    pub strict_mode: bool,

    /// On cancellation, emit a report marked partial instead of failing.
    pub best_effort: bool,

    /// Per model call timeout in milliseconds (None = no timeout).
    pub call_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Set best-effort mode.
    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the clustering overlap threshold.
    pub fn with_overlap_threshold(mut self, threshold: f32) -> Self {
        self.dedup.overlap_threshold = threshold;
        self
    }

    /// Set the "no information" sentinel.
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.parse.sentinel = sentinel.into();
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Defaults with `FOCUS_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment or any other source).
    ///
    /// Recognized keys: `FOCUS_STRICT_MODE`, `FOCUS_BEST_EFFORT`,
    /// `FOCUS_CALL_TIMEOUT_MS`, `FOCUS_OVERLAP_THRESHOLD`,
    /// `FOCUS_CHECK_LEADING_WORDS`, `FOCUS_NO_INFO_SENTINEL`,
    /// `FOCUS_MIN_SUMMARY_CHARS`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("FOCUS_STRICT_MODE") {
            self.strict_mode = parse_bool("FOCUS_STRICT_MODE", &v)?;
        }
        if let Some(v) = lookup("FOCUS_BEST_EFFORT") {
            self.best_effort = parse_bool("FOCUS_BEST_EFFORT", &v)?;
        }
        if let Some(v) = lookup("FOCUS_CALL_TIMEOUT_MS") {
            let ms = v.trim().parse::<u64>().map_err(|e| config_error("FOCUS_CALL_TIMEOUT_MS", e))?;
            self.call_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(v) = lookup("FOCUS_OVERLAP_THRESHOLD") {
            self.dedup.overlap_threshold = v
                .trim()
                .parse::<f32>()
                .map_err(|e| config_error("FOCUS_OVERLAP_THRESHOLD", e))?;
        }
        if let Some(v) = lookup("FOCUS_CHECK_LEADING_WORDS") {
            self.grounding.check_leading_words = parse_bool("FOCUS_CHECK_LEADING_WORDS", &v)?;
        }
        if let Some(v) = lookup("FOCUS_NO_INFO_SENTINEL") {
            self.parse.sentinel = v.trim().to_string();
        }
        if let Some(v) = lookup("FOCUS_MIN_SUMMARY_CHARS") {
            self.parse.min_summary_chars = v
                .trim()
                .parse::<usize>()
                .map_err(|e| config_error("FOCUS_MIN_SUMMARY_CHARS", e))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let t = self.dedup.overlap_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(EngineError::Config {
                key: "overlap_threshold".to_string(),
                reason: format!("must be in (0, 1], got {}", t),
            });
        }
        if self.parse.sentinel.is_empty() {
            return Err(EngineError::Config {
                key: "sentinel".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EngineError::Config {
            key: key.to_string(),
            reason: format!("not a boolean: {}", other),
        }),
    }
}

fn config_error(key: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::Config {
        key: key.to_string(),
        reason: err.to_string(),
    }
}
