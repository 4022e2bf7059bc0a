//! Collector name splitting and quality classification
//!
//! `recordedBy` values often hold several people joined with ad-hoc
//! delimiters ("Smith, J. & Doe, A."). Splitting turns them into candidate
//! names; classification separates names worth sending to a person matcher
//! from bare initials and single tokens.

use crate::error::ReconcileResult;
use crate::types::NameQuality;
use once_cell::sync::Lazy;
use regex::Regex;

/// Delimiters that usually separate people in a collector string
pub const DEFAULT_DELIMITERS: &str = r"&|\|| and |;";

/// Titles that keep a name in the full class regardless of shape
pub const HONORIFICS: [&str; 2] = ["Mrs", "Miss"];

static DEFAULT_PATTERN: Lazy<DelimiterPattern> = Lazy::new(|| DelimiterPattern {
    regex: Regex::new(DEFAULT_DELIMITERS).expect("default delimiter pattern is valid"),
});

static LEADING_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{2}").expect("leading letters pattern is valid"));
static TRAILING_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]{3}$").expect("trailing letters pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s").expect("whitespace pattern is valid"));

/// Compiled set of delimiter alternatives
#[derive(Debug, Clone)]
pub struct DelimiterPattern {
    regex: Regex,
}

impl DelimiterPattern {
    /// Compile a custom delimiter pattern (regex alternation)
    pub fn new(pattern: &str) -> ReconcileResult<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Split on every delimiter match and trim each piece
    ///
    /// Empty input yields a single empty piece.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.regex
            .split(text)
            .map(|piece| piece.trim().to_string())
            .collect()
    }
}

impl Default for DelimiterPattern {
    fn default() -> Self {
        DEFAULT_PATTERN.clone()
    }
}

/// Split `text` on `pattern`, trimming every piece
pub fn split(text: &str, pattern: &DelimiterPattern) -> Vec<String> {
    pattern.split(text)
}

/// Split a collector string on the default delimiters
pub fn split_collectors(text: &str) -> Vec<String> {
    DEFAULT_PATTERN.split(text)
}

impl NameQuality {
    /// Classify one candidate name
    ///
    /// Full: whitespace somewhere, a given name of at least two letters up
    /// front and three letters at the end. A single-letter initial at either
    /// end makes the name thin. An honorific overrides the shape check.
    pub fn of(name: &str) -> Self {
        if HONORIFICS.iter().any(|h| name.contains(h)) {
            return NameQuality::Full;
        }

        let well_formed = WHITESPACE.is_match(name)
            && LEADING_LETTERS.is_match(name)
            && TRAILING_LETTERS.is_match(name);

        if well_formed {
            NameQuality::Full
        } else {
            NameQuality::Thin
        }
    }
}

/// Partition names into (full, thin), keeping input order in each part
pub fn classify<I, S>(names: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut full = Vec::new();
    let mut thin = Vec::new();

    for name in names {
        let name = name.as_ref();
        match NameQuality::of(name) {
            NameQuality::Full => full.push(name.to_string()),
            NameQuality::Thin => thin.push(name.to_string()),
        }
    }

    tracing::debug!(full = full.len(), thin = thin.len(), "Classified collector names");
    (full, thin)
}
