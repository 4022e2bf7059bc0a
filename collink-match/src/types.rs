//! Core types for collector reconciliation
//!
//! Candidate names flow through splitting and classification as plain
//! `String`s. Matching produces `MatchRecord`s, strict verification turns
//! them into `VerifiedMatch`es.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// ============================================================================
// Names
// ============================================================================

/// Deduplicated candidate names from one harvest
///
/// Ordered only so output is deterministic; the order carries no meaning.
pub type CollectorSet = BTreeSet<String>;

/// How likely a candidate name is to resolve to one person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameQuality {
    /// Multi-word name with letter boundaries, or carrying an honorific
    Full,
    /// Bare initials, single tokens, anything else
    Thin,
}

// ============================================================================
// Person records
// ============================================================================

/// Person record returned by the fuzzy matching service
///
/// Common fields are typed; every other field is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname_reverse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Top candidate from a fuzzy lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPerson {
    pub score: f64,
    #[serde(flatten)]
    pub person: Person,
}

/// Person record returned by the strict, date-scoped search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailPerson {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Match results
// ============================================================================

/// A name whose top candidate cleared the score cutoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub original_name: String,
    pub matched_identity: Person,
    pub confidence_score: f64,
}

/// A match after strict verification
///
/// `detail_match` is absent when the strict lookup found nobody; the record
/// itself is always kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedMatch {
    #[serde(flatten)]
    pub record: MatchRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_match: Option<DetailPerson>,
}

impl VerifiedMatch {
    pub fn is_confirmed(&self) -> bool {
        self.detail_match.is_some()
    }
}

impl From<MatchRecord> for VerifiedMatch {
    fn from(record: MatchRecord) -> Self {
        Self {
            record,
            detail_match: None,
        }
    }
}

/// Fuzzy matching output: matched records and names left unmatched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub matches: Vec<MatchRecord>,
    pub unmatches: Vec<String>,
}
