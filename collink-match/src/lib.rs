//! collink-match: specimen collector name reconciliation
//!
//! Attributes digitized specimens to the people who collected them by
//! matching free-text collector names from occurrence records against
//! person identities in external authority databases.
//!
//! - [`names`]: splitting collector strings and classifying name quality
//! - [`services`]: occurrence harvesting, person matching, SPARQL bridge
//! - [`workflow`]: the harvest → classify → match → verify pipeline

pub mod error;
pub mod names;
pub mod services;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{ReconcileError, ReconcileResult};
pub use crate::names::{classify, split, split_collectors, DelimiterPattern};
pub use crate::types::{
    CollectorSet, DetailPerson, MatchOutcome, MatchRecord, NameQuality, Person, ScoredPerson,
    VerifiedMatch,
};
