//! External service clients
//!
//! - `occurrence_client`: occurrence search harvesting and species labels
//! - `person_matcher`: fuzzy person matching and strict verification
//! - `knowledge_base`: SPARQL queries and identifier extraction

pub mod http;
pub mod knowledge_base;
pub mod occurrence_client;
pub mod person_matcher;

pub use knowledge_base::{extract_identifier, KnowledgeBaseClient, SparqlResults, SparqlRow};
pub use occurrence_client::{OccurrenceClient, OccurrencePage, OccurrencePages, OccurrenceQuery};
pub use person_matcher::{PersonMatcher, DEFAULT_CUTOFF_SCORE, DEFAULT_VERIFY_INTERVAL};
