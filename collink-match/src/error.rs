//! Error types for collink-match
//!
//! A lookup that finds nobody is not an error: it shows up as an unmatched
//! name or a missing `detail_match`. Everything here is a genuine failure.

use thiserror::Error;

/// Reconciliation error
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Request never produced a response (connect, DNS, timeout, reset)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// Service asked us to slow down (429 or 503)
    #[error("Rate limited by {url} (HTTP {status})")]
    RateLimited { status: u16, url: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Knowledge-base row without an extractable identifier
    #[error("Malformed result row: {0}")]
    MalformedRow(String),

    /// Harvest hit its page bound before the source reported the end
    #[error("Pagination stopped after {pages} pages at offset {offset} without end of records")]
    PageLimitExceeded { pages: u32, offset: u64 },

    /// Delimiter pattern failed to compile
    #[error("Invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// collink-common error
    #[error("Common error: {0}")]
    Common(#[from] collink_common::Error),
}

impl ReconcileError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Transport(_) | ReconcileError::RateLimited { .. } => true,
            ReconcileError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
