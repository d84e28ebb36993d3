//! Error types for smart search

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced in the orchestrator's error state
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search collaborator returned an error
    #[error("Search request failed: {0}")]
    Collaborator(#[from] anyhow::Error),

    /// The catalog answered with `is_success = false`
    #[error("Search was rejected: {0}")]
    Rejected(String),

    /// No answer within the configured timeout
    #[error("Search timed out after {0}ms")]
    Timeout(u64),
}

impl SearchError {
    /// Timeout after `limit`; limits beyond `u64::MAX` milliseconds saturate.
    pub fn timed_out(limit: Duration) -> Self {
        Self::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;
