use async_trait::async_trait;

use crate::event_sourcing::core::{Event, NewEvent};
use crate::utils::IsTransient;

// ============================================================================
// Event Log - Transactional Collection Store Abstraction
// ============================================================================
//
// The durable backend is injected into the store through this trait.
//
// The one write primitive is a conditional append: it succeeds only if the
// key's latest sequence number is still the one the caller decided against.
// Together with `latest_event` this forms the atomic read-decide-append
// unit; a concurrent writer on the same key turns into `LogError::Conflict`,
// which the store retries.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// Another writer appended to the key since it was read
    #[error("write conflict on key {key:?} (expected sequence {expected:?})")]
    Conflict {
        key: String,
        expected: Option<i64>,
    },

    /// Connectivity loss, query failure or undecodable row
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl LogError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        LogError::Backend(err.to_string())
    }
}

impl IsTransient for LogError {
    fn is_transient(&self) -> bool {
        matches!(self, LogError::Conflict { .. })
    }
}

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Create the event collection and its latest-by-key index if missing
    async fn ensure_schema(&self) -> Result<(), LogError>;

    /// Drop every event and recreate the schema
    async fn reset(&self) -> Result<(), LogError>;

    /// Event with the highest sequence number for `key`
    async fn latest_event(&self, key: &str) -> Result<Option<Event>, LogError>;

    /// Append `event` if the latest sequence for its key is still `expected`
    /// (`None` meaning the key has no events). Returns the stored event.
    async fn append_after(&self, event: NewEvent, expected: Option<i64>) -> Result<Event, LogError>;

    /// Up to `limit` events for `key`, newest first
    async fn history(&self, key: &str, limit: usize) -> Result<Vec<Event>, LogError>;

    /// Release the backend session
    async fn close(&self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Sequence number the next event of a key receives
pub fn next_sequence(expected: Option<i64>) -> i64 {
    expected.map_or(1, |seq| seq + 1)
}
