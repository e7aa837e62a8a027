use chrono::Utc;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// KV Event - One immutable state transition for a key
// ============================================================================
//
// Events are append-only. The current value of a key is never stored; it is
// the latest event in the key's chain (see aggregate.rs).
//
// "Latest" is decided by `sequence`, a per-key counter assigned at append
// time. `timestamp` is informational and may collide under rapid writes.
//
// ============================================================================

/// Kind of transition recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Tombstones mark a key logically absent
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0:?}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// A decided transition that has not been appended yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub key: String,
    pub value: String,
    pub operation: Operation,
    pub timestamp: i64,
}

impl NewEvent {
    pub fn new(key: impl Into<String>, value: impl Into<String>, operation: Operation) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operation,
            timestamp: now_nanos(),
        }
    }

    /// Seal the event with the sequence number the log assigned to it
    pub fn into_event(self, sequence: i64) -> Event {
        Event {
            key: self.key,
            value: self.value,
            operation: self.operation,
            timestamp: self.timestamp,
            sequence,
        }
    }
}

/// An event as stored in the log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub key: String,
    pub value: String,
    pub operation: Operation,
    /// Unix epoch nanoseconds from the host clock
    pub timestamp: i64,
    /// Strictly increasing per key, starting at 1
    pub sequence: i64,
}

/// Resolve the latest event of a chain.
///
/// Sequence numbers are unique per key, so the timestamp only matters for
/// chains assembled from several sources.
pub fn latest_event(events: &[Event]) -> Option<&Event> {
    events.iter().max_by_key(|e| (e.sequence, e.timestamp))
}

pub(crate) fn now_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

// ============================================================================
// Tests
// ============================================================================
