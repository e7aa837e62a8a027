use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::event_sourcing::core::{latest_event, Event, NewEvent};
use super::event_log::{next_sequence, EventLog, LogError};

// ============================================================================
// In-Memory Event Log
// ============================================================================
//
// Stores each key's chain in append order, so index = sequence - 1.
// Appends are checked and applied under the write lock, which makes the
// conditional append atomic. Used for tests and STORE_BACKEND=memory.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryEventLog {
    chains: RwLock<HashMap<String, Vec<Event>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all keys
    pub async fn len(&self) -> usize {
        self.chains.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn ensure_schema(&self) -> Result<(), LogError> {
        Ok(())
    }

    async fn reset(&self) -> Result<(), LogError> {
        self.chains.write().await.clear();
        tracing::debug!("Cleared in-memory event log");
        Ok(())
    }

    async fn latest_event(&self, key: &str) -> Result<Option<Event>, LogError> {
        let chains = self.chains.read().await;
        Ok(chains.get(key).and_then(|chain| latest_event(chain)).cloned())
    }

    async fn append_after(&self, event: NewEvent, expected: Option<i64>) -> Result<Event, LogError> {
        let mut chains = self.chains.write().await;
        let chain = chains.entry(event.key.clone()).or_default();

        let current = latest_event(chain).map(|e| e.sequence);
        if current != expected {
            return Err(LogError::Conflict { key: event.key, expected });
        }

        let stored = event.into_event(next_sequence(expected));
        chain.push(stored.clone());
        Ok(stored)
    }

    async fn history(&self, key: &str, limit: usize) -> Result<Vec<Event>, LogError> {
        let chains = self.chains.read().await;
        Ok(chains
            .get(key)
            .map(|chain| chain.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
