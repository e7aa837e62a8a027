use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::kv::{KvCommand, KvError};
use crate::event_sourcing::core::{Event, KeyState};
use crate::metrics::Metrics;
use crate::utils::{
    retry_on_transient, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, IsTransient,
    RetryConfig, RetryResult,
};
use super::event_log::{EventLog, LogError};

// ============================================================================
// Event Log Store - KV operations over an append-only event log
// ============================================================================
//
// Responsibilities:
// 1. Resolve the latest event of a key and project it onto KeyState
// 2. Run Create/Update/Delete as one read-decide-append unit, retrying
//    write conflicts so callers never observe them
// 3. Serve reads (Get, GetHistory) from a single consistent read
// 4. Fail fast through a circuit breaker when the backend is down
//
// Each call yields exactly one of: success, NotFound, AlreadyExists, fault.
// A failed call appends nothing.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] KvError),

    #[error("storage fault: {0}")]
    Storage(#[source] LogError),

    #[error("transaction on key {key:?} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        key: String,
        attempts: u32,
    },

    #[error("storage backend unavailable")]
    Unavailable,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Rejected(KvError::NotFound))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::Rejected(KvError::AlreadyExists))
    }

    /// Metric label for the outcome of an operation
    fn outcome(&self) -> &'static str {
        match self {
            StoreError::Rejected(KvError::NotFound) => "not_found",
            StoreError::Rejected(KvError::AlreadyExists) => "already_exists",
            StoreError::Unavailable => "unavailable",
            StoreError::Storage(_) | StoreError::ConflictRetriesExhausted { .. } => "fault",
        }
    }
}

/// Failure of a single transaction attempt
#[derive(Debug)]
enum AttemptError {
    Log(LogError),
    CircuitOpen,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Log(e) => write!(f, "{}", e),
            AttemptError::CircuitOpen => write!(f, "circuit breaker is open"),
        }
    }
}

impl IsTransient for AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Log(e) => e.is_transient(),
            AttemptError::CircuitOpen => false,
        }
    }
}

impl From<AttemptError> for StoreError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Log(e) => StoreError::Storage(e),
            AttemptError::CircuitOpen => StoreError::Unavailable,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Attempts per mutating transaction before a conflict becomes a fault
    pub max_transaction_attempts: u32,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: 20,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

pub struct EventLogStore<L: EventLog> {
    log: Arc<L>,
    retry: RetryConfig,
    breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl<L: EventLog> EventLogStore<L> {
    pub fn new(log: Arc<L>) -> Self {
        Self::with_config(log, StoreConfig::default(), Arc::new(Metrics::default()))
    }

    pub fn with_config(log: Arc<L>, config: StoreConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            log,
            retry: RetryConfig::transaction(config.max_transaction_attempts),
            breaker: CircuitBreaker::new(config.circuit_breaker),
            metrics,
        }
    }

    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Create the event collection and its index
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.log.ensure_schema().await.map_err(StoreError::Storage)
    }

    /// Drop all events (development and tests)
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.log.reset().await.map_err(StoreError::Storage)
    }

    /// Release the backend session
    pub async fn close(&self) -> Result<(), StoreError> {
        self.log.close().await.map_err(StoreError::Storage)
    }

    /// Create `key`; fails with AlreadyExists while the key is active
    pub async fn create(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.execute(key, KvCommand::Create { value: value.to_string() }).await.map(|_| ())
    }

    /// Current value of `key`; fails with NotFound if absent or deleted
    pub async fn get(&self, key: &str) -> Result<String, StoreError> {
        let started = Instant::now();

        let result: Result<String, StoreError> = async {
            let latest = self.guarded(self.log.latest_event(key)).await?;
            let value = KeyState::from_latest(latest.as_ref()).value()?.to_string();
            Ok(value)
        }
        .await;

        tracing::debug!(key = %key, found = result.is_ok(), "Resolved latest event");
        self.record("get", &result, started).await;
        result
    }

    /// Replace the value of an active key
    pub async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.execute(key, KvCommand::Update { value: value.to_string() }).await.map(|_| ())
    }

    /// Append a tombstone for an active key, carrying its last value forward
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.execute(key, KvCommand::Delete).await.map(|_| ())
    }

    /// Up to `limit` events for `key`, most recent first
    pub async fn get_history(&self, key: &str, limit: usize) -> Result<Vec<Event>, StoreError> {
        let started = Instant::now();

        let result = if limit == 0 {
            Ok(Vec::new())
        } else {
            self.guarded(self.log.history(key, limit))
                .await
                .map_err(StoreError::from)
        };

        if let Ok(events) = &result {
            tracing::debug!(key = %key, limit = limit, event_count = events.len(), "Loaded history");
        }
        self.record("history", &result, started).await;
        result
    }

    /// Run a command as a retried read-decide-append transaction
    async fn execute(&self, key: &str, command: KvCommand) -> Result<Event, StoreError> {
        let started = Instant::now();
        let operation = command.name();
        let store = self;
        let command = &command;

        let outcome = retry_on_transient(self.retry.clone(), move |attempt| async move {
            if attempt > 1 {
                store.metrics.record_conflict(operation);
            }
            store.transaction(key, command).await
        })
        .await;

        let result = match outcome {
            RetryResult::Success(Ok(event)) => Ok(event),
            RetryResult::Success(Err(rejection)) => Err(StoreError::Rejected(rejection)),
            RetryResult::PermanentFailure(err) => Err(err.into()),
            RetryResult::Failed { attempts, .. } => Err(StoreError::ConflictRetriesExhausted {
                key: key.to_string(),
                attempts,
            }),
        };

        match &result {
            Ok(event) => {
                self.metrics.record_append(operation);
                tracing::info!(
                    key = %key,
                    operation = %event.operation,
                    sequence = event.sequence,
                    "✅ Appended event"
                );
            }
            Err(StoreError::Rejected(rejection)) => {
                tracing::debug!(key = %key, operation = operation, reason = %rejection, "Command rejected");
            }
            Err(err) => {
                tracing::error!(key = %key, operation = operation, error = %err, "Transaction aborted");
            }
        }

        self.record(operation, &result, started).await;
        result
    }

    /// One attempt: read latest, decide, conditionally append.
    ///
    /// Rejections are a successful attempt (nothing to retry); only backend
    /// errors are attempt failures.
    async fn transaction(
        &self,
        key: &str,
        command: &KvCommand,
    ) -> Result<Result<Event, KvError>, AttemptError> {
        let latest = self.guarded(self.log.latest_event(key)).await?;
        let state = KeyState::from_latest(latest.as_ref());

        let new_event = match state.handle_command(key, command) {
            Ok(new_event) => new_event,
            Err(rejection) => return Ok(Err(rejection)),
        };

        // Decide against the latest event itself, tombstones included
        let expected = latest.as_ref().map(|event| event.sequence);
        let stored = self.guarded(self.log.append_after(new_event, expected)).await?;

        Ok(Ok(stored))
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, AttemptError>
    where
        F: Future<Output = Result<T, LogError>>,
    {
        self.breaker.call(call).await.map_err(|err| match err {
            CircuitBreakerError::CircuitOpen => AttemptError::CircuitOpen,
            CircuitBreakerError::OperationFailed(e) => AttemptError::Log(e),
        })
    }

    async fn record<T>(&self, operation: &str, result: &Result<T, StoreError>, started: Instant) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        };
        self.metrics
            .record_operation(operation, outcome, started.elapsed().as_secs_f64());
        self.metrics
            .update_circuit_breaker_state(self.breaker.get_state().await.as_gauge());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
