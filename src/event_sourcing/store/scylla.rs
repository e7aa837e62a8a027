use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::{DbError, ExecutionError, RequestAttemptError, WriteType};
use scylla::statement::unprepared::Statement;
use scylla::statement::Consistency;
use scylla::value::{CqlValue, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::event_sourcing::core::{Event, NewEvent, Operation};
use super::event_log::{next_sequence, EventLog, LogError};

// ============================================================================
// ScyllaDB Event Log
// ============================================================================
//
// Table layout:
//
//   kv_events (key, sequence, value, operation, timestamp)
//   PRIMARY KEY ((key), sequence) WITH CLUSTERING ORDER BY (sequence DESC)
//
// The partition key hashes events by key; the descending clustering order
// makes "latest event" a single-row read of the partition head.
//
// Conditional appends are lightweight transactions on (key, expected + 1):
// two writers deciding against the same latest event race for the same
// primary key and exactly one of them is applied.
//
// When Paxos rounds collide the coordinator may time out without knowing
// whether the insert landed. Such appends are settled by a serial read of
// the contested row: our own event means success, anything else a conflict.
//
// ============================================================================

const EVENTS_TABLE: &str = "kv_events";

const SELECT_COLUMNS: &str = "SELECT key, sequence, value, operation, timestamp FROM kv_events";

type EventRow = (String, i64, String, String, i64);

#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub nodes: Vec<String>,
    pub keyspace: String,
    /// Bounded wait for connecting and for schema setup
    pub connect_timeout: Duration,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "event_kv".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub struct ScyllaEventLog {
    session: RwLock<Option<Arc<Session>>>,
    config: ScyllaConfig,
}

impl ScyllaEventLog {
    /// Open the long-lived session and switch to the configured keyspace
    pub async fn connect(config: ScyllaConfig) -> Result<Self, LogError> {
        tracing::info!(nodes = ?config.nodes, keyspace = %config.keyspace, "Connecting to ScyllaDB...");

        let session: Session = tokio::time::timeout(
            config.connect_timeout,
            SessionBuilder::new()
                .known_nodes(&config.nodes)
                .connection_timeout(config.connect_timeout)
                .build(),
        )
        .await
        .map_err(|_| LogError::Backend(format!("connect timed out after {:?}", config.connect_timeout)))?
        .map_err(LogError::backend)?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    config.keyspace
                ),
                (),
            )
            .await
            .map_err(LogError::backend)?;

        session
            .use_keyspace(config.keyspace.as_str(), false)
            .await
            .map_err(LogError::backend)?;

        tracing::info!(keyspace = %config.keyspace, "✅ Connected to ScyllaDB");

        Ok(Self {
            session: RwLock::new(Some(Arc::new(session))),
            config,
        })
    }

    async fn session(&self) -> Result<Arc<Session>, LogError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| LogError::Backend("session is closed".to_string()))
    }

    async fn select_events(&self, key: &str, limit: usize) -> Result<Vec<Event>, LogError> {
        let session = self.session().await?;
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        let result = session
            .query_unpaged(format!("{SELECT_COLUMNS} WHERE key = ? LIMIT ?"), (key, limit))
            .await
            .map_err(LogError::backend)?;

        let rows_result = result.into_rows_result().map_err(LogError::backend)?;

        let mut events = Vec::new();
        for row in rows_result.rows::<EventRow>().map_err(LogError::backend)? {
            events.push(event_from_row(row.map_err(LogError::backend)?)?);
        }

        Ok(events)
    }

    async fn run_schema(&self, statement: &str) -> Result<(), LogError> {
        let session = self.session().await?;
        tokio::time::timeout(self.config.connect_timeout, session.query_unpaged(statement, ()))
            .await
            .map_err(|_| LogError::Backend(format!("schema statement timed out: {statement}")))?
            .map_err(LogError::backend)?;
        Ok(())
    }
}

#[async_trait]
impl EventLog for ScyllaEventLog {
    async fn ensure_schema(&self) -> Result<(), LogError> {
        self.run_schema(&format!(
            "CREATE TABLE IF NOT EXISTS {EVENTS_TABLE} (
                key text,
                sequence bigint,
                value text,
                operation text,
                timestamp bigint,
                PRIMARY KEY ((key), sequence)
            ) WITH CLUSTERING ORDER BY (sequence DESC)"
        ))
        .await?;

        tracing::debug!(table = EVENTS_TABLE, "Event table ready");
        Ok(())
    }

    async fn reset(&self) -> Result<(), LogError> {
        self.run_schema(&format!("DROP TABLE IF EXISTS {EVENTS_TABLE}")).await?;
        tracing::warn!(table = EVENTS_TABLE, "Dropped event table");
        self.ensure_schema().await
    }

    async fn latest_event(&self, key: &str) -> Result<Option<Event>, LogError> {
        Ok(self.select_events(key, 1).await?.into_iter().next())
    }

    async fn append_after(&self, event: NewEvent, expected: Option<i64>) -> Result<Event, LogError> {
        let session = self.session().await?;
        let sequence = next_sequence(expected);

        let inserted = session
            .query_unpaged(
                "INSERT INTO kv_events (key, sequence, value, operation, timestamp)
                 VALUES (?, ?, ?, ?, ?) IF NOT EXISTS",
                (
                    event.key.as_str(),
                    sequence,
                    event.value.as_str(),
                    event.operation.as_str(),
                    event.timestamp,
                ),
            )
            .await;

        let result = match inserted {
            Ok(result) => result,
            Err(err) if is_cas_contention(&err) => {
                tracing::debug!(key = %event.key, sequence, error = %err, "Conditional append outcome unknown, reading back");
                let stored = read_serial(&session, &event.key, sequence).await?;
                return settle_uncertain_append(stored, event, sequence, expected);
            }
            Err(err) => return Err(LogError::backend(err)),
        };

        let rows_result = result.into_rows_result().map_err(LogError::backend)?;
        let applied = match rows_result.maybe_first_row::<Row>().map_err(LogError::backend)? {
            Some(row) => lwt_applied(&row)?,
            None => return Err(LogError::Backend("conditional insert returned no rows".to_string())),
        };

        if !applied {
            return Err(LogError::Conflict { key: event.key, expected });
        }

        Ok(event.into_event(sequence))
    }

    async fn history(&self, key: &str, limit: usize) -> Result<Vec<Event>, LogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.select_events(key, limit).await
    }

    async fn close(&self) -> Result<(), LogError> {
        if self.session.write().await.take().is_some() {
            tracing::info!("ScyllaDB session closed");
        }
        Ok(())
    }
}

fn event_from_row(row: EventRow) -> Result<Event, LogError> {
    let (key, sequence, value, operation, timestamp) = row;
    let operation: Operation = operation.parse().map_err(LogError::backend)?;

    Ok(Event {
        key,
        value,
        operation,
        timestamp,
        sequence,
    })
}

/// Contention between lightweight transactions on one partition. The
/// coordinator gave up waiting, so the insert may or may not be applied.
fn is_cas_contention(err: &ExecutionError) -> bool {
    match err {
        ExecutionError::LastAttemptError(RequestAttemptError::DbError(db_error, _)) => matches!(
            db_error,
            DbError::WriteTimeout { write_type: WriteType::Cas, .. }
                | DbError::ReadTimeout {
                    consistency: Consistency::Serial | Consistency::LocalSerial,
                    ..
                }
        ),
        _ => false,
    }
}

/// Read one event at serial consistency, completing any in-flight Paxos round
async fn read_serial(session: &Session, key: &str, sequence: i64) -> Result<Option<Event>, LogError> {
    let mut statement = Statement::new(format!("{SELECT_COLUMNS} WHERE key = ? AND sequence = ?"));
    statement.set_consistency(Consistency::Serial);

    let result = session
        .query_unpaged(statement, (key, sequence))
        .await
        .map_err(LogError::backend)?;

    let rows_result = result.into_rows_result().map_err(LogError::backend)?;
    rows_result
        .maybe_first_row::<EventRow>()
        .map_err(LogError::backend)?
        .map(event_from_row)
        .transpose()
}

/// Decide a timed-out conditional append from what the row holds now
fn settle_uncertain_append(
    stored: Option<Event>,
    event: NewEvent,
    sequence: i64,
    expected: Option<i64>,
) -> Result<Event, LogError> {
    match stored {
        Some(stored)
            if stored.timestamp == event.timestamp
                && stored.operation == event.operation
                && stored.value == event.value =>
        {
            Ok(event.into_event(sequence))
        }
        _ => Err(LogError::Conflict { key: event.key, expected }),
    }
}

/// First column of a lightweight transaction result is `[applied]`
fn lwt_applied(row: &Row) -> Result<bool, LogError> {
    match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        other => Err(LogError::Backend(format!("unexpected [applied] column: {other:?}"))),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_row() {
        let row = ("k".to_string(), 3, "v".to_string(), "delete".to_string(), 1_700_000_000_000_000_000);
        let event = event_from_row(row).unwrap();

        assert_eq!(event.key, "k");
        assert_eq!(event.sequence, 3);
        assert_eq!(event.operation, Operation::Delete);
        assert_eq!(event.timestamp, 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_undecodable_operation_is_backend_error() {
        let row = ("k".to_string(), 1, "v".to_string(), "upsert".to_string(), 0);
        assert!(matches!(event_from_row(row), Err(LogError::Backend(_))));
    }

    #[test]
    fn test_lwt_applied_column() {
        let applied = Row { columns: vec![Some(CqlValue::Boolean(true))] };
        let rejected = Row {
            columns: vec![
                Some(CqlValue::Boolean(false)),
                Some(CqlValue::Text("k".to_string())),
                Some(CqlValue::BigInt(1)),
            ],
        };
        let malformed = Row { columns: vec![None] };

        assert!(lwt_applied(&applied).unwrap());
        assert!(!lwt_applied(&rejected).unwrap());
        assert!(lwt_applied(&malformed).is_err());
    }

    fn db_error(error: DbError) -> ExecutionError {
        ExecutionError::LastAttemptError(RequestAttemptError::DbError(error, "timed out".to_string()))
    }

    #[test]
    fn test_cas_timeouts_are_contention() {
        let cas_write = db_error(DbError::WriteTimeout {
            consistency: Consistency::Quorum,
            received: 0,
            required: 1,
            write_type: WriteType::Cas,
        });
        let serial_read = db_error(DbError::ReadTimeout {
            consistency: Consistency::Serial,
            received: 1,
            required: 2,
            data_present: false,
        });

        assert!(is_cas_contention(&cas_write));
        assert!(is_cas_contention(&serial_read));
    }

    #[test]
    fn test_other_failures_are_not_contention() {
        let simple_write = db_error(DbError::WriteTimeout {
            consistency: Consistency::Quorum,
            received: 0,
            required: 1,
            write_type: WriteType::Simple,
        });
        let quorum_read = db_error(DbError::ReadTimeout {
            consistency: Consistency::Quorum,
            received: 1,
            required: 2,
            data_present: true,
        });
        let unavailable = db_error(DbError::Unavailable {
            consistency: Consistency::Quorum,
            required: 2,
            alive: 1,
        });

        assert!(!is_cas_contention(&simple_write));
        assert!(!is_cas_contention(&quorum_read));
        assert!(!is_cas_contention(&unavailable));
        assert!(!is_cas_contention(&ExecutionError::EmptyPlan));
    }

    #[test]
    fn test_settle_own_row_is_applied() {
        let event = NewEvent::new("k", "v", Operation::Update);
        let stored = event.clone().into_event(4);

        let settled = settle_uncertain_append(Some(stored.clone()), event, 4, Some(3)).unwrap();
        assert_eq!(settled, stored);
    }

    #[test]
    fn test_settle_foreign_or_missing_row_is_conflict() {
        let ours = NewEvent::new("k", "mine", Operation::Update);
        let mut theirs = NewEvent::new("k", "theirs", Operation::Update);
        theirs.timestamp = ours.timestamp + 1;

        let conflict = LogError::Conflict { key: "k".into(), expected: Some(3) };
        assert_eq!(
            settle_uncertain_append(Some(theirs.into_event(4)), ours.clone(), 4, Some(3)),
            Err(conflict.clone())
        );
        assert_eq!(settle_uncertain_append(None, ours, 4, Some(3)), Err(conflict));
    }

    #[test]
    fn test_default_config() {
        let config = ScyllaConfig::default();
        assert_eq!(config.nodes, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(config.keyspace, "event_kv");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    // Note: append/read paths need a live ScyllaDB node; the store-level
    // behavior is exercised against MemoryEventLog in event_store.rs.
}
