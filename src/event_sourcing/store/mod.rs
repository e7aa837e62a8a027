// ============================================================================
// Event Sourcing Store - Persistence Layer
// ============================================================================
//
// - event_log:   the injected transactional backend abstraction
// - memory:      in-process backend
// - scylla:      durable ScyllaDB backend
// - event_store: KV operations on top of any backend
//
// ============================================================================

pub mod event_log;
pub mod event_store;
pub mod memory;
pub mod scylla;

pub use event_log::{EventLog, LogError};
pub use event_store::{EventLogStore, StoreConfig, StoreError};
pub use memory::MemoryEventLog;
pub use self::scylla::{ScyllaConfig, ScyllaEventLog};
