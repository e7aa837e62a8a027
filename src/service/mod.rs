// ============================================================================
// Service Layer - RPC surface over the event log store
// ============================================================================

pub mod gateway;
pub mod key_value;
pub mod proto;

pub use gateway::{gateway_status, http_status};
pub use key_value::{to_status, KeyValueServer, HISTORY_PAGE_SIZE};
