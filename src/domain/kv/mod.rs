// ============================================================================
// Key-Value Domain - Business Rules for a Single Key
// ============================================================================
//
// This module contains the KV-specific vocabulary:
// - Commands (Create, Update, Delete)
// - Errors (KvError: the expected rejections)
//
// The per-key state machine lives next to the event type in
// event_sourcing::core, because the current value is only ever a projection
// of the event chain.
//
// ============================================================================

pub mod commands;
pub mod errors;

pub use commands::*;
pub use errors::*;
