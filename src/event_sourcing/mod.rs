// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Append-only event log and the KV operations derived from it.
// Domain vocabulary (commands, rejections) is in src/domain/
//
// ============================================================================

mod core;
mod store;

pub use self::core::*;
pub use self::store::*;
