// ============================================================================
// Event Sourcing Core - Events and Derived State
// ============================================================================
//
// Key Principles:
// - Events are immutable facts, appended once and never removed
// - The current value of a key is a projection, computed on demand
// - Deciding an event is pure; persisting it is the store's job
//
// ============================================================================

pub mod aggregate;
pub mod event;

// Re-export core types for convenience
pub use aggregate::KeyState;
pub use event::{latest_event, Event, NewEvent, Operation, UnknownOperation};
