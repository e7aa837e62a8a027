// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Domain vocabulary for the key-value store. Completely separate from the
// event sourcing infrastructure that persists it.
//
// ============================================================================

pub mod kv;
