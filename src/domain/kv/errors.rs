// ============================================================================
// KV Business Rule Errors
// ============================================================================

/// Expected, recoverable rejections. Surfaced to callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KvError {
    #[error("Key not found")]
    NotFound,

    #[error("Key already exists")]
    AlreadyExists,
}
