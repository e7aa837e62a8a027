// ============================================================================
// KV Commands - Represent caller intent for one key
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCommand {
    Create {
        value: String,
    },
    Update {
        value: String,
    },
    Delete,
}

impl KvCommand {
    /// Label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            KvCommand::Create { .. } => "create",
            KvCommand::Update { .. } => "update",
            KvCommand::Delete => "delete",
        }
    }
}
