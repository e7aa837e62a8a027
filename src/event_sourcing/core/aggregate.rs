use crate::domain::kv::{KvCommand, KvError};
use super::event::{Event, NewEvent, Operation};

// ============================================================================
// Key Aggregate - Derived State of a Single Key
// ============================================================================
//
// Key Principles:
// 1. State is derived from the latest event (never stored)
// 2. Commands are validated against that state before emitting an event
// 3. A rejected command emits nothing
//
// State machine (no terminal state, a key may cycle forever):
//
//   Absent --create--> Active --update--> Active
//   Active --delete--> Absent
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyState {
    Absent,
    Active {
        value: String,
        sequence: i64,
    },
}

impl KeyState {
    /// Project the latest event of a key onto its current state
    pub fn from_latest(latest: Option<&Event>) -> Self {
        match latest {
            Some(event) if !event.operation.is_tombstone() => KeyState::Active {
                value: event.value.clone(),
                sequence: event.sequence,
            },
            _ => KeyState::Absent,
        }
    }

    /// Current value, or NotFound for absent keys
    pub fn value(&self) -> Result<&str, KvError> {
        match self {
            KeyState::Active { value, .. } => Ok(value),
            KeyState::Absent => Err(KvError::NotFound),
        }
    }

    /// Handle command and emit the event to append (business logic)
    pub fn handle_command(&self, key: &str, command: &KvCommand) -> Result<NewEvent, KvError> {
        match (self, command) {
            (KeyState::Absent, KvCommand::Create { value }) => {
                Ok(NewEvent::new(key, value.as_str(), Operation::Create))
            }
            (KeyState::Active { .. }, KvCommand::Create { .. }) => Err(KvError::AlreadyExists),

            (KeyState::Active { .. }, KvCommand::Update { value }) => {
                Ok(NewEvent::new(key, value.as_str(), Operation::Update))
            }

            // The tombstone keeps the last value for history inspection
            (KeyState::Active { value, .. }, KvCommand::Delete) => {
                Ok(NewEvent::new(key, value.as_str(), Operation::Delete))
            }

            (KeyState::Absent, KvCommand::Update { .. } | KvCommand::Delete) => {
                Err(KvError::NotFound)
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: i64, operation: Operation, value: &str) -> Event {
        Event {
            key: "k".to_string(),
            value: value.to_string(),
            operation,
            timestamp: sequence * 10,
            sequence,
        }
    }

    #[test]
    fn test_unseen_key_is_absent() {
        assert_eq!(KeyState::from_latest(None), KeyState::Absent);
    }

    #[test]
    fn test_tombstone_projects_to_absent() {
        let tombstone = event(3, Operation::Delete, "last");
        let state = KeyState::from_latest(Some(&tombstone));

        assert_eq!(state, KeyState::Absent);
        assert_eq!(state.value(), Err(KvError::NotFound));
    }

    #[test]
    fn test_active_state_exposes_value() {
        let update = event(2, Operation::Update, "42");
        let state = KeyState::from_latest(Some(&update));

        assert!(matches!(state, KeyState::Active { sequence: 2, .. }));
        assert_eq!(state.value(), Ok("42"));
    }

    #[test]
    fn test_create_on_absent_key() {
        let new = KeyState::Absent
            .handle_command("k", &KvCommand::Create { value: "v".into() })
            .unwrap();

        assert_eq!(new.key, "k");
        assert_eq!(new.value, "v");
        assert_eq!(new.operation, Operation::Create);
    }

    #[test]
    fn test_create_on_active_key_rejected() {
        let state = KeyState::Active { value: "v".into(), sequence: 1 };
        let result = state.handle_command("k", &KvCommand::Create { value: "v2".into() });

        assert_eq!(result, Err(KvError::AlreadyExists));
    }

    #[test]
    fn test_update_and_delete_require_active_key() {
        let update = KeyState::Absent.handle_command("k", &KvCommand::Update { value: "v".into() });
        let delete = KeyState::Absent.handle_command("k", &KvCommand::Delete);

        assert_eq!(update, Err(KvError::NotFound));
        assert_eq!(delete, Err(KvError::NotFound));
    }

    #[test]
    fn test_delete_carries_value_forward() {
        let state = KeyState::Active { value: "2".into(), sequence: 2 };
        let tombstone = state.handle_command("k", &KvCommand::Delete).unwrap();

        assert_eq!(tombstone.operation, Operation::Delete);
        assert_eq!(tombstone.value, "2");
    }

    #[test]
    fn test_resurrection_after_delete() {
        let tombstone = event(3, Operation::Delete, "2");
        let state = KeyState::from_latest(Some(&tombstone));

        let new = state.handle_command("k", &KvCommand::Create { value: "3".into() }).unwrap();
        assert_eq!(new.operation, Operation::Create);
    }
}
