//! Event registration domain model.
//!
//! # Invariants
//! - `current_count <= max_capacity` and `max_capacity > 0`.
//! - Registration is accepted only while `IsOpen` and before the deadline.
//! - Participants are kept in registration order.

use crate::model::identity::{Amount, Identity, Timestamp, MAX_AMOUNT};
use crate::model::lifecycle::LifecycleState;
use crate::model::validation::{require_max_chars, require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type EventId = u64;

pub const MAX_EVENT_NAME_CHARS: usize = 200;
pub const MAX_PARTICIPANT_NAME_CHARS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub fee: Amount,
    pub max_capacity: u32,
    pub current_count: u32,
    pub state: LifecycleState,
    /// Set by `open_registration`; `None` while `Created`.
    pub registration_deadline: Option<Timestamp>,
    pub creator: Identity,
    pub created_at: Timestamp,
}

impl Event {
    /// Whether a registration at `now` passes the state and deadline gate.
    pub fn is_accepting(&self, now: Timestamp) -> bool {
        self.state == LifecycleState::IsOpen
            && self
                .registration_deadline
                .is_some_and(|deadline| now < deadline)
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.max_capacity
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_count)
    }
}

/// Validated input for `create_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub fee: Amount,
    pub max_capacity: u32,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_EVENT_NAME_CHARS)?;
        if self.fee > MAX_AMOUNT {
            return Err(ValidationError::Overflow("fee"));
        }
        if self.max_capacity == 0 {
            return Err(ValidationError::Zero("max_capacity"));
        }
        Ok(())
    }
}

/// Participant names may be empty; only their length is bounded.
pub(crate) fn validate_participant_name(name: &str) -> Result<(), ValidationError> {
    require_max_chars("name", name, MAX_PARTICIPANT_NAME_CHARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: Identity,
    pub name: String,
}

/// Parallel address/name sequences in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantList {
    pub addresses: Vec<Identity>,
    pub names: Vec<String>,
}

impl FromIterator<Participant> for ParticipantList {
    fn from_iter<I: IntoIterator<Item = Participant>>(iter: I) -> Self {
        let (addresses, names) = iter
            .into_iter()
            .map(|participant| (participant.address, participant.name))
            .unzip();
        Self { addresses, names }
    }
}

/// Outcome of one successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub event_id: EventId,
    /// Zero-based registration order of this participant.
    pub position: u32,
    pub current_count: u32,
    /// `true` when this registration filled the last seat.
    pub closed: bool,
}

#[cfg(test)]
mod tests {
    use super::{Event, NewEvent, Participant, ParticipantList};
    use crate::model::identity::Identity;
    use crate::model::lifecycle::LifecycleState;
    use crate::model::validation::ValidationError;

    fn open_event(deadline: i64) -> Event {
        Event {
            id: 1,
            name: "Conf".to_string(),
            fee: 10,
            max_capacity: 2,
            current_count: 0,
            state: LifecycleState::IsOpen,
            registration_deadline: Some(deadline),
            creator: Identity::parse("creator").unwrap(),
            created_at: 0,
        }
    }

    #[test]
    fn accepting_requires_open_state_and_time_before_deadline() {
        let event = open_event(100);
        assert!(event.is_accepting(99));
        assert!(!event.is_accepting(100));

        let mut created = open_event(100);
        created.state = LifecycleState::Created;
        created.registration_deadline = None;
        assert!(!created.is_accepting(0));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let input = NewEvent {
            name: "Empty".to_string(),
            fee: 1,
            max_capacity: 0,
        };
        assert_eq!(input.validate(), Err(ValidationError::Zero("max_capacity")));
    }

    #[test]
    fn participant_list_keeps_parallel_order() {
        let list: ParticipantList = vec![
            Participant {
                address: Identity::parse("a").unwrap(),
                name: "Alice".to_string(),
            },
            Participant {
                address: Identity::parse("b").unwrap(),
                name: "Bob".to_string(),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(list.names, vec!["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(list.addresses[1].as_str(), "b");
    }
}
