//! Contract instance identity and access-control record.

use crate::model::identity::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

/// One of the three contract instances hosted by a substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    EventRegistry,
    NoteStore,
    VotingSession,
}

impl ContractKind {
    pub const ALL: [ContractKind; 3] = [
        ContractKind::EventRegistry,
        ContractKind::NoteStore,
        ContractKind::VotingSession,
    ];

    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventRegistry => "event_registry",
            Self::NoteStore => "note_store",
            Self::VotingSession => "voting_session",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event_registry" => Some(Self::EventRegistry),
            "note_store" => Some(Self::NoteStore),
            "voting_session" => Some(Self::VotingSession),
            _ => None,
        }
    }

    /// Ledger account holding value in custody for this contract.
    pub fn custody_account(self) -> Identity {
        Identity::custody(self.as_str())
    }
}

/// Persisted owner/pause state of one contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub kind: ContractKind,
    pub owner: Identity,
    pub paused: bool,
    pub deployed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::ContractKind;

    #[test]
    fn names_round_trip_for_every_contract() {
        for kind in ContractKind::ALL {
            assert_eq!(ContractKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContractKind::parse("EventRegistry"), None);
    }

    #[test]
    fn custody_accounts_are_distinct() {
        assert_ne!(
            ContractKind::EventRegistry.custody_account(),
            ContractKind::NoteStore.custody_account()
        );
        assert_eq!(
            ContractKind::EventRegistry.custody_account().as_str(),
            "contract:event_registry"
        );
    }
}
