//! Notifications emitted by committed operations.

use crate::model::identity::{Identity, Timestamp};
use crate::model::voting::SessionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// `deadline` is the deadline the session would get if started now.
    VotingCreated {
        session_id: SessionId,
        deadline: Timestamp,
    },
    VotingStarted {
        session_id: SessionId,
        deadline: Timestamp,
    },
    Voted {
        session_id: SessionId,
        voter: Identity,
        movie: String,
    },
    VotingEnded {
        session_id: SessionId,
        winner: String,
        votes: u32,
    },
}
