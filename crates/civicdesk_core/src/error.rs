//! Typed failure results for contract operations.
//!
//! # Invariants
//! - Every failed mutating call maps to exactly one `ContractError` and
//!   leaves no partial write behind.
//! - `code()` values are stable and safe to expose at the request boundary.

use crate::db::DbError;
use crate::model::contract::ContractKind;
use crate::model::event::EventId;
use crate::model::identity::{Amount, Identity};
use crate::model::lifecycle::LifecycleState;
use crate::model::note::NoteId;
use crate::model::validation::ValidationError;
use crate::model::voting::SessionId;
use crate::repo::ledger_repo::TransferError;
use crate::repo::{EntityRef, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ContractResult<T> = Result<T, ContractError>;

#[derive(Debug)]
pub enum ContractError {
    /// Caller lacks the owner/creator role required by the operation.
    NotOwner(Identity),
    ContractPaused(ContractKind),
    AccessDenied(NoteId),
    EventNotOpen(EventId),
    /// Operation is not valid in the event's current lifecycle state.
    EventStateError {
        event_id: EventId,
        state: LifecycleState,
    },
    IncorrectRegistrationFee {
        expected: Amount,
        paid: Amount,
    },
    CapacityReached(EventId),
    InsufficientEscrow {
        available: Amount,
        requested: Amount,
    },
    VotingStateError {
        session_id: SessionId,
        state: LifecycleState,
    },
    UnknownCandidate(SessionId),
    AlreadyVoted(SessionId),
    NotFound(EntityRef),
    DeleteForbidden(NoteId),
    InvalidInput(ValidationError),
    Transfer(TransferError),
    Repo(RepoError),
}

impl ContractError {
    /// Stable snake_case error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotOwner(_) => "not_owner",
            Self::ContractPaused(_) => "contract_paused",
            Self::AccessDenied(_) => "access_denied",
            Self::EventNotOpen(_) => "event_not_open",
            Self::EventStateError { .. } => "event_state_error",
            Self::IncorrectRegistrationFee { .. } => "incorrect_registration_fee",
            Self::CapacityReached(_) => "capacity_reached",
            Self::InsufficientEscrow { .. } => "insufficient_escrow",
            Self::VotingStateError { .. } => "voting_state_error",
            Self::UnknownCandidate(_) => "unknown_candidate",
            Self::AlreadyVoted(_) => "already_voted",
            Self::NotFound(_) => "not_found",
            Self::DeleteForbidden(_) => "delete_forbidden",
            Self::InvalidInput(_) => "invalid_input",
            Self::Transfer(TransferError::InsufficientFunds { .. }) => "insufficient_funds",
            Self::Transfer(_) => "transfer_failed",
            Self::Repo(_) => "storage_error",
        }
    }

    /// Whether the failure came from storage rather than caller input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Repo(_))
    }
}

impl Display for ContractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOwner(caller) => write!(f, "caller {caller} is not the owner"),
            Self::ContractPaused(kind) => write!(f, "contract {} is paused", kind.as_str()),
            Self::AccessDenied(id) => write!(f, "access denied to note {id}"),
            Self::EventNotOpen(id) => write!(f, "event {id} is not open for registration"),
            Self::EventStateError { event_id, state } => write!(
                f,
                "event {event_id} cannot do this in state {}",
                state.as_str()
            ),
            Self::IncorrectRegistrationFee { expected, paid } => {
                write!(f, "incorrect registration fee: expected {expected}, paid {paid}")
            }
            Self::CapacityReached(id) => write!(f, "event {id} is at capacity"),
            Self::InsufficientEscrow {
                available,
                requested,
            } => write!(
                f,
                "insufficient escrow: available {available}, requested {requested}"
            ),
            Self::VotingStateError { session_id, state } => write!(
                f,
                "voting session {session_id} cannot do this in state {}",
                state.as_str()
            ),
            Self::UnknownCandidate(id) => write!(f, "movie is not on the ballot of session {id}"),
            Self::AlreadyVoted(id) => write!(f, "caller already voted in session {id}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::DeleteForbidden(_) => write!(f, "only the owner can delete this note"),
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::Transfer(err) => write!(f, "transfer failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Transfer(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ContractError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for ContractError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for ContractError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

impl From<TransferError> for ContractError {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::Repo(err) => err.into(),
            other => Self::Transfer(other),
        }
    }
}

impl From<ValidationError> for ContractError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value)
    }
}
