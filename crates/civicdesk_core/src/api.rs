//! Serializable request/response envelopes for the substrate boundary.
//!
//! # Responsibility
//! - Describe every contract operation as one tagged `Call` value.
//! - Return a deterministic envelope for success and failure alike.
//!
//! # Invariants
//! - The caller identity lives on `Request`, never inside `Call` arguments.
//! - `Response.error.code` is always a `ContractError::code()` value.

use crate::error::ContractError;
use crate::model::contract::ContractKind;
use crate::model::event::{Event, EventId, ParticipantList, RegistrationReceipt};
use crate::model::identity::{Amount, Identity, Timestamp};
use crate::model::note::{NoteId, NoteView, SharingSettings};
use crate::model::notification::Notification;
use crate::model::voting::{Movie, SessionId, VotingSession};
use serde::{Deserialize, Serialize};

/// One authenticated call submitted to the substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub caller: Identity,
    /// Substrate time the call executes at.
    pub now: Timestamp,
    #[serde(flatten)]
    pub call: Call,
}

impl Request {
    pub fn new(caller: Identity, now: Timestamp, call: Call) -> Self {
        Self { caller, now, call }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Call {
    // Event registry.
    CreateEvent {
        name: String,
        fee: Amount,
        max_capacity: u32,
    },
    OpenRegistration {
        event_id: EventId,
        deadline: Timestamp,
    },
    ParticipantRegistration {
        event_id: EventId,
        name: String,
        paid_amount: Amount,
    },
    CloseRegistration {
        event_id: EventId,
    },
    WithdrawPayments {
        amount: Amount,
    },
    GetParticipants {
        event_id: EventId,
    },
    GetEvent {
        event_id: EventId,
    },
    EscrowBalance {
        creator: Identity,
    },

    // Note store.
    CreateNote {
        title: String,
        content: String,
        #[serde(default)]
        is_public: bool,
        #[serde(default)]
        shared_with: Vec<Identity>,
    },
    ReadNote {
        note_id: NoteId,
    },
    UpdateSharingSettings {
        note_id: NoteId,
        is_public: bool,
        #[serde(default)]
        shared_with: Vec<Identity>,
    },
    DeleteNote {
        note_id: NoteId,
    },
    GetUserNotes {
        owner: Identity,
    },
    SharingSettings {
        note_id: NoteId,
    },
    PauseContract,
    ResumeContract,
    IsPaused,

    // Voting session.
    CreateVoting {
        movie_names: Vec<String>,
        duration_secs: u64,
    },
    StartVoting {
        session_id: SessionId,
    },
    Vote {
        session_id: SessionId,
        movie_name: String,
    },
    EndVoting {
        session_id: SessionId,
    },
    GetWinner {
        session_id: SessionId,
    },
    GetMovies {
        session_id: SessionId,
    },
    GetSession {
        session_id: SessionId,
    },

    // Access control and ledger.
    ContractOwner {
        contract: ContractKind,
    },
    TransferOwnership {
        contract: ContractKind,
        new_owner: Identity,
    },
    BalanceOf {
        account: Identity,
    },
}

impl Call {
    /// Wire name of the operation, matching the serde tag.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateEvent { .. } => "create_event",
            Self::OpenRegistration { .. } => "open_registration",
            Self::ParticipantRegistration { .. } => "participant_registration",
            Self::CloseRegistration { .. } => "close_registration",
            Self::WithdrawPayments { .. } => "withdraw_payments",
            Self::GetParticipants { .. } => "get_participants",
            Self::GetEvent { .. } => "get_event",
            Self::EscrowBalance { .. } => "escrow_balance",
            Self::CreateNote { .. } => "create_note",
            Self::ReadNote { .. } => "read_note",
            Self::UpdateSharingSettings { .. } => "update_sharing_settings",
            Self::DeleteNote { .. } => "delete_note",
            Self::GetUserNotes { .. } => "get_user_notes",
            Self::SharingSettings { .. } => "sharing_settings",
            Self::PauseContract => "pause_contract",
            Self::ResumeContract => "resume_contract",
            Self::IsPaused => "is_paused",
            Self::CreateVoting { .. } => "create_voting",
            Self::StartVoting { .. } => "start_voting",
            Self::Vote { .. } => "vote",
            Self::EndVoting { .. } => "end_voting",
            Self::GetWinner { .. } => "get_winner",
            Self::GetMovies { .. } => "get_movies",
            Self::GetSession { .. } => "get_session",
            Self::ContractOwner { .. } => "contract_owner",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::BalanceOf { .. } => "balance_of",
        }
    }

    /// Whether the call only reads committed state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::GetParticipants { .. }
                | Self::GetEvent { .. }
                | Self::EscrowBalance { .. }
                | Self::ReadNote { .. }
                | Self::GetUserNotes { .. }
                | Self::SharingSettings { .. }
                | Self::IsPaused
                | Self::GetWinner { .. }
                | Self::GetMovies { .. }
                | Self::GetSession { .. }
                | Self::ContractOwner { .. }
                | Self::BalanceOf { .. }
        )
    }
}

/// Typed result value of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Output {
    Unit,
    EventId(EventId),
    NoteId(NoteId),
    SessionId(SessionId),
    Amount(Amount),
    Flag(bool),
    Identity(Identity),
    Registration(RegistrationReceipt),
    Participants(ParticipantList),
    Event(Event),
    Note(NoteView),
    NoteIds(Vec<NoteId>),
    Sharing(SharingSettings),
    Winner(String),
    Movies(Vec<Movie>),
    Session(VotingSession),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&ContractError> for ErrorBody {
    fn from(err: &ContractError) -> Self {
        // Storage failures are reported by code only.
        let message = if err.is_internal() {
            "internal storage error".to_string()
        } else {
            err.to_string()
        };
        Self {
            code: err.code().to_string(),
            message,
        }
    }
}

/// Envelope returned for every submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Monotonic arrival order assigned by the substrate, starting at 1.
    pub sequence: u64,
    pub operation: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub(crate) fn success(
        sequence: u64,
        operation: &str,
        output: Output,
        notifications: Vec<Notification>,
    ) -> Self {
        Self {
            sequence,
            operation: operation.to_string(),
            ok: true,
            output: Some(output),
            notifications,
            error: None,
        }
    }

    pub(crate) fn failure(sequence: u64, operation: &str, err: &ContractError) -> Self {
        Self {
            sequence,
            operation: operation.to_string(),
            ok: false,
            output: None,
            notifications: Vec::new(),
            error: Some(err.into()),
        }
    }

    /// Error code of a failed response.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|body| body.code.as_str())
    }
}
