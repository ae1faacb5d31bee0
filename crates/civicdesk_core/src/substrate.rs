//! In-process ledger substrate hosting the three contract instances.
//!
//! # Responsibility
//! - Own the single connection that backs contracts and the value ledger.
//! - Serialize submitted calls, stamp them with a sequence number and
//!   dispatch them to the contract services.
//!
//! # Invariants
//! - Calls execute one at a time in lock-acquisition order.
//! - A rejected call leaves no trace besides its consumed sequence number.
//! - Sequence numbers start at 1 and never repeat within one instance.

use crate::api::{Call, Output, Request, Response};
use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::error::ContractResult;
use crate::model::identity::{Amount, CallContext, Identity, Timestamp};
use crate::model::notification::Notification;
use crate::model::validation::require_external;
use crate::model::voting::RevotePolicy;
use crate::repo::ledger_repo::{Custody, SqliteLedger};
use crate::service::access_control::{deploy_contracts, transfer_contract_ownership, AccessControl};
use crate::service::atomically;
use crate::service::event_registry::EventRegistry;
use crate::service::note_store::NoteStore;
use crate::service::voting_service::VotingService;
use log::{debug, error, info};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct Substrate {
    state: Mutex<SubstrateState>,
    revote_policy: RevotePolicy,
}

struct SubstrateState {
    conn: Connection,
    next_sequence: u64,
}

/// Output value plus notifications of one committed call.
struct Dispatched {
    output: Output,
    notifications: Vec<Notification>,
}

impl From<Output> for Dispatched {
    fn from(output: Output) -> Self {
        Self {
            output,
            notifications: Vec::new(),
        }
    }
}

impl Substrate {
    /// Opens storage per `config` and deploys all contracts owned by
    /// `deployer`.
    ///
    /// Reopening an existing database file keeps the recorded owners.
    pub fn open(config: &CoreConfig, deployer: &Identity, now: Timestamp) -> ContractResult<Self> {
        require_external("deployer", deployer)?;
        let mut conn = match config.db_path.as_ref() {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        deploy_contracts(&mut conn, deployer, now)?;

        Ok(Self {
            state: Mutex::new(SubstrateState {
                conn,
                next_sequence: 1,
            }),
            revote_policy: config.revote_policy,
        })
    }

    /// In-memory substrate with default settings, deployed at time 0.
    pub fn in_memory(deployer: &Identity) -> ContractResult<Self> {
        Self::open(&CoreConfig::default(), deployer, 0)
    }

    pub fn revote_policy(&self) -> RevotePolicy {
        self.revote_policy
    }

    /// Mints `amount` into `account`. Returns the new balance.
    pub fn fund(&self, account: &Identity, amount: Amount) -> ContractResult<Amount> {
        let mut state = self.lock();
        let balance = atomically(&mut state.conn, |tx| {
            Ok(SqliteLedger::new(tx).credit(account, amount)?)
        })?;
        info!("event=ledger_fund module=substrate status=ok amount={amount}");
        Ok(balance)
    }

    pub fn balance_of(&self, account: &Identity) -> ContractResult<Amount> {
        let state = self.lock();
        Ok(SqliteLedger::new(&state.conn).balance_of(account)?)
    }

    /// Executes one request and returns its envelope.
    ///
    /// Never panics on contract failures; they are reported in
    /// `Response.error`.
    pub fn submit(&self, request: Request) -> Response {
        let Request { caller, now, call } = request;
        let operation = call.operation();
        let read_only = call.is_read_only();
        let ctx = CallContext::new(caller, now);

        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let result = dispatch(&mut state.conn, self.revote_policy, &ctx, call);
        drop(state);

        match result {
            Ok(Dispatched {
                output,
                notifications,
            }) => {
                debug!(
                    "event=call_submit module=substrate status=ok sequence={sequence} operation={operation} read_only={read_only} notifications={}",
                    notifications.len()
                );
                Response::success(sequence, operation, output, notifications)
            }
            Err(err) => {
                if err.is_internal() {
                    error!(
                        "event=call_submit module=substrate status=error sequence={sequence} operation={operation} error_code={} error={err}",
                        err.code()
                    );
                } else {
                    debug!(
                        "event=call_submit module=substrate status=rejected sequence={sequence} operation={operation} error_code={}",
                        err.code()
                    );
                }
                Response::failure(sequence, operation, &err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SubstrateState> {
        // Open transactions roll back on unwind; poisoned state stays consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn dispatch(
    conn: &mut Connection,
    revote_policy: RevotePolicy,
    ctx: &CallContext,
    call: Call,
) -> ContractResult<Dispatched> {
    require_external("caller", &ctx.caller)?;
    let dispatched: Dispatched = match call {
        Call::CreateEvent {
            name,
            fee,
            max_capacity,
        } => Output::EventId(EventRegistry::try_new(conn)?.create_event(ctx, name, fee, max_capacity)?)
            .into(),
        Call::OpenRegistration { event_id, deadline } => {
            EventRegistry::try_new(conn)?.open_registration(ctx, event_id, deadline)?;
            Output::Unit.into()
        }
        Call::ParticipantRegistration {
            event_id,
            name,
            paid_amount,
        } => Output::Registration(
            EventRegistry::try_new(conn)?.participant_registration(ctx, event_id, name, paid_amount)?,
        )
        .into(),
        Call::CloseRegistration { event_id } => {
            EventRegistry::try_new(conn)?.close_registration(ctx, event_id)?;
            Output::Unit.into()
        }
        Call::WithdrawPayments { amount } => {
            Output::Amount(EventRegistry::try_new(conn)?.withdraw_payments(ctx, amount)?).into()
        }
        Call::GetParticipants { event_id } => {
            Output::Participants(EventRegistry::try_new(conn)?.get_participants(event_id)?).into()
        }
        Call::GetEvent { event_id } => {
            Output::Event(EventRegistry::try_new(conn)?.get_event(event_id)?).into()
        }
        Call::EscrowBalance { creator } => {
            Output::Amount(EventRegistry::try_new(conn)?.escrow_balance(&creator)?).into()
        }

        Call::CreateNote {
            title,
            content,
            is_public,
            shared_with,
        } => Output::NoteId(NoteStore::try_new(conn)?.create_note(
            ctx,
            title,
            content,
            is_public,
            shared_with,
        )?)
        .into(),
        Call::ReadNote { note_id } => {
            Output::Note(NoteStore::try_new(conn)?.read_note(ctx, note_id)?).into()
        }
        Call::UpdateSharingSettings {
            note_id,
            is_public,
            shared_with,
        } => {
            NoteStore::try_new(conn)?.update_sharing_settings(ctx, note_id, is_public, shared_with)?;
            Output::Unit.into()
        }
        Call::DeleteNote { note_id } => {
            NoteStore::try_new(conn)?.delete_note(ctx, note_id)?;
            Output::Unit.into()
        }
        Call::GetUserNotes { owner } => {
            Output::NoteIds(NoteStore::try_new(conn)?.get_user_notes(&owner)?).into()
        }
        Call::SharingSettings { note_id } => {
            Output::Sharing(NoteStore::try_new(conn)?.sharing_settings(ctx, note_id)?).into()
        }
        Call::PauseContract => {
            NoteStore::try_new(conn)?.pause_contract(ctx)?;
            Output::Unit.into()
        }
        Call::ResumeContract => {
            NoteStore::try_new(conn)?.resume_contract(ctx)?;
            Output::Unit.into()
        }
        Call::IsPaused => Output::Flag(NoteStore::try_new(conn)?.is_paused()?).into(),

        Call::CreateVoting {
            movie_names,
            duration_secs,
        } => {
            let (session_id, created) = VotingService::try_new(conn, revote_policy)?.create_voting(
                ctx,
                movie_names,
                duration_secs,
            )?;
            Dispatched {
                output: Output::SessionId(session_id),
                notifications: vec![created],
            }
        }
        Call::StartVoting { session_id } => notified(
            VotingService::try_new(conn, revote_policy)?.start_voting(ctx, session_id)?,
        ),
        Call::Vote {
            session_id,
            movie_name,
        } => notified(
            VotingService::try_new(conn, revote_policy)?.vote(ctx, session_id, &movie_name)?,
        ),
        Call::EndVoting { session_id } => notified(
            VotingService::try_new(conn, revote_policy)?.end_voting(ctx, session_id)?,
        ),
        Call::GetWinner { session_id } => Output::Winner(
            VotingService::try_new(conn, revote_policy)?.get_winner(session_id)?,
        )
        .into(),
        Call::GetMovies { session_id } => Output::Movies(
            VotingService::try_new(conn, revote_policy)?.get_movies(session_id)?,
        )
        .into(),
        Call::GetSession { session_id } => Output::Session(
            VotingService::try_new(conn, revote_policy)?.get_session(session_id)?,
        )
        .into(),

        Call::ContractOwner { contract } => {
            Output::Identity(AccessControl::new(conn, contract).owner()?).into()
        }
        Call::TransferOwnership {
            contract,
            new_owner,
        } => {
            transfer_contract_ownership(conn, ctx, contract, &new_owner)?;
            Output::Unit.into()
        }
        Call::BalanceOf { account } => {
            Output::Amount(SqliteLedger::new(conn).balance_of(&account)?).into()
        }
    };
    Ok(dispatched)
}

fn notified(notification: Notification) -> Dispatched {
    Dispatched {
        output: Output::Unit,
        notifications: vec![notification],
    }
}
