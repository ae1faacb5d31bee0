//! Ballot voting use-case service.
//!
//! # Responsibility
//! - Create sessions, open them for a fixed duration and accept ballots.
//! - Fix the winner once the deadline has passed.
//!
//! # Invariants
//! - Ballots are accepted only while `IsOpen` and strictly before the deadline.
//! - The winner is the first maximum in ballot order and never changes after
//!   `end_voting`.
//! - Every accepted ballot is appended to the ballot log.

use crate::error::{ContractError, ContractResult};
use crate::model::identity::CallContext;
use crate::model::lifecycle::LifecycleState;
use crate::model::notification::Notification;
use crate::model::voting::{
    deadline_after, first_maximum, validate_ballot, Movie, RevotePolicy, SessionId, VotingSession,
};
use crate::repo::voting_repo::{SqliteVotingRepository, VotingRepository};
use crate::repo::{EntityRef, RepoError};
use crate::service::atomically;
use log::info;
use rusqlite::Connection;

pub struct VotingService<'conn> {
    conn: &'conn mut Connection,
    revote_policy: RevotePolicy,
}

impl<'conn> VotingService<'conn> {
    /// Binds the service to a migrated connection.
    pub fn try_new(conn: &'conn mut Connection, revote_policy: RevotePolicy) -> ContractResult<Self> {
        SqliteVotingRepository::try_new(conn)?;
        Ok(Self {
            conn,
            revote_policy,
        })
    }

    /// Creates a session in `Created` with zero counts, in input order.
    ///
    /// The returned notification carries the deadline the session would get
    /// if it were started at `ctx.now`.
    pub fn create_voting(
        &mut self,
        ctx: &CallContext,
        movie_names: Vec<String>,
        duration_secs: u64,
    ) -> ContractResult<(SessionId, Notification)> {
        validate_ballot(&movie_names, duration_secs)?;
        let projected_deadline = deadline_after(ctx.now, duration_secs)?;

        let session_id = atomically(self.conn, |tx| {
            Ok(SqliteVotingRepository::new(tx).insert_session(
                &ctx.caller,
                &movie_names,
                duration_secs,
                ctx.now,
            )?)
        })?;

        info!(
            "event=voting_create module=voting status=ok session_id={session_id} movies={} duration_secs={duration_secs}",
            movie_names.len()
        );
        Ok((
            session_id,
            Notification::VotingCreated {
                session_id,
                deadline: projected_deadline,
            },
        ))
    }

    /// Creator-only `Created -> IsOpen`; the deadline is `now + duration`.
    pub fn start_voting(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
    ) -> ContractResult<Notification> {
        let deadline = atomically(self.conn, |tx| {
            let sessions = SqliteVotingRepository::new(tx);
            let session = load_session(&sessions, session_id)?;
            if session.creator != ctx.caller {
                return Err(ContractError::NotOwner(ctx.caller.clone()));
            }
            if !session.state.can_advance_to(LifecycleState::IsOpen) {
                return Err(ContractError::VotingStateError {
                    session_id,
                    state: session.state,
                });
            }
            let deadline = deadline_after(ctx.now, session.duration_secs)?;
            sessions.mark_open(session_id, deadline)?;
            Ok(deadline)
        })?;

        info!("event=voting_start module=voting status=ok session_id={session_id} deadline={deadline}");
        Ok(Notification::VotingStarted {
            session_id,
            deadline,
        })
    }

    /// Adds one vote for `movie_name` on behalf of the caller.
    pub fn vote(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
        movie_name: &str,
    ) -> ContractResult<Notification> {
        let revote_policy = self.revote_policy;
        let vote_count = atomically(self.conn, |tx| {
            let sessions = SqliteVotingRepository::new(tx);
            let session = load_session(&sessions, session_id)?;
            if !session.is_accepting_votes(ctx.now) {
                return Err(ContractError::VotingStateError {
                    session_id,
                    state: session.state,
                });
            }
            let position = session
                .position_of(movie_name)
                .ok_or(ContractError::UnknownCandidate(session_id))?;
            if revote_policy == RevotePolicy::OncePerSession
                && sessions.has_ballot(session_id, &ctx.caller)?
            {
                return Err(ContractError::AlreadyVoted(session_id));
            }

            let vote_count = sessions.increment_vote(session_id, position)?;
            sessions.record_ballot(session_id, &ctx.caller, position, ctx.now)?;
            Ok(vote_count)
        })?;

        info!("event=vote_cast module=voting status=ok session_id={session_id} vote_count={vote_count}");
        Ok(Notification::Voted {
            session_id,
            voter: ctx.caller.clone(),
            movie: movie_name.to_string(),
        })
    }

    /// `IsOpen -> Finished` once the deadline has passed; fixes the winner.
    pub fn end_voting(
        &mut self,
        ctx: &CallContext,
        session_id: SessionId,
    ) -> ContractResult<Notification> {
        let winner = atomically(self.conn, |tx| {
            let sessions = SqliteVotingRepository::new(tx);
            let session = load_session(&sessions, session_id)?;
            if !session.can_end(ctx.now) {
                return Err(ContractError::VotingStateError {
                    session_id,
                    state: session.state,
                });
            }
            let position = first_maximum(&session.movies).ok_or_else(|| {
                RepoError::InvalidData(format!("voting session {session_id} has no movies"))
            })?;
            sessions.mark_finished(session_id, position)?;
            Ok(session.movies[position].clone())
        })?;

        info!(
            "event=voting_end module=voting status=ok session_id={session_id} winner_votes={}",
            winner.vote_count
        );
        Ok(Notification::VotingEnded {
            session_id,
            winner: winner.name,
            votes: winner.vote_count,
        })
    }

    /// Name of the fixed winner; fails until the session is `Finished`.
    pub fn get_winner(&self, session_id: SessionId) -> ContractResult<String> {
        let session = self.get_session(session_id)?;
        match (session.state, session.winner_movie()) {
            (LifecycleState::Finished, Some(movie)) => Ok(movie.name.clone()),
            (state, _) => Err(ContractError::VotingStateError { session_id, state }),
        }
    }

    pub fn get_movies(&self, session_id: SessionId) -> ContractResult<Vec<Movie>> {
        Ok(self.get_session(session_id)?.movies)
    }

    pub fn get_session(&self, session_id: SessionId) -> ContractResult<VotingSession> {
        load_session(&SqliteVotingRepository::new(self.conn), session_id)
    }
}

fn load_session(
    sessions: &impl VotingRepository,
    session_id: SessionId,
) -> ContractResult<VotingSession> {
    sessions
        .get_session(session_id)?
        .ok_or(ContractError::NotFound(EntityRef::VotingSession(session_id)))
}
