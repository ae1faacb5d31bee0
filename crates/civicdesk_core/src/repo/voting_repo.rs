//! Voting session repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Movies keep their input order through dense `position` values.
//! - `winner_position` is written once, together with the `finished` state.

use crate::model::identity::{Identity, Timestamp};
use crate::model::lifecycle::LifecycleState;
use crate::model::voting::{Movie, SessionId, VotingSession};
use crate::repo::{
    count_from_db, ensure_tables, id_to_db, identity_from_db, lookup_key, next_sequence_value,
    EntityRef, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension};

pub trait VotingRepository {
    fn insert_session(
        &self,
        creator: &Identity,
        movie_names: &[String],
        duration_secs: u64,
        now: Timestamp,
    ) -> RepoResult<SessionId>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<VotingSession>>;
    fn mark_open(&self, id: SessionId, deadline: Timestamp) -> RepoResult<()>;
    /// Increments one movie's count and returns the new count.
    fn increment_vote(&self, id: SessionId, position: usize) -> RepoResult<u32>;
    fn record_ballot(
        &self,
        id: SessionId,
        voter: &Identity,
        position: usize,
        cast_at: Timestamp,
    ) -> RepoResult<()>;
    fn has_ballot(&self, id: SessionId, voter: &Identity) -> RepoResult<bool>;
    fn mark_finished(&self, id: SessionId, winner_position: usize) -> RepoResult<()>;
}

pub struct SqliteVotingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVotingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &["voting_sessions", "voting_movies", "voting_ballots"],
        )?;
        Ok(Self::new(conn))
    }

    fn load_movies(&self, session_id: i64) -> RepoResult<Vec<Movie>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, vote_count
             FROM voting_movies
             WHERE session_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([session_id])?;
        let mut movies = Vec::new();
        while let Some(row) = rows.next()? {
            movies.push(Movie {
                name: row.get("name")?,
                vote_count: count_from_db(row.get("vote_count")?, "voting_movies.vote_count")?,
            });
        }
        Ok(movies)
    }
}

impl VotingRepository for SqliteVotingRepository<'_> {
    fn insert_session(
        &self,
        creator: &Identity,
        movie_names: &[String],
        duration_secs: u64,
        now: Timestamp,
    ) -> RepoResult<SessionId> {
        let id = next_sequence_value(self.conn, "voting_session")?;
        let db_id = id_to_db(id)?;
        let duration = i64::try_from(duration_secs).map_err(|_| {
            RepoError::InvalidData(format!("duration {duration_secs} exceeds storage range"))
        })?;

        self.conn.execute(
            "INSERT INTO voting_sessions (
                id,
                creator,
                state,
                duration_secs,
                deadline,
                winner_position,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5);",
            params![
                db_id,
                creator.as_str(),
                LifecycleState::Created.as_str(),
                duration,
                now,
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO voting_movies (session_id, position, name, vote_count)
             VALUES (?1, ?2, ?3, 0);",
        )?;
        for (position, name) in movie_names.iter().enumerate() {
            stmt.execute(params![db_id, position as i64, name.as_str()])?;
        }
        Ok(id)
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<VotingSession>> {
        let Some(db_id) = lookup_key(id) else {
            return Ok(None);
        };
        let row = self
            .conn
            .query_row(
                "SELECT creator, state, duration_secs, deadline, winner_position, created_at
                 FROM voting_sessions
                 WHERE id = ?1;",
                [db_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((creator, state_text, duration, deadline, winner, created_at)) = row else {
            return Ok(None);
        };

        let state = LifecycleState::parse(&state_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid voting state `{state_text}` in voting_sessions.state"
            ))
        })?;
        let movies = self.load_movies(db_id)?;
        let winner = match winner {
            Some(position) => {
                let index = usize::try_from(position)
                    .ok()
                    .filter(|index| *index < movies.len())
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "winner position `{position}` out of range for session {id}"
                        ))
                    })?;
                Some(index)
            }
            None => None,
        };

        Ok(Some(VotingSession {
            id,
            creator: identity_from_db(creator, "voting_sessions.creator")?,
            movies,
            state,
            duration_secs: u64::try_from(duration).map_err(|_| {
                RepoError::InvalidData(format!("negative duration in session {id}"))
            })?,
            deadline,
            winner,
            created_at,
        }))
    }

    fn mark_open(&self, id: SessionId, deadline: Timestamp) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE voting_sessions SET state = ?2, deadline = ?3 WHERE id = ?1;",
            params![id_to_db(id)?, LifecycleState::IsOpen.as_str(), deadline],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::VotingSession(id)));
        }
        Ok(())
    }

    fn increment_vote(&self, id: SessionId, position: usize) -> RepoResult<u32> {
        let db_id = id_to_db(id)?;
        let changed = self.conn.execute(
            "UPDATE voting_movies
             SET vote_count = vote_count + 1
             WHERE session_id = ?1 AND position = ?2;",
            params![db_id, position as i64],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::VotingSession(id)));
        }
        let count: i64 = self.conn.query_row(
            "SELECT vote_count FROM voting_movies WHERE session_id = ?1 AND position = ?2;",
            params![db_id, position as i64],
            |row| row.get(0),
        )?;
        count_from_db(count, "voting_movies.vote_count")
    }

    fn record_ballot(
        &self,
        id: SessionId,
        voter: &Identity,
        position: usize,
        cast_at: Timestamp,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO voting_ballots (session_id, voter, position, cast_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![id_to_db(id)?, voter.as_str(), position as i64, cast_at],
        )?;
        Ok(())
    }

    fn has_ballot(&self, id: SessionId, voter: &Identity) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM voting_ballots WHERE session_id = ?1 AND voter = ?2
            );",
            params![id_to_db(id)?, voter.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn mark_finished(&self, id: SessionId, winner_position: usize) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE voting_sessions SET state = ?2, winner_position = ?3 WHERE id = ?1;",
            params![
                id_to_db(id)?,
                LifecycleState::Finished.as_str(),
                winner_position as i64
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::VotingSession(id)));
        }
        Ok(())
    }
}
