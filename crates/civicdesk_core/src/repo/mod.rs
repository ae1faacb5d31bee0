//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-contract data access contracts.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Repositories never open transactions themselves; callers pass a
//!   connection or an open `Transaction` so one call spans one unit.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::contract::ContractKind;
use crate::model::event::EventId;
use crate::model::identity::{Amount, Identity};
use crate::model::note::NoteId;
use crate::model::voting::SessionId;
use rusqlite::{Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod contract_repo;
pub mod event_repo;
pub mod ledger_repo;
pub mod note_repo;
pub mod voting_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity addressed by a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Contract(ContractKind),
    Event(EventId),
    Note(NoteId),
    VotingSession(SessionId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contract(kind) => write!(f, "contract {}", kind.as_str()),
            Self::Event(id) => write!(f, "event {id}"),
            Self::Note(id) => write!(f, "note {id}"),
            Self::VotingSession(id) => write!(f, "voting session {id}"),
        }
    }
}

/// Repository error for contract persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntityRef),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn id_to_db(id: u64) -> RepoResult<i64> {
    i64::try_from(id).map_err(|_| RepoError::InvalidData(format!("id {id} exceeds i64 range")))
}

/// Storage key for a caller-supplied id; `None` when no row can carry it.
pub(crate) fn lookup_key(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

pub(crate) fn id_from_db(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative id `{value}` in {column}")))
}

pub(crate) fn amount_to_db(amount: Amount) -> RepoResult<i64> {
    i64::try_from(amount)
        .map_err(|_| RepoError::InvalidData(format!("amount {amount} exceeds storage range")))
}

pub(crate) fn amount_from_db(value: i64, column: &str) -> RepoResult<Amount> {
    Amount::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative amount `{value}` in {column}")))
}

pub(crate) fn count_from_db(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("count `{value}` out of range in {column}")))
}

pub(crate) fn identity_from_db(value: String, column: &str) -> RepoResult<Identity> {
    Identity::parse(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid identity in {column}: {err}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn bool_from_db(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

/// Allocates the next value of a named monotonic id sequence.
pub(crate) fn next_sequence_value(conn: &Connection, name: &str) -> RepoResult<u64> {
    let current: i64 = conn
        .query_row(
            "SELECT next_value FROM sequences WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| RepoError::InvalidData(format!("unknown id sequence `{name}`")))?;
    conn.execute(
        "UPDATE sequences SET next_value = next_value + 1 WHERE name = ?1;",
        [name],
    )?;
    id_from_db(current, "sequences.next_value")
}

/// Fails when any of `tables` is absent from the schema.
pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
