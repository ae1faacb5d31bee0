//! Contract instance (owner + pause flag) repository.

use crate::model::contract::{ContractKind, ContractRecord};
use crate::model::identity::{Identity, Timestamp};
use crate::repo::{
    bool_from_db, bool_to_int, identity_from_db, EntityRef, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension};

pub trait ContractRepository {
    /// Registers a contract instance unless it already exists.
    ///
    /// Returns `true` when a new row was inserted.
    fn register(&self, kind: ContractKind, owner: &Identity, now: Timestamp) -> RepoResult<bool>;
    fn get(&self, kind: ContractKind) -> RepoResult<Option<ContractRecord>>;
    fn set_paused(&self, kind: ContractKind, paused: bool) -> RepoResult<()>;
    fn set_owner(&self, kind: ContractKind, owner: &Identity) -> RepoResult<()>;
}

pub struct SqliteContractRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContractRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ContractRepository for SqliteContractRepository<'_> {
    fn register(&self, kind: ContractKind, owner: &Identity, now: Timestamp) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO contracts (name, owner, paused, deployed_at)
             VALUES (?1, ?2, 0, ?3);",
            params![kind.as_str(), owner.as_str(), now],
        )?;
        Ok(inserted == 1)
    }

    fn get(&self, kind: ContractKind) -> RepoResult<Option<ContractRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT owner, paused, deployed_at FROM contracts WHERE name = ?1;",
                [kind.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(owner, paused, deployed_at)| {
            Ok(ContractRecord {
                kind,
                owner: identity_from_db(owner, "contracts.owner")?,
                paused: bool_from_db(paused, "contracts.paused")?,
                deployed_at,
            })
        })
        .transpose()
    }

    fn set_paused(&self, kind: ContractKind, paused: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contracts SET paused = ?2 WHERE name = ?1;",
            params![kind.as_str(), bool_to_int(paused)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Contract(kind)));
        }
        Ok(())
    }

    fn set_owner(&self, kind: ContractKind, owner: &Identity) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contracts SET owner = ?2 WHERE name = ?1;",
            params![kind.as_str(), owner.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Contract(kind)));
        }
        Ok(())
    }
}
