//! Note/share repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes and their share lists.
//! - Own share-list replacement with whole-set semantics.
//!
//! # Invariants
//! - `replace_sharing` deletes and re-inserts the full share set; callers run
//!   it inside one transaction so no partial set is ever visible.
//! - Owner note lists are ordered by note id, which is allocation order.
//! - Deleting a note cascades to its share rows.

use crate::model::identity::{Identity, Timestamp};
use crate::model::note::{Note, NoteId, SharingSettings};
use crate::repo::{
    bool_from_db, bool_to_int, ensure_tables, id_from_db, id_to_db, identity_from_db, lookup_key,
    next_sequence_value, EntityRef, RepoError, RepoResult,
};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// Insert model for one new note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote<'a> {
    pub owner: &'a Identity,
    pub title: &'a str,
    pub content: &'a str,
    pub created_at: Timestamp,
    pub sharing: &'a SharingSettings,
}

pub trait NoteRepository {
    fn create_note(&self, note: &NewNote<'_>) -> RepoResult<NoteId>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Replaces `is_public` and the whole share set.
    fn replace_sharing(&self, id: NoteId, sharing: &SharingSettings) -> RepoResult<()>;
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    /// Note ids owned by `owner`, in creation order.
    fn list_owner_note_ids(&self, owner: &Identity) -> RepoResult<Vec<NoteId>>;
}

/// SQLite-backed notes/shares repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self::new(conn))
    }

    fn insert_shares(&self, note_id: i64, shared_with: &BTreeSet<Identity>) -> RepoResult<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO note_shares (note_id, address) VALUES (?1, ?2);")?;
        for address in shared_with {
            stmt.execute(params![note_id, address.as_str()])?;
        }
        Ok(())
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &NewNote<'_>) -> RepoResult<NoteId> {
        let id = next_sequence_value(self.conn, "note")?;
        let db_id = id_to_db(id)?;
        self.conn.execute(
            "INSERT INTO notes (id, owner, title, content, created_at, is_public)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                db_id,
                note.owner.as_str(),
                note.title,
                note.content,
                note.created_at,
                bool_to_int(note.sharing.is_public),
            ],
        )?;
        self.insert_shares(db_id, &note.sharing.shared_with)?;
        Ok(id)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let Some(db_id) = lookup_key(id) else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                owner,
                title,
                content,
                created_at,
                is_public
             FROM notes
             WHERE id = ?1;",
        )?;

        let mut rows = stmt.query([db_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Note {
                id: id_from_db(row.get("id")?, "notes.id")?,
                owner: identity_from_db(row.get("owner")?, "notes.owner")?,
                title: row.get("title")?,
                content: row.get("content")?,
                created_at: row.get("created_at")?,
                is_public: bool_from_db(row.get("is_public")?, "notes.is_public")?,
                shared_with: load_shares_for_note(self.conn, db_id)?,
            }));
        }

        Ok(None)
    }

    fn replace_sharing(&self, id: NoteId, sharing: &SharingSettings) -> RepoResult<()> {
        let db_id = id_to_db(id)?;
        let changed = self.conn.execute(
            "UPDATE notes SET is_public = ?2 WHERE id = ?1;",
            params![db_id, bool_to_int(sharing.is_public)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Note(id)));
        }

        self.conn
            .execute("DELETE FROM note_shares WHERE note_id = ?1;", [db_id])?;
        self.insert_shares(db_id, &sharing.shared_with)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id_to_db(id)?])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Note(id)));
        }
        Ok(())
    }

    fn list_owner_note_ids(&self, owner: &Identity) -> RepoResult<Vec<NoteId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM notes WHERE owner = ?1 ORDER BY id ASC;")?;
        let mut rows = stmt.query([owner.as_str()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(id_from_db(row.get(0)?, "notes.id")?);
        }
        Ok(ids)
    }
}

fn load_shares_for_note(conn: &Connection, note_id: i64) -> RepoResult<BTreeSet<Identity>> {
    let mut stmt = conn.prepare(
        "SELECT address
         FROM note_shares
         WHERE note_id = ?1
         ORDER BY address ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut shared_with = BTreeSet::new();
    while let Some(row) = rows.next()? {
        shared_with.insert(identity_from_db(row.get(0)?, "note_shares.address")?);
    }
    Ok(shared_with)
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    ensure_tables(conn, &["notes", "note_shares"])?;

    for column in ["id", "owner", "title", "content", "created_at", "is_public"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::InvalidData(format!(
                "table `notes` is missing column `{column}`"
            )));
        }
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
