//! Note use-case service.
//!
//! # Responsibility
//! - Create, read, share and delete notes on behalf of authenticated callers.
//! - Expose the contract owner's pause/resume circuit breaker.
//!
//! # Invariants
//! - `create_note` is the only operation gated by the pause flag.
//! - `read_note` fails closed: an unauthorized caller gets `AccessDenied`,
//!   never partial data.
//! - Sharing updates replace flag and share set in one transaction.

use crate::error::{ContractError, ContractResult};
use crate::model::contract::ContractKind;
use crate::model::identity::{CallContext, Identity};
use crate::model::note::{validate_note_text, Note, NoteId, NoteView, SharingSettings};
use crate::repo::note_repo::{NewNote, NoteRepository, SqliteNoteRepository};
use crate::repo::EntityRef;
use crate::service::access_control::AccessControl;
use crate::service::atomically;
use log::info;
use rusqlite::Connection;

pub struct NoteStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> NoteStore<'conn> {
    /// Binds the service to a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> ContractResult<Self> {
        SqliteNoteRepository::try_new(conn)?;
        Ok(Self { conn })
    }

    /// Creates a note owned by the caller and returns its id.
    pub fn create_note(
        &mut self,
        ctx: &CallContext,
        title: impl Into<String>,
        content: impl Into<String>,
        is_public: bool,
        shared_with: Vec<Identity>,
    ) -> ContractResult<NoteId> {
        let title = title.into();
        let content = content.into();
        validate_note_text(&title, &content)?;
        let sharing = SharingSettings::new(is_public, shared_with)?;

        let note_id = atomically(self.conn, |tx| {
            AccessControl::new(tx, ContractKind::NoteStore).ensure_not_paused()?;
            let note_id = SqliteNoteRepository::new(tx).create_note(&NewNote {
                owner: &ctx.caller,
                title: &title,
                content: &content,
                created_at: ctx.now,
                sharing: &sharing,
            })?;
            Ok(note_id)
        })?;

        info!(
            "event=note_create module=note_store status=ok note_id={note_id} is_public={} shared_count={}",
            sharing.is_public,
            sharing.shared_with.len()
        );
        Ok(note_id)
    }

    /// Returns `(title, content, created_at)` when the caller may read the note.
    pub fn read_note(&self, ctx: &CallContext, note_id: NoteId) -> ContractResult<NoteView> {
        let note = self.load_note(note_id)?;
        if !note.is_readable_by(&ctx.caller) {
            return Err(ContractError::AccessDenied(note_id));
        }
        Ok(note.view())
    }

    /// Owner-only replacement of `is_public` and the share list.
    pub fn update_sharing_settings(
        &mut self,
        ctx: &CallContext,
        note_id: NoteId,
        is_public: bool,
        shared_with: Vec<Identity>,
    ) -> ContractResult<()> {
        let sharing = SharingSettings::new(is_public, shared_with)?;

        atomically(self.conn, |tx| {
            let notes = SqliteNoteRepository::new(tx);
            let note = load_note(&notes, note_id)?;
            if note.owner != ctx.caller {
                return Err(ContractError::NotOwner(ctx.caller.clone()));
            }
            notes.replace_sharing(note_id, &sharing)?;
            Ok(())
        })?;

        info!(
            "event=note_share_update module=note_store status=ok note_id={note_id} is_public={} shared_count={}",
            sharing.is_public,
            sharing.shared_with.len()
        );
        Ok(())
    }

    /// Owner-only delete of the note and its entry in the owner's list.
    pub fn delete_note(&mut self, ctx: &CallContext, note_id: NoteId) -> ContractResult<()> {
        atomically(self.conn, |tx| {
            let notes = SqliteNoteRepository::new(tx);
            let note = load_note(&notes, note_id)?;
            if note.owner != ctx.caller {
                return Err(ContractError::DeleteForbidden(note_id));
            }
            notes.delete_note(note_id)?;
            Ok(())
        })?;

        info!("event=note_delete module=note_store status=ok note_id={note_id}");
        Ok(())
    }

    /// Note ids owned by `owner`, in creation order.
    pub fn get_user_notes(&self, owner: &Identity) -> ContractResult<Vec<NoteId>> {
        Ok(SqliteNoteRepository::new(self.conn).list_owner_note_ids(owner)?)
    }

    /// Owner-only view of a note's current visibility settings.
    pub fn sharing_settings(
        &self,
        ctx: &CallContext,
        note_id: NoteId,
    ) -> ContractResult<SharingSettings> {
        let note = self.load_note(note_id)?;
        if note.owner != ctx.caller {
            return Err(ContractError::NotOwner(ctx.caller.clone()));
        }
        Ok(SharingSettings {
            is_public: note.is_public,
            shared_with: note.shared_with,
        })
    }

    pub fn pause_contract(&mut self, ctx: &CallContext) -> ContractResult<()> {
        self.set_paused(ctx, true)
    }

    pub fn resume_contract(&mut self, ctx: &CallContext) -> ContractResult<()> {
        self.set_paused(ctx, false)
    }

    pub fn is_paused(&self) -> ContractResult<bool> {
        AccessControl::new(self.conn, ContractKind::NoteStore).is_paused()
    }

    fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> ContractResult<()> {
        atomically(self.conn, |tx| {
            AccessControl::new(tx, ContractKind::NoteStore).set_paused(ctx, paused)
        })?;
        info!("event=contract_pause module=note_store status=ok paused={paused}");
        Ok(())
    }

    fn load_note(&self, note_id: NoteId) -> ContractResult<Note> {
        load_note(&SqliteNoteRepository::new(self.conn), note_id)
    }
}

fn load_note(notes: &impl NoteRepository, note_id: NoteId) -> ContractResult<Note> {
    notes
        .get_note(note_id)?
        .ok_or(ContractError::NotFound(EntityRef::Note(note_id)))
}
