//! Event registry repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Participant `position` values are dense and start at 0, so
//!   `current_count` always equals the participant row count.
//! - Escrow balances are keyed by creator, not by event.

use crate::model::event::{Event, EventId, NewEvent, Participant};
use crate::model::identity::{Amount, Identity, Timestamp};
use crate::model::lifecycle::LifecycleState;
use crate::repo::{
    amount_from_db, amount_to_db, count_from_db, ensure_tables, id_from_db, id_to_db,
    identity_from_db, lookup_key, next_sequence_value, EntityRef, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    fee,
    max_capacity,
    current_count,
    state,
    registration_deadline,
    creator,
    created_at
FROM events";

pub trait EventRepository {
    fn insert_event(
        &self,
        input: &NewEvent,
        creator: &Identity,
        now: Timestamp,
    ) -> RepoResult<EventId>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Moves the event to `IsOpen` and stores its deadline.
    fn open_registration(&self, id: EventId, deadline: Timestamp) -> RepoResult<()>;
    fn set_state(&self, id: EventId, state: LifecycleState) -> RepoResult<()>;
    /// Appends one participant at `position` and sets `current_count` to
    /// `position + 1`.
    fn append_participant(
        &self,
        id: EventId,
        position: u32,
        participant: &Participant,
    ) -> RepoResult<()>;
    fn list_participants(&self, id: EventId) -> RepoResult<Vec<Participant>>;
    fn escrow_balance(&self, creator: &Identity) -> RepoResult<Amount>;
    fn set_escrow_balance(&self, creator: &Identity, balance: Amount) -> RepoResult<()>;
    fn has_created_events(&self, creator: &Identity) -> RepoResult<bool>;
}

pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Constructs a repository after checking the event schema is present.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["events", "event_participants", "escrow_balances"])?;
        Ok(Self::new(conn))
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(
        &self,
        input: &NewEvent,
        creator: &Identity,
        now: Timestamp,
    ) -> RepoResult<EventId> {
        let id = next_sequence_value(self.conn, "event")?;
        self.conn.execute(
            "INSERT INTO events (
                id,
                name,
                fee,
                max_capacity,
                current_count,
                state,
                registration_deadline,
                creator,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, NULL, ?6, ?7);",
            params![
                id_to_db(id)?,
                input.name.as_str(),
                amount_to_db(input.fee)?,
                i64::from(input.max_capacity),
                LifecycleState::Created.as_str(),
                creator.as_str(),
                now,
            ],
        )?;
        Ok(id)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let Some(db_id) = lookup_key(id) else {
            return Ok(None);
        };
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([db_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn open_registration(&self, id: EventId, deadline: Timestamp) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE events
             SET state = ?2, registration_deadline = ?3
             WHERE id = ?1;",
            params![id_to_db(id)?, LifecycleState::IsOpen.as_str(), deadline],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Event(id)));
        }
        Ok(())
    }

    fn set_state(&self, id: EventId, state: LifecycleState) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE events SET state = ?2 WHERE id = ?1;",
            params![id_to_db(id)?, state.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Event(id)));
        }
        Ok(())
    }

    fn append_participant(
        &self,
        id: EventId,
        position: u32,
        participant: &Participant,
    ) -> RepoResult<()> {
        let event_id = id_to_db(id)?;
        self.conn.execute(
            "INSERT INTO event_participants (event_id, position, address, name)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                event_id,
                i64::from(position),
                participant.address.as_str(),
                participant.name.as_str(),
            ],
        )?;
        let changed = self.conn.execute(
            "UPDATE events SET current_count = ?2 WHERE id = ?1;",
            params![event_id, i64::from(position) + 1],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Event(id)));
        }
        Ok(())
    }

    fn list_participants(&self, id: EventId) -> RepoResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT address, name
             FROM event_participants
             WHERE event_id = ?1
             ORDER BY position ASC;",
        )?;
        let Some(db_id) = lookup_key(id) else {
            return Ok(Vec::new());
        };
        let mut rows = stmt.query([db_id])?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next()? {
            participants.push(Participant {
                address: identity_from_db(row.get("address")?, "event_participants.address")?,
                name: row.get("name")?,
            });
        }
        Ok(participants)
    }

    fn escrow_balance(&self, creator: &Identity) -> RepoResult<Amount> {
        let balance: Option<i64> = self
            .conn
            .query_row(
                "SELECT balance FROM escrow_balances WHERE creator = ?1;",
                [creator.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        balance.map_or(Ok(0), |value| {
            amount_from_db(value, "escrow_balances.balance")
        })
    }

    fn set_escrow_balance(&self, creator: &Identity, balance: Amount) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO escrow_balances (creator, balance) VALUES (?1, ?2)
             ON CONFLICT (creator) DO UPDATE SET balance = excluded.balance;",
            params![creator.as_str(), amount_to_db(balance)?],
        )?;
        Ok(())
    }

    fn has_created_events(&self, creator: &Identity) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE creator = ?1);",
            [creator.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let state_text: String = row.get("state")?;
    let state = LifecycleState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid event state `{state_text}` in events.state"))
    })?;

    let event = Event {
        id: id_from_db(row.get("id")?, "events.id")?,
        name: row.get("name")?,
        fee: amount_from_db(row.get("fee")?, "events.fee")?,
        max_capacity: count_from_db(row.get("max_capacity")?, "events.max_capacity")?,
        current_count: count_from_db(row.get("current_count")?, "events.current_count")?,
        state,
        registration_deadline: row.get("registration_deadline")?,
        creator: identity_from_db(row.get("creator")?, "events.creator")?,
        created_at: row.get("created_at")?,
    };

    if event.current_count > event.max_capacity {
        return Err(RepoError::InvalidData(format!(
            "event {} has current_count above max_capacity",
            event.id
        )));
    }
    Ok(event)
}
