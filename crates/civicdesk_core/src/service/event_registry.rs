//! Event registration use-case service.
//!
//! # Responsibility
//! - Drive the `Created -> IsOpen -> Finished` event lifecycle.
//! - Gate registrations on state, deadline, exact fee and capacity.
//! - Hold collected fees in escrow per creator until withdrawn.
//!
//! # Invariants
//! - Registration moves the fee from the caller into the registry custody
//!   account in the same transaction that records the participant.
//! - The registration that fills the last seat also moves the event to
//!   `Finished`.
//! - Escrow never goes negative; withdrawals debit escrow and pay out
//!   atomically.

use crate::error::{ContractError, ContractResult};
use crate::model::contract::ContractKind;
use crate::model::event::{
    validate_participant_name, Event, EventId, NewEvent, Participant, ParticipantList,
    RegistrationReceipt,
};
use crate::model::identity::{Amount, CallContext, Identity, Timestamp, MAX_AMOUNT};
use crate::model::lifecycle::LifecycleState;
use crate::model::validation::ValidationError;
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::ledger_repo::{Custody, SqliteLedger};
use crate::repo::EntityRef;
use crate::service::atomically;
use log::info;
use rusqlite::Connection;

pub struct EventRegistry<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> EventRegistry<'conn> {
    /// Binds the service to a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> ContractResult<Self> {
        SqliteEventRepository::try_new(conn)?;
        Ok(Self { conn })
    }

    /// Creates an event owned by the caller and returns its id.
    pub fn create_event(
        &mut self,
        ctx: &CallContext,
        name: impl Into<String>,
        fee: Amount,
        max_capacity: u32,
    ) -> ContractResult<EventId> {
        let input = NewEvent {
            name: name.into(),
            fee,
            max_capacity,
        };
        input.validate()?;

        let event_id = atomically(self.conn, |tx| {
            Ok(SqliteEventRepository::new(tx).insert_event(&input, &ctx.caller, ctx.now)?)
        })?;

        info!(
            "event=event_create module=event_registry status=ok event_id={event_id} fee={fee} max_capacity={max_capacity}"
        );
        Ok(event_id)
    }

    /// Creator-only `Created -> IsOpen` transition.
    pub fn open_registration(
        &mut self,
        ctx: &CallContext,
        event_id: EventId,
        deadline: Timestamp,
    ) -> ContractResult<()> {
        atomically(self.conn, |tx| {
            let events = SqliteEventRepository::new(tx);
            let event = load_event(&events, event_id)?;
            ensure_creator(&event, &ctx.caller)?;
            if !event.state.can_advance_to(LifecycleState::IsOpen) {
                return Err(ContractError::EventStateError {
                    event_id,
                    state: event.state,
                });
            }
            if deadline <= ctx.now {
                return Err(ValidationError::NotInFuture("deadline").into());
            }
            events.open_registration(event_id, deadline)?;
            Ok(())
        })?;

        info!("event=registration_open module=event_registry status=ok event_id={event_id} deadline={deadline}");
        Ok(())
    }

    /// Registers the caller, paying exactly the event fee into escrow.
    pub fn participant_registration(
        &mut self,
        ctx: &CallContext,
        event_id: EventId,
        name: impl Into<String>,
        paid_amount: Amount,
    ) -> ContractResult<RegistrationReceipt> {
        let name = name.into();
        validate_participant_name(&name)?;

        let receipt = atomically(self.conn, |tx| {
            let events = SqliteEventRepository::new(tx);
            let event = load_event(&events, event_id)?;

            if !event.is_accepting(ctx.now) {
                return Err(ContractError::EventNotOpen(event_id));
            }
            if paid_amount != event.fee {
                return Err(ContractError::IncorrectRegistrationFee {
                    expected: event.fee,
                    paid: paid_amount,
                });
            }
            if event.is_full() {
                return Err(ContractError::CapacityReached(event_id));
            }

            SqliteLedger::new(tx).transfer(
                &ctx.caller,
                &ContractKind::EventRegistry.custody_account(),
                paid_amount,
            )?;

            let position = event.current_count;
            events.append_participant(
                event_id,
                position,
                &Participant {
                    address: ctx.caller.clone(),
                    name,
                },
            )?;

            let current_count = position + 1;
            let closed = current_count == event.max_capacity;
            if closed {
                events.set_state(event_id, LifecycleState::Finished)?;
            }

            let escrow = events
                .escrow_balance(&event.creator)?
                .checked_add(paid_amount)
                .filter(|escrow| *escrow <= MAX_AMOUNT)
                .ok_or(ValidationError::Overflow("escrow"))?;
            events.set_escrow_balance(&event.creator, escrow)?;

            Ok(RegistrationReceipt {
                event_id,
                position,
                current_count,
                closed,
            })
        })?;

        info!(
            "event=participant_register module=event_registry status=ok event_id={event_id} current_count={} closed={}",
            receipt.current_count, receipt.closed
        );
        Ok(receipt)
    }

    /// Creator-only `IsOpen -> Finished` transition.
    pub fn close_registration(&mut self, ctx: &CallContext, event_id: EventId) -> ContractResult<()> {
        atomically(self.conn, |tx| {
            let events = SqliteEventRepository::new(tx);
            let event = load_event(&events, event_id)?;
            ensure_creator(&event, &ctx.caller)?;
            if event.state != LifecycleState::IsOpen {
                return Err(ContractError::EventNotOpen(event_id));
            }
            events.set_state(event_id, LifecycleState::Finished)?;
            Ok(())
        })?;

        info!("event=registration_close module=event_registry status=ok event_id={event_id}");
        Ok(())
    }

    /// Pays `amount` out of the caller's escrow. Returns the remaining escrow.
    pub fn withdraw_payments(&mut self, ctx: &CallContext, amount: Amount) -> ContractResult<Amount> {
        if amount == 0 {
            return Err(ValidationError::Zero("amount").into());
        }

        let remaining = atomically(self.conn, |tx| {
            let events = SqliteEventRepository::new(tx);
            if !events.has_created_events(&ctx.caller)? {
                return Err(ContractError::NotOwner(ctx.caller.clone()));
            }

            let available = events.escrow_balance(&ctx.caller)?;
            if amount > available {
                return Err(ContractError::InsufficientEscrow {
                    available,
                    requested: amount,
                });
            }
            let remaining = available - amount;
            events.set_escrow_balance(&ctx.caller, remaining)?;

            SqliteLedger::new(tx).transfer(
                &ContractKind::EventRegistry.custody_account(),
                &ctx.caller,
                amount,
            )?;
            Ok(remaining)
        })?;

        info!("event=payments_withdraw module=event_registry status=ok amount={amount} remaining={remaining}");
        Ok(remaining)
    }

    /// Registered addresses and names, in registration order.
    pub fn get_participants(&self, event_id: EventId) -> ContractResult<ParticipantList> {
        let events = SqliteEventRepository::new(self.conn);
        load_event(&events, event_id)?;
        Ok(events.list_participants(event_id)?.into_iter().collect())
    }

    pub fn get_event(&self, event_id: EventId) -> ContractResult<Event> {
        load_event(&SqliteEventRepository::new(self.conn), event_id)
    }

    pub fn escrow_balance(&self, creator: &Identity) -> ContractResult<Amount> {
        Ok(SqliteEventRepository::new(self.conn).escrow_balance(creator)?)
    }
}

fn load_event(events: &impl EventRepository, event_id: EventId) -> ContractResult<Event> {
    events
        .get_event(event_id)?
        .ok_or(ContractError::NotFound(EntityRef::Event(event_id)))
}

fn ensure_creator(event: &Event, caller: &Identity) -> ContractResult<()> {
    if &event.creator != caller {
        return Err(ContractError::NotOwner(caller.clone()));
    }
    Ok(())
}
