//! Contract use-case services.
//!
//! # Responsibility
//! - Orchestrate authorization, state-machine checks and repository writes
//!   into one all-or-nothing unit per call.
//! - Keep the request boundary decoupled from storage details.
//!
//! # Invariants
//! - Every mutating operation runs inside `atomically`; an `Err` anywhere in
//!   the unit drops the transaction and rolls back all writes, including
//!   value transfers.
//! - Caller identity and time arrive through `CallContext`, never ambiently.

use crate::error::ContractResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod access_control;
pub mod event_registry;
pub mod note_store;
pub mod voting_service;

/// Runs `op` in one immediate transaction and commits only on success.
pub(crate) fn atomically<T>(
    conn: &mut Connection,
    op: impl FnOnce(&Transaction<'_>) -> ContractResult<T>,
) -> ContractResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = op(&tx)?;
    tx.commit()?;
    Ok(value)
}
