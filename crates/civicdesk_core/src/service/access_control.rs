//! Single-owner authorization and pause flag per contract instance.
//!
//! # Invariants
//! - Each contract has exactly one owner, set at deploy time to the deployer.
//! - The pause flag only gates operations that explicitly consult it.

use crate::error::{ContractError, ContractResult};
use crate::model::contract::{ContractKind, ContractRecord};
use crate::model::identity::{CallContext, Identity, Timestamp};
use crate::model::validation::require_external;
use crate::repo::contract_repo::{ContractRepository, SqliteContractRepository};
use crate::repo::EntityRef;
use crate::service::atomically;
use log::info;
use rusqlite::Connection;

pub struct AccessControl<'conn> {
    contracts: SqliteContractRepository<'conn>,
    kind: ContractKind,
}

impl<'conn> AccessControl<'conn> {
    /// Binds access checks for `kind` to a connection or open transaction.
    pub fn new(conn: &'conn Connection, kind: ContractKind) -> Self {
        Self {
            contracts: SqliteContractRepository::new(conn),
            kind,
        }
    }

    pub fn record(&self) -> ContractResult<ContractRecord> {
        self.contracts
            .get(self.kind)?
            .ok_or(ContractError::NotFound(EntityRef::Contract(self.kind)))
    }

    pub fn owner(&self) -> ContractResult<Identity> {
        Ok(self.record()?.owner)
    }

    pub fn is_paused(&self) -> ContractResult<bool> {
        Ok(self.record()?.paused)
    }

    /// Fails with `NotOwner` unless `caller` owns this contract.
    pub fn ensure_owner(&self, caller: &Identity) -> ContractResult<()> {
        if &self.owner()? != caller {
            return Err(ContractError::NotOwner(caller.clone()));
        }
        Ok(())
    }

    /// Fails with `ContractPaused` while the pause flag is set.
    pub fn ensure_not_paused(&self) -> ContractResult<()> {
        if self.is_paused()? {
            return Err(ContractError::ContractPaused(self.kind));
        }
        Ok(())
    }

    /// Owner-only pause flag update.
    pub fn set_paused(&self, ctx: &CallContext, paused: bool) -> ContractResult<()> {
        self.ensure_owner(&ctx.caller)?;
        self.contracts.set_paused(self.kind, paused)?;
        Ok(())
    }

    /// Owner-only hand-off of the owner role.
    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: &Identity) -> ContractResult<()> {
        self.ensure_owner(&ctx.caller)?;
        self.contracts.set_owner(self.kind, new_owner)?;
        Ok(())
    }
}

/// Registers all contract instances owned by `deployer`.
///
/// Instances that already exist keep their owner and pause flag, so reopening
/// a file-backed database is idempotent. Returns the newly registered kinds.
pub fn deploy_contracts(
    conn: &mut Connection,
    deployer: &Identity,
    now: Timestamp,
) -> ContractResult<Vec<ContractKind>> {
    let registered = atomically(conn, |tx| {
        let contracts = SqliteContractRepository::new(tx);
        let mut registered = Vec::new();
        for kind in ContractKind::ALL {
            if contracts.register(kind, deployer, now)? {
                registered.push(kind);
            }
        }
        Ok(registered)
    })?;

    info!(
        "event=contracts_deploy module=access_control status=ok registered={}",
        registered.len()
    );
    Ok(registered)
}

/// Transfers ownership of `kind` in its own transaction.
pub fn transfer_contract_ownership(
    conn: &mut Connection,
    ctx: &CallContext,
    kind: ContractKind,
    new_owner: &Identity,
) -> ContractResult<()> {
    require_external("new_owner", new_owner)?;
    atomically(conn, |tx| {
        AccessControl::new(tx, kind).transfer_ownership(ctx, new_owner)
    })?;
    info!(
        "event=ownership_transfer module=access_control status=ok contract={}",
        kind.as_str()
    );
    Ok(())
}
