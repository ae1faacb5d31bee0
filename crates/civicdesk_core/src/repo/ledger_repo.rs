//! Native value ledger and the custody primitive used by contracts.
//!
//! # Responsibility
//! - Hold per-account native balances for the simulated substrate.
//! - Move value between accounts inside the caller's transaction.
//!
//! # Invariants
//! - Balances never go negative and never exceed `i64::MAX`.
//! - A transfer either moves the full amount or changes nothing; callers
//!   roll it back together with their own writes by dropping the transaction.

use crate::model::identity::{Amount, Identity, MAX_AMOUNT};
use crate::repo::{amount_from_db, amount_to_db, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};


/// Value transfer failure.
#[derive(Debug)]
pub enum TransferError {
    InsufficientFunds {
        account: Identity,
        available: Amount,
        requested: Amount,
    },
    /// Source and destination are the same account.
    SameAccount(Identity),
    /// Destination balance would exceed the storable range.
    BalanceOverflow(Identity),
    Repo(RepoError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientFunds {
                account,
                available,
                requested,
            } => write!(
                f,
                "insufficient funds in {account}: available {available}, requested {requested}"
            ),
            Self::SameAccount(account) => write!(f, "cannot transfer from {account} to itself"),
            Self::BalanceOverflow(account) => write!(f, "balance overflow for {account}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for TransferError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Fund-custody collaborator.
pub trait Custody {
    fn balance_of(&self, account: &Identity) -> RepoResult<Amount>;
    /// Mints `amount` into `account`, returning the new balance.
    fn credit(&self, account: &Identity, amount: Amount) -> Result<Amount, TransferError>;
    fn transfer(&self, from: &Identity, to: &Identity, amount: Amount)
        -> Result<(), TransferError>;
}

pub struct SqliteLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedger<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_balance(&self, account: &Identity, balance: Amount) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO accounts (address, balance) VALUES (?1, ?2)
             ON CONFLICT (address) DO UPDATE SET balance = excluded.balance;",
            params![account.as_str(), amount_to_db(balance)?],
        )?;
        Ok(())
    }
}

impl Custody for SqliteLedger<'_> {
    fn balance_of(&self, account: &Identity) -> RepoResult<Amount> {
        let balance: Option<i64> = self
            .conn
            .query_row(
                "SELECT balance FROM accounts WHERE address = ?1;",
                [account.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        balance.map_or(Ok(0), |value| amount_from_db(value, "accounts.balance"))
    }

    fn credit(&self, account: &Identity, amount: Amount) -> Result<Amount, TransferError> {
        let balance = checked_credit(self.balance_of(account)?, amount, account)?;
        self.write_balance(account, balance)?;
        Ok(balance)
    }

    fn transfer(
        &self,
        from: &Identity,
        to: &Identity,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if from == to {
            return Err(TransferError::SameAccount(from.clone()));
        }
        if amount == 0 {
            return Ok(());
        }

        let available = self.balance_of(from)?;
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        let credited = checked_credit(self.balance_of(to)?, amount, to)?;

        self.write_balance(from, available - amount)?;
        self.write_balance(to, credited)?;
        Ok(())
    }
}

fn checked_credit(
    current: Amount,
    amount: Amount,
    account: &Identity,
) -> Result<Amount, TransferError> {
    current
        .checked_add(amount)
        .filter(|balance| *balance <= MAX_AMOUNT)
        .ok_or_else(|| TransferError::BalanceOverflow(account.clone()))
}
