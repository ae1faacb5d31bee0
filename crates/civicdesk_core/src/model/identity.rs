//! Caller identity and per-call context.
//!
//! # Responsibility
//! - Represent substrate-verified caller identities as opaque values.
//! - Carry the authenticated caller and substrate time into every operation.
//!
//! # Invariants
//! - An `Identity` always matches `^[A-Za-z0-9_.:-]{1,128}$`.
//! - Identities under `contract:` belong to contract custody accounts and
//!   are never accepted as callers or owners at the request boundary.
//! - Core operations never read caller identity from request bodies; it is
//!   always threaded explicitly through `CallContext`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]{1,128}$").expect("valid identity regex"));

/// Prefix of ledger accounts held by a contract instance.
pub const CUSTODY_PREFIX: &str = "contract:";

/// Native value amount in integer substrate units.
pub type Amount = u64;

/// Largest amount any balance, fee or escrow can hold.
pub const MAX_AMOUNT: Amount = i64::MAX as Amount;

/// Substrate time in epoch seconds.
pub type Timestamp = i64;

/// Opaque account identity supplied by the substrate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parses and validates one identity value.
    ///
    /// # Errors
    /// - Returns `IdentityError` when the value is empty, too long, or
    ///   contains characters outside `[A-Za-z0-9_.:-]`.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentityError> {
        let value = value.into();
        if IDENTITY_RE.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentityError(value))
        }
    }

    /// Custody account of the contract named `contract`.
    pub(crate) fn custody(contract: &str) -> Self {
        Self(format!("{CUSTODY_PREFIX}{contract}"))
    }

    /// Whether this identity names a contract custody account.
    pub fn is_custody(&self) -> bool {
        self.0.starts_with(CUSTODY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected identity value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError(String);

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Only the length is reported; the raw value is caller-controlled.
        write!(
            f,
            "invalid identity ({} chars); expected 1-128 chars of [A-Za-z0-9_.:-]",
            self.0.chars().count()
        )
    }
}

impl Error for IdentityError {}

/// Authenticated caller plus substrate-supplied current time for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Identity,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Identity, now: Timestamp) -> Self {
        Self { caller, now }
    }
}
