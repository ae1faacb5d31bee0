//! Domain model for the event, note and voting contracts.
//!
//! # Responsibility
//! - Define entity records and the pure predicates that gate mutations.
//! - Keep validation rules independent of storage.
//!
//! # Invariants
//! - Every entity is identified by a monotonic `u64` id.
//! - Caller identities are opaque `Identity` values, never object graphs.

pub mod contract;
pub mod event;
pub mod identity;
pub mod lifecycle;
pub mod note;
pub mod notification;
pub mod validation;
pub mod voting;
