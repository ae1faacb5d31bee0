//! Core contract logic for CivicDesk.
//! This crate is the single source of truth for registry, note and voting
//! invariants.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod substrate;

pub use api::{Call, ErrorBody, Output, Request, Response};
pub use config::{ConfigError, CoreConfig};
pub use error::{ContractError, ContractResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contract::ContractKind;
pub use model::identity::{Amount, CallContext, Identity, IdentityError, Timestamp};
pub use model::lifecycle::LifecycleState;
pub use model::notification::Notification;
pub use model::voting::RevotePolicy;
pub use service::event_registry::EventRegistry;
pub use service::note_store::NoteStore;
pub use service::voting_service::VotingService;
pub use substrate::Substrate;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
