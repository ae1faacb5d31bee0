//! Ballot/voting session model and tally rules.
//!
//! # Invariants
//! - Movie names are unique within a session and keep input order.
//! - Vote counts only ever increase.
//! - The winner is the first maximum in list order and is fixed once the
//!   session is `Finished`.

use crate::model::identity::{Identity, Timestamp};
use crate::model::lifecycle::LifecycleState;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type SessionId = u64;

pub const MAX_MOVIES_PER_SESSION: usize = 64;
pub const MAX_MOVIE_NAME_CHARS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub name: String,
    pub vote_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    pub id: SessionId,
    pub creator: Identity,
    pub movies: Vec<Movie>,
    pub state: LifecycleState,
    pub duration_secs: u64,
    /// Set by `start_voting`.
    pub deadline: Option<Timestamp>,
    /// Index into `movies`; set by `end_voting`.
    pub winner: Option<usize>,
    pub created_at: Timestamp,
}

impl VotingSession {
    /// Whether a ballot cast at `now` passes the state and deadline gate.
    pub fn is_accepting_votes(&self, now: Timestamp) -> bool {
        self.state == LifecycleState::IsOpen && self.deadline.is_some_and(|deadline| now < deadline)
    }

    /// Whether `end_voting` may run at `now`.
    pub fn can_end(&self, now: Timestamp) -> bool {
        self.state == LifecycleState::IsOpen
            && self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn position_of(&self, movie_name: &str) -> Option<usize> {
        self.movies.iter().position(|movie| movie.name == movie_name)
    }

    pub fn winner_movie(&self) -> Option<&Movie> {
        self.winner.and_then(|index| self.movies.get(index))
    }
}

/// Whether one caller may cast more than one ballot per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevotePolicy {
    #[default]
    Allow,
    OncePerSession,
}

impl RevotePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "once_per_session" | "once" => Some(Self::OncePerSession),
            _ => None,
        }
    }
}

/// Index of the first movie holding the strictly highest count.
///
/// Ties keep the earliest position. Returns `None` only for an empty slice.
pub fn first_maximum(movies: &[Movie]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, movie) in movies.iter().enumerate() {
        match best {
            Some((_, count)) if movie.vote_count <= count => {}
            _ => best = Some((index, movie.vote_count)),
        }
    }
    best.map(|(index, _)| index)
}

/// Validates the candidate list and duration for `create_voting`.
pub fn validate_ballot(movie_names: &[String], duration_secs: u64) -> Result<(), ValidationError> {
    if movie_names.is_empty() {
        return Err(ValidationError::Empty("movie_names"));
    }
    if movie_names.len() > MAX_MOVIES_PER_SESSION {
        return Err(ValidationError::TooLong {
            field: "movie_names",
            max: MAX_MOVIES_PER_SESSION,
        });
    }
    if duration_secs == 0 {
        return Err(ValidationError::Zero("duration_secs"));
    }
    if i64::try_from(duration_secs).is_err() {
        return Err(ValidationError::Overflow("duration_secs"));
    }

    let mut seen = HashSet::with_capacity(movie_names.len());
    for (index, name) in movie_names.iter().enumerate() {
        require_text("movie_names", name, MAX_MOVIE_NAME_CHARS)?;
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "movie_names",
                index,
            });
        }
    }
    Ok(())
}

/// `now + duration_secs`, rejecting overflow.
pub fn deadline_after(now: Timestamp, duration_secs: u64) -> Result<Timestamp, ValidationError> {
    i64::try_from(duration_secs)
        .ok()
        .and_then(|duration| now.checked_add(duration))
        .ok_or(ValidationError::Overflow("duration_secs"))
}

#[cfg(test)]
mod tests {
    use super::{deadline_after, first_maximum, validate_ballot, Movie, RevotePolicy};
    use crate::model::validation::ValidationError;

    fn movies(counts: &[u32]) -> Vec<Movie> {
        counts
            .iter()
            .enumerate()
            .map(|(idx, count)| Movie {
                name: format!("m{idx}"),
                vote_count: *count,
            })
            .collect()
    }

    #[test]
    fn first_maximum_prefers_earliest_on_ties() {
        assert_eq!(first_maximum(&movies(&[1, 3, 3, 2])), Some(1));
        assert_eq!(first_maximum(&movies(&[0, 0, 0])), Some(0));
        assert_eq!(first_maximum(&movies(&[2, 1, 5])), Some(2));
        assert_eq!(first_maximum(&[]), None);
    }

    #[test]
    fn ballot_validation_rejects_duplicates_and_zero_duration() {
        let names = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(
            validate_ballot(&names, 60),
            Err(ValidationError::Duplicate {
                field: "movie_names",
                index: 2
            })
        );
        assert_eq!(
            validate_ballot(&["A".to_string()], 0),
            Err(ValidationError::Zero("duration_secs"))
        );
        assert_eq!(
            validate_ballot(&[], 60),
            Err(ValidationError::Empty("movie_names"))
        );
    }

    #[test]
    fn deadline_after_detects_overflow() {
        assert_eq!(deadline_after(10, 5), Ok(15));
        assert!(deadline_after(i64::MAX, 1).is_err());
        assert!(deadline_after(0, u64::MAX).is_err());
    }

    #[test]
    fn revote_policy_parses_config_values() {
        assert_eq!(RevotePolicy::parse("ALLOW"), Some(RevotePolicy::Allow));
        assert_eq!(
            RevotePolicy::parse("once_per_session"),
            Some(RevotePolicy::OncePerSession)
        );
        assert_eq!(RevotePolicy::parse("never"), None);
    }
}
