use civicdesk_core::db::open_db_in_memory;
use civicdesk_core::model::voting::Movie;
use civicdesk_core::{
    CallContext, ContractError, Identity, LifecycleState, Notification, RevotePolicy,
    VotingService,
};
use rusqlite::Connection;

fn id(value: &str) -> Identity {
    Identity::parse(value).unwrap()
}

fn ctx(caller: &str, now: i64) -> CallContext {
    CallContext::new(id(caller), now)
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn counts(movies: &[Movie]) -> Vec<u32> {
    movies.iter().map(|movie| movie.vote_count).collect()
}

/// Creates and starts a 100s session at t=0, deadline t=100.
fn started_session(conn: &mut Connection, policy: RevotePolicy, movies: &[&str]) -> u64 {
    let mut voting = VotingService::try_new(conn, policy).unwrap();
    let (session_id, _) = voting
        .create_voting(&ctx("host", 0), names(movies), 100)
        .unwrap();
    voting.start_voting(&ctx("host", 0), session_id).unwrap();
    session_id
}

#[test]
fn session_ids_start_at_zero_and_notify_creation() {
    let mut conn = open_db_in_memory().unwrap();
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();

    let (first, created) = voting
        .create_voting(&ctx("host", 50), names(&["Alien", "Heat"]), 30)
        .unwrap();
    let (second, _) = voting
        .create_voting(&ctx("host", 51), names(&["Up"]), 30)
        .unwrap();

    assert_eq!((first, second), (0, 1));
    assert_eq!(
        created,
        Notification::VotingCreated {
            session_id: 0,
            deadline: 80
        }
    );

    let session = voting.get_session(first).unwrap();
    assert_eq!(session.state, LifecycleState::Created);
    assert_eq!(counts(&session.movies), vec![0, 0]);
    assert_eq!(session.deadline, None);
}

#[test]
fn create_voting_rejects_bad_ballots() {
    let mut conn = open_db_in_memory().unwrap();
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();

    for (movies, duration) in [
        (names(&[]), 10),
        (names(&["Alien", "Alien"]), 10),
        (names(&["Alien", " "]), 10),
        (names(&["Alien"]), 0),
    ] {
        let err = voting
            .create_voting(&ctx("host", 0), movies, duration)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}

#[test]
fn start_voting_is_creator_only_and_sets_deadline() {
    let mut conn = open_db_in_memory().unwrap();
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();
    let (session_id, _) = voting
        .create_voting(&ctx("host", 0), names(&["Alien"]), 60)
        .unwrap();

    assert!(matches!(
        voting.start_voting(&ctx("guest", 5), session_id).unwrap_err(),
        ContractError::NotOwner(_)
    ));

    let started = voting.start_voting(&ctx("host", 10), session_id).unwrap();
    assert_eq!(
        started,
        Notification::VotingStarted {
            session_id,
            deadline: 70
        }
    );

    assert!(matches!(
        voting.start_voting(&ctx("host", 11), session_id).unwrap_err(),
        ContractError::VotingStateError {
            state: LifecycleState::IsOpen,
            ..
        }
    ));
}

#[test]
fn votes_outside_the_open_window_change_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();
    let (session_id, _) = voting
        .create_voting(&ctx("host", 0), names(&["Alien", "Heat"]), 100)
        .unwrap();

    let early = voting.vote(&ctx("v1", 1), session_id, "Alien").unwrap_err();
    assert!(matches!(
        early,
        ContractError::VotingStateError {
            state: LifecycleState::Created,
            ..
        }
    ));

    voting.start_voting(&ctx("host", 0), session_id).unwrap();
    voting.vote(&ctx("v1", 99), session_id, "Alien").unwrap();

    let late = voting.vote(&ctx("v2", 100), session_id, "Heat").unwrap_err();
    assert!(matches!(late, ContractError::VotingStateError { .. }));

    let unknown = voting.vote(&ctx("v3", 50), session_id, "Jaws").unwrap_err();
    assert!(matches!(unknown, ContractError::UnknownCandidate(_)));

    assert_eq!(counts(&voting.get_movies(session_id).unwrap()), vec![1, 0]);
}

#[test]
fn end_voting_waits_for_deadline_and_fixes_first_maximum() {
    let mut conn = open_db_in_memory().unwrap();
    let session_id = started_session(&mut conn, RevotePolicy::Allow, &["Alien", "Heat", "Up"]);
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();

    voting.vote(&ctx("v1", 10), session_id, "Heat").unwrap();
    voting.vote(&ctx("v2", 11), session_id, "Up").unwrap();
    voting.vote(&ctx("v3", 12), session_id, "Up").unwrap();
    let voted = voting.vote(&ctx("v4", 13), session_id, "Heat").unwrap();
    assert_eq!(
        voted,
        Notification::Voted {
            session_id,
            voter: id("v4"),
            movie: "Heat".to_string()
        }
    );

    assert!(matches!(
        voting.get_winner(session_id).unwrap_err(),
        ContractError::VotingStateError {
            state: LifecycleState::IsOpen,
            ..
        }
    ));
    assert!(matches!(
        voting.end_voting(&ctx("anyone", 99), session_id).unwrap_err(),
        ContractError::VotingStateError { .. }
    ));

    let ended = voting.end_voting(&ctx("anyone", 100), session_id).unwrap();
    assert_eq!(
        ended,
        Notification::VotingEnded {
            session_id,
            winner: "Heat".to_string(),
            votes: 2
        }
    );

    for _ in 0..3 {
        assert_eq!(voting.get_winner(session_id).unwrap(), "Heat");
    }
    assert!(matches!(
        voting.end_voting(&ctx("anyone", 200), session_id).unwrap_err(),
        ContractError::VotingStateError {
            state: LifecycleState::Finished,
            ..
        }
    ));
    assert!(voting.vote(&ctx("v5", 150), session_id, "Up").is_err());
    assert_eq!(counts(&voting.get_movies(session_id).unwrap()), vec![0, 2, 2]);
}

#[test]
fn session_without_votes_elects_first_movie() {
    let mut conn = open_db_in_memory().unwrap();
    let session_id = started_session(&mut conn, RevotePolicy::Allow, &["Alien", "Heat"]);
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();

    voting.end_voting(&ctx("host", 100), session_id).unwrap();
    assert_eq!(voting.get_winner(session_id).unwrap(), "Alien");
}

#[test]
fn revote_policy_controls_repeat_ballots() {
    let mut conn = open_db_in_memory().unwrap();

    let allow = started_session(&mut conn, RevotePolicy::Allow, &["Alien"]);
    {
        let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();
        voting.vote(&ctx("v1", 1), allow, "Alien").unwrap();
        voting.vote(&ctx("v1", 2), allow, "Alien").unwrap();
        assert_eq!(counts(&voting.get_movies(allow).unwrap()), vec![2]);
    }

    let once = started_session(&mut conn, RevotePolicy::OncePerSession, &["Alien", "Heat"]);
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::OncePerSession).unwrap();
    voting.vote(&ctx("v1", 1), once, "Alien").unwrap();
    let err = voting.vote(&ctx("v1", 2), once, "Heat").unwrap_err();
    assert!(matches!(err, ContractError::AlreadyVoted(session) if session == once));
    voting.vote(&ctx("v2", 3), once, "Heat").unwrap();
    assert_eq!(counts(&voting.get_movies(once).unwrap()), vec![1, 1]);
}

#[test]
fn unknown_session_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut voting = VotingService::try_new(&mut conn, RevotePolicy::Allow).unwrap();
    assert!(matches!(
        voting.start_voting(&ctx("host", 0), 7).unwrap_err(),
        ContractError::NotFound(_)
    ));
    assert!(matches!(
        voting.get_movies(7).unwrap_err(),
        ContractError::NotFound(_)
    ));
    assert!(matches!(
        voting.get_session(u64::MAX).unwrap_err(),
        ContractError::NotFound(_)
    ));
    assert!(matches!(
        voting.vote(&ctx("v1", 1), u64::MAX, "Alien").unwrap_err(),
        ContractError::NotFound(_)
    ));
}
