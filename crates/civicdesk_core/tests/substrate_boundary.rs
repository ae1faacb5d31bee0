use civicdesk_core::{
    Call, CoreConfig, Identity, Notification, Output, Request, Response, RevotePolicy, Substrate,
};
use std::sync::Arc;
use std::thread;

fn id(value: &str) -> Identity {
    Identity::parse(value).unwrap()
}

fn submit_json(substrate: &Substrate, json: &str) -> Response {
    let request: Request = serde_json::from_str(json).unwrap();
    substrate.submit(request)
}

#[test]
fn json_requests_drive_the_full_event_flow() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();
    substrate.fund(&id("alice"), 100).unwrap();

    let created = submit_json(
        &substrate,
        r#"{"caller":"org","now":1,"operation":"create_event","name":"Conf","fee":40,"max_capacity":10}"#,
    );
    assert!(created.ok);
    assert_eq!(created.output, Some(Output::EventId(1)));

    let opened = submit_json(
        &substrate,
        r#"{"caller":"org","now":2,"operation":"open_registration","event_id":1,"deadline":100}"#,
    );
    assert_eq!(opened.output, Some(Output::Unit));

    let registered = submit_json(
        &substrate,
        r#"{"caller":"alice","now":3,"operation":"participant_registration","event_id":1,"name":"Alice","paid_amount":40}"#,
    );
    assert!(registered.ok, "{registered:?}");

    let withdrawn = submit_json(
        &substrate,
        r#"{"caller":"org","now":4,"operation":"withdraw_payments","amount":40}"#,
    );
    assert_eq!(withdrawn.output, Some(Output::Amount(0)));

    assert_eq!(substrate.balance_of(&id("alice")).unwrap(), 60);
    assert_eq!(substrate.balance_of(&id("org")).unwrap(), 40);

    let value = serde_json::to_value(&withdrawn).unwrap();
    assert_eq!(value["sequence"], 4);
    assert_eq!(value["operation"], "withdraw_payments");
    assert_eq!(value["output"]["type"], "amount");
}

#[test]
fn insufficient_funds_rolls_back_the_whole_registration() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();
    substrate.fund(&id("bob"), 5).unwrap();
    substrate.submit(Request::new(
        id("org"),
        0,
        Call::CreateEvent {
            name: "Conf".to_string(),
            fee: 10,
            max_capacity: 1,
        },
    ));
    substrate.submit(Request::new(
        id("org"),
        0,
        Call::OpenRegistration {
            event_id: 1,
            deadline: 50,
        },
    ));

    let response = substrate.submit(Request::new(
        id("bob"),
        1,
        Call::ParticipantRegistration {
            event_id: 1,
            name: "Bob".to_string(),
            paid_amount: 10,
        },
    ));
    assert!(!response.ok);
    assert_eq!(response.error_code(), Some("insufficient_funds"));
    assert!(response.output.is_none());

    let event = substrate.submit(Request::new(id("org"), 2, Call::GetEvent { event_id: 1 }));
    match event.output {
        Some(Output::Event(event)) => assert_eq!(event.current_count, 0),
        other => panic!("unexpected output: {other:?}"),
    }
    let escrow = substrate.submit(Request::new(
        id("org"),
        3,
        Call::EscrowBalance { creator: id("org") },
    ));
    assert_eq!(escrow.output, Some(Output::Amount(0)));
    assert_eq!(substrate.balance_of(&id("bob")).unwrap(), 5);
}

#[test]
fn voting_calls_carry_notifications() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();

    let created = substrate.submit(Request::new(
        id("host"),
        10,
        Call::CreateVoting {
            movie_names: vec!["Alien".to_string(), "Heat".to_string()],
            duration_secs: 5,
        },
    ));
    assert_eq!(created.output, Some(Output::SessionId(0)));
    assert_eq!(
        created.notifications,
        vec![Notification::VotingCreated {
            session_id: 0,
            deadline: 15
        }]
    );

    substrate.submit(Request::new(id("host"), 10, Call::StartVoting { session_id: 0 }));
    let voted = substrate.submit(Request::new(
        id("fan"),
        11,
        Call::Vote {
            session_id: 0,
            movie_name: "Heat".to_string(),
        },
    ));
    let value = serde_json::to_value(&voted).unwrap();
    assert_eq!(value["notifications"][0]["kind"], "voted");
    assert_eq!(value["notifications"][0]["voter"], "fan");

    let ended = substrate.submit(Request::new(id("fan"), 15, Call::EndVoting { session_id: 0 }));
    assert_eq!(
        ended.notifications,
        vec![Notification::VotingEnded {
            session_id: 0,
            winner: "Heat".to_string(),
            votes: 1
        }]
    );

    let winner = substrate.submit(Request::new(id("anyone"), 16, Call::GetWinner { session_id: 0 }));
    assert_eq!(winner.output, Some(Output::Winner("Heat".to_string())));
    assert!(winner.notifications.is_empty());
}

#[test]
fn configured_revote_policy_reaches_the_voting_contract() {
    let config = CoreConfig {
        revote_policy: RevotePolicy::OncePerSession,
        ..CoreConfig::default()
    };
    let substrate = Substrate::open(&config, &id("deployer"), 0).unwrap();
    assert_eq!(substrate.revote_policy(), RevotePolicy::OncePerSession);

    substrate.submit(Request::new(
        id("host"),
        0,
        Call::CreateVoting {
            movie_names: vec!["Alien".to_string()],
            duration_secs: 60,
        },
    ));
    substrate.submit(Request::new(id("host"), 0, Call::StartVoting { session_id: 0 }));
    let vote = || Call::Vote {
        session_id: 0,
        movie_name: "Alien".to_string(),
    };

    assert!(substrate.submit(Request::new(id("fan"), 1, vote())).ok);
    let again = substrate.submit(Request::new(id("fan"), 2, vote()));
    assert_eq!(again.error_code(), Some("already_voted"));
}

#[test]
fn ownership_transfer_moves_pause_authority() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();

    let transferred = substrate.submit(Request::new(
        id("deployer"),
        1,
        Call::TransferOwnership {
            contract: civicdesk_core::ContractKind::NoteStore,
            new_owner: id("heir"),
        },
    ));
    assert!(transferred.ok);

    let owner = submit_json(
        &substrate,
        r#"{"caller":"x","now":2,"operation":"contract_owner","contract":"note_store"}"#,
    );
    assert_eq!(owner.output, Some(Output::Identity(id("heir"))));

    let old = substrate.submit(Request::new(id("deployer"), 3, Call::PauseContract));
    assert_eq!(old.error_code(), Some("not_owner"));
    assert!(substrate.submit(Request::new(id("heir"), 4, Call::PauseContract)).ok);

    let paused = substrate.submit(Request::new(id("x"), 5, Call::IsPaused));
    assert_eq!(paused.output, Some(Output::Flag(true)));
}

#[test]
fn out_of_range_ids_and_fees_are_caller_errors() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();

    for json in [
        r#"{"caller":"alice","now":1,"operation":"read_note","note_id":18446744073709551615}"#,
        r#"{"caller":"alice","now":1,"operation":"get_event","event_id":18446744073709551615}"#,
        r#"{"caller":"alice","now":1,"operation":"get_session","session_id":18446744073709551615}"#,
        r#"{"caller":"alice","now":1,"operation":"delete_note","note_id":18446744073709551615}"#,
    ] {
        let response = submit_json(&substrate, json);
        assert_eq!(response.error_code(), Some("not_found"), "{json}");
    }

    let fee = submit_json(
        &substrate,
        r#"{"caller":"org","now":1,"operation":"create_event","name":"Conf","fee":18446744073709551615,"max_capacity":10}"#,
    );
    assert_eq!(fee.error_code(), Some("invalid_input"));

    let next = submit_json(
        &substrate,
        r#"{"caller":"org","now":2,"operation":"create_event","name":"Conf","fee":1,"max_capacity":10}"#,
    );
    assert_eq!(next.output, Some(Output::EventId(1)));
}

#[test]
fn custody_identities_cannot_act_as_callers_or_owners() {
    let substrate = Substrate::in_memory(&id("deployer")).unwrap();

    let impersonated = submit_json(
        &substrate,
        r#"{"caller":"contract:event_registry","now":1,"operation":"create_event","name":"Conf","fee":1,"max_capacity":10}"#,
    );
    assert_eq!(impersonated.error_code(), Some("invalid_input"));

    let handed_over = substrate.submit(Request::new(
        id("deployer"),
        2,
        Call::TransferOwnership {
            contract: civicdesk_core::ContractKind::NoteStore,
            new_owner: id("contract:note_store"),
        },
    ));
    assert_eq!(handed_over.error_code(), Some("invalid_input"));

    let owner = substrate.submit(Request::new(
        id("x"),
        3,
        Call::ContractOwner {
            contract: civicdesk_core::ContractKind::NoteStore,
        },
    ));
    assert_eq!(owner.output, Some(Output::Identity(id("deployer"))));

    assert!(Substrate::in_memory(&id("contract:voting_session")).is_err());
}

#[test]
fn concurrent_submissions_get_unique_sequences_and_ids() {
    let substrate = Arc::new(Substrate::in_memory(&id("deployer")).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let substrate = Arc::clone(&substrate);
            thread::spawn(move || {
                (0..5)
                    .map(|n| {
                        substrate.submit(Request::new(
                            id(&format!("writer{worker}")),
                            n,
                            Call::CreateNote {
                                title: format!("note {n}"),
                                content: "body".to_string(),
                                is_public: false,
                                shared_with: Vec::new(),
                            },
                        ))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut sequences = Vec::new();
    let mut note_ids = Vec::new();
    for handle in handles {
        for response in handle.join().unwrap() {
            assert!(response.ok);
            sequences.push(response.sequence);
            match response.output {
                Some(Output::NoteId(note_id)) => note_ids.push(note_id),
                other => panic!("unexpected output: {other:?}"),
            }
        }
    }

    sequences.sort_unstable();
    note_ids.sort_unstable();
    assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());
    assert_eq!(note_ids, (1..=40).collect::<Vec<u64>>());
}

#[test]
fn file_backed_substrate_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        db_path: Some(dir.path().join("civicdesk.db")),
        ..CoreConfig::default()
    };

    {
        let substrate = Substrate::open(&config, &id("deployer"), 0).unwrap();
        substrate.fund(&id("alice"), 12).unwrap();
        let created = substrate.submit(Request::new(
            id("alice"),
            1,
            Call::CreateNote {
                title: "kept".to_string(),
                content: "across restarts".to_string(),
                is_public: false,
                shared_with: Vec::new(),
            },
        ));
        assert!(created.ok);
    }

    let substrate = Substrate::open(&config, &id("someone_else"), 5).unwrap();
    assert_eq!(substrate.balance_of(&id("alice")).unwrap(), 12);

    let notes = substrate.submit(Request::new(
        id("alice"),
        6,
        Call::GetUserNotes { owner: id("alice") },
    ));
    assert_eq!(notes.output, Some(Output::NoteIds(vec![1])));

    let owner = substrate.submit(Request::new(
        id("alice"),
        7,
        Call::ContractOwner {
            contract: civicdesk_core::ContractKind::EventRegistry,
        },
    ));
    assert_eq!(owner.output, Some(Output::Identity(id("deployer"))));
}
