use civicdesk_core::db::{open_db, open_db_in_memory};
use civicdesk_core::service::access_control::{
    deploy_contracts, transfer_contract_ownership, AccessControl,
};
use civicdesk_core::{CallContext, ContractError, ContractKind, Identity};

fn id(value: &str) -> Identity {
    Identity::parse(value).unwrap()
}

#[test]
fn deploy_registers_every_contract_owned_by_deployer() {
    let mut conn = open_db_in_memory().unwrap();

    let registered = deploy_contracts(&mut conn, &id("deployer"), 42).unwrap();
    assert_eq!(registered, ContractKind::ALL.to_vec());

    for kind in ContractKind::ALL {
        let record = AccessControl::new(&conn, kind).record().unwrap();
        assert_eq!(record.owner, id("deployer"));
        assert!(!record.paused);
        assert_eq!(record.deployed_at, 42);
    }
}

#[test]
fn redeploy_keeps_existing_owner_and_pause_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("civicdesk.db");

    {
        let mut conn = open_db(&path).unwrap();
        deploy_contracts(&mut conn, &id("first"), 1).unwrap();
        let ctx = CallContext::new(id("first"), 2);
        AccessControl::new(&conn, ContractKind::NoteStore)
            .set_paused(&ctx, true)
            .unwrap();
    }

    let mut conn = open_db(&path).unwrap();
    let registered = deploy_contracts(&mut conn, &id("second"), 3).unwrap();
    assert!(registered.is_empty());

    let notes = AccessControl::new(&conn, ContractKind::NoteStore);
    assert_eq!(notes.owner().unwrap(), id("first"));
    assert!(notes.is_paused().unwrap());
}

#[test]
fn ownership_transfer_is_owner_only() {
    let mut conn = open_db_in_memory().unwrap();
    deploy_contracts(&mut conn, &id("deployer"), 0).unwrap();

    let intruder = CallContext::new(id("mallory"), 1);
    let err = transfer_contract_ownership(
        &mut conn,
        &intruder,
        ContractKind::NoteStore,
        &id("mallory"),
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::NotOwner(_)));

    let owner = CallContext::new(id("deployer"), 2);
    transfer_contract_ownership(&mut conn, &owner, ContractKind::NoteStore, &id("heir")).unwrap();

    let notes = AccessControl::new(&conn, ContractKind::NoteStore);
    assert_eq!(notes.owner().unwrap(), id("heir"));
    assert!(notes.ensure_owner(&id("deployer")).is_err());
    assert!(notes.ensure_owner(&id("heir")).is_ok());

    // Other instances keep their owner.
    assert_eq!(
        AccessControl::new(&conn, ContractKind::EventRegistry)
            .owner()
            .unwrap(),
        id("deployer")
    );
}

#[test]
fn undeployed_contract_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = AccessControl::new(&conn, ContractKind::VotingSession)
        .is_paused()
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}
