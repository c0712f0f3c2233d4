//! Protocol scenario tests
//!
//! Drive the engine through the request -> range -> settlement protocol
//! and check its failure semantics: every rejection is a whole-call
//! abort, every settlement lands exactly once, in order.

use merkle_ledger::{
    hash, AccountRecord, IdentityKey, LeafKey, LedgerTree, LedgerWitness,
};
use recon_engine::{
    AllowAll, Config, Credential, CustodialVault, Error, Reconciler, SharedVault, Signature,
};
use rust_decimal::Decimal;

const TREE_DEPTH: usize = 8;

fn test_engine(minimum_deposit: Option<Decimal>) -> Reconciler {
    let mut config = Config::default();
    config.ledger.tree_depth = TREE_DEPTH;
    config.sign_up.minimum_deposit = minimum_deposit;
    Reconciler::new(config, Box::new(AllowAll), Box::new(CustodialVault::new())).unwrap()
}

fn identity(byte: u8) -> IdentityKey {
    IdentityKey::from_bytes([byte; 32])
}

fn credential(byte: u8) -> Credential {
    Credential {
        identity: identity(byte),
        proof: Signature::from_bytes([0u8; 64]),
    }
}

/// Sign an identity up and settle it, returning its committed record
fn settle_sign_up(engine: &mut Reconciler, byte: u8, deposit: Decimal) -> AccountRecord {
    let witness = engine.witness_for(&identity(byte)).unwrap();
    engine.process_sign_up(&witness).unwrap();
    AccountRecord::opened(identity(byte), deposit)
}

#[test]
fn duplicate_sign_up_rejected_before_dispatch() {
    let mut engine = test_engine(None);

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    let result = engine.request_sign_up(&credential(1), identity(1));

    assert!(matches!(result, Err(Error::DuplicateIdentity(_))));
    assert_eq!(engine.log().len(), 1);
    assert_eq!(engine.snapshot().identity_counter, 1);
}

#[test]
fn open_range_freezes_log_head() {
    let mut engine = test_engine(None);

    for byte in 1..=3u8 {
        engine
            .request_sign_up(&credential(byte), identity(byte))
            .unwrap();
    }
    let head_at_open = engine.log().head();
    let range = engine.open_range().unwrap();

    assert_eq!(range.pending, 3);
    assert_eq!(range.turn, 0);
    assert_eq!(range.end, head_at_open);

    // Dispatch past the frozen end; the open range must not move.
    engine.request_sign_up(&credential(4), identity(4)).unwrap();
    assert_eq!(engine.range().end, head_at_open);
    assert_ne!(engine.log().head(), head_at_open);
}

#[test]
fn second_range_while_open_rejected() {
    let mut engine = test_engine(None);

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.open_range().unwrap();

    let result = engine.open_range();
    assert!(matches!(result, Err(Error::RangeStillOpen { pending: 1 })));
}

#[test]
fn wrong_settlement_type_rejected_without_mutation() {
    let mut engine = test_engine(None);

    // Commit identity 1 so a valid claim exists, then queue a second
    // sign-up whose turn is current.
    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.open_range().unwrap();
    let alice = settle_sign_up(&mut engine, 1, Decimal::ZERO);

    engine.request_sign_up(&credential(2), identity(2)).unwrap();
    engine.open_range().unwrap();

    let root_before = engine.root();
    let witness = engine.witness_for(&identity(1)).unwrap();

    // The claim verifies, but the current action is a sign-up, so the
    // add-funds handler must fail on the kind check with no mutation.
    let result = engine.process_add_funds(&alice, &witness);
    assert!(matches!(
        result,
        Err(Error::WrongAction { actual, .. }) if actual == merkle_ledger::ActionKind::SignUp
    ));
    assert_eq!(engine.root(), root_before);
    assert_eq!(engine.range().turn, 0);
    assert_eq!(engine.range().pending, 1);

    // The right handler still settles the same action.
    settle_sign_up(&mut engine, 2, Decimal::ZERO);
    assert!(engine.range().is_drained());
}

#[test]
fn two_sign_ups_settle_to_independent_tree_root() {
    let mut engine = test_engine(None);

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.request_sign_up(&credential(2), identity(2)).unwrap();

    let range = engine.open_range().unwrap();
    assert_eq!(range.pending, 2);

    let first = settle_sign_up(&mut engine, 1, Decimal::ZERO);
    let second = settle_sign_up(&mut engine, 2, Decimal::ZERO);

    assert_eq!(engine.range().pending, 0);
    assert_eq!(engine.range().turn, 2);

    // Inserting the same leaves at the same keys into a fresh tree must
    // reproduce the committed root.
    let mut fresh = LedgerTree::new(TREE_DEPTH).unwrap();
    fresh.commit(LeafKey::new(0), first.leaf_hash()).unwrap();
    let fresh_root = fresh.commit(LeafKey::new(1), second.leaf_hash()).unwrap();
    assert_eq!(engine.root(), fresh_root);
}

#[test]
fn settlement_out_of_turn_order_rejected() {
    let mut engine = test_engine(None);

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.request_sign_up(&credential(2), identity(2)).unwrap();
    engine.open_range().unwrap();

    // Identity 2's turn is second; using its witness first trips the
    // slot check against the turn-0 payload.
    let witness = engine.witness_for(&identity(2)).unwrap();
    let result = engine.process_sign_up(&witness);
    assert!(matches!(result, Err(Error::WitnessKeyMismatch { .. })));

    settle_sign_up(&mut engine, 1, Decimal::ZERO);
    settle_sign_up(&mut engine, 2, Decimal::ZERO);
    assert!(engine.range().is_drained());
}

#[test]
fn balance_conservation_over_deposit_and_release() {
    let minimum = Decimal::from(5_000_000_000u64);
    let moved = Decimal::from(1_000_000_000u64);

    let vault = SharedVault::new();
    let mut config = Config::default();
    config.ledger.tree_depth = TREE_DEPTH;
    config.sign_up.minimum_deposit = Some(minimum);
    let mut engine =
        Reconciler::new(config, Box::new(AllowAll), Box::new(vault.clone())).unwrap();

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.request_sign_up(&credential(2), identity(2)).unwrap();
    engine.open_range().unwrap();
    let alice = settle_sign_up(&mut engine, 1, minimum);
    settle_sign_up(&mut engine, 2, minimum);

    // Deposit 1,000,000,000 on top of the opening 5,000,000,000.
    let witness = engine.witness_for(&identity(1)).unwrap();
    engine
        .request_add_funds(&credential(1), &alice, &witness, moved)
        .unwrap();
    engine.open_range().unwrap();
    let witness = engine.witness_for(&identity(1)).unwrap();
    engine.process_add_funds(&alice, &witness).unwrap();
    let deposited = alice.with_deposit(moved).unwrap();
    assert_eq!(deposited.balance, Decimal::from(6_000_000_000u64));

    // Release the same amount to identity 2.
    let witness = engine.witness_for(&identity(1)).unwrap();
    engine
        .request_release_funds(&credential(1), &deposited, &witness, moved, Some(identity(2)))
        .unwrap();
    engine.open_range().unwrap();
    let witness = engine.witness_for(&identity(1)).unwrap();
    engine.process_release_funds(&deposited, &witness).unwrap();

    let settled = deposited
        .with_release_scheduled(moved, identity(2))
        .released()
        .unwrap();
    assert_eq!(settled.balance, Decimal::from(5_000_000_000u64));

    // The committed leaf is exactly the settled record.
    let witness = engine.witness_for(&identity(1)).unwrap();
    assert!(witness.proves(settled.leaf_hash(), engine.root()));

    // Custody: two opening deposits plus the top-up came in, one release
    // went out to identity 2.
    assert_eq!(vault.credited(&identity(2)), moved);
    assert_eq!(vault.held(), minimum + minimum);
}

#[test]
fn release_exceeding_balance_rejected_without_dispatch() {
    let minimum = Decimal::from(100);
    let mut engine = test_engine(Some(minimum));

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.open_range().unwrap();
    let alice = settle_sign_up(&mut engine, 1, minimum);

    let log_len = engine.log().len();
    let witness = engine.witness_for(&identity(1)).unwrap();
    let result = engine.request_release_funds(
        &credential(1),
        &alice,
        &witness,
        Decimal::from(101),
        None,
    );

    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
    assert_eq!(engine.log().len(), log_len);
}

#[test]
fn stale_witness_rejected() {
    let deposit = Decimal::from(50);
    let mut engine = test_engine(Some(deposit));

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.request_sign_up(&credential(2), identity(2)).unwrap();
    engine.open_range().unwrap();
    let alice = settle_sign_up(&mut engine, 1, deposit);
    let bob = settle_sign_up(&mut engine, 2, deposit);

    // Capture a witness for identity 1, then move the root by settling
    // an unrelated deposit for identity 2.
    let stale = engine.witness_for(&identity(1)).unwrap();

    let witness = engine.witness_for(&identity(2)).unwrap();
    engine
        .request_add_funds(&credential(2), &bob, &witness, Decimal::from(7))
        .unwrap();
    engine.open_range().unwrap();
    let witness = engine.witness_for(&identity(2)).unwrap();
    engine.process_add_funds(&bob, &witness).unwrap();

    // The pre-move witness no longer reconstructs the live root; the
    // request is rejected whole with nothing dispatched.
    let log_len = engine.log().len();
    let result = engine.request_add_funds(&credential(1), &alice, &stale, Decimal::from(1));
    assert!(matches!(result, Err(Error::StaleWitness)));
    assert_eq!(engine.log().len(), log_len);

    // A recomputed witness for the same record succeeds.
    let fresh = engine.witness_for(&identity(1)).unwrap();
    engine
        .request_add_funds(&credential(1), &alice, &fresh, Decimal::from(1))
        .unwrap();
}

#[test]
fn sign_up_replay_cannot_prove_empty_slot() {
    let mut engine = test_engine(None);

    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.open_range().unwrap();

    let witness = engine.witness_for(&identity(1)).unwrap();
    assert!(witness.proves(hash::empty_leaf(), engine.root()));
    engine.process_sign_up(&witness).unwrap();

    // A fresh witness for the same slot proves the record, never the
    // sentinel: replayed sign-up settlements are strictly rejected.
    let fresh = engine.witness_for(&identity(1)).unwrap();
    assert!(!fresh.proves(hash::empty_leaf(), engine.root()));
}

#[test]
fn unauthorized_request_rejected() {
    let mut config = Config::default();
    config.ledger.tree_depth = TREE_DEPTH;
    let mut engine = Reconciler::new(
        config,
        Box::new(recon_engine::Ed25519Authorizer),
        Box::new(CustodialVault::new()),
    )
    .unwrap();

    let keypair = recon_engine::KeyPair::generate();
    let intruder = recon_engine::KeyPair::generate();

    // A credential for one identity cannot register another.
    let result = engine.request_sign_up(&intruder.credential(), keypair.identity());
    assert!(matches!(result, Err(Error::Unauthorized(_))));
    assert_eq!(engine.log().len(), 0);

    engine
        .request_sign_up(&keypair.credential(), keypair.identity())
        .unwrap();
    assert_eq!(engine.log().len(), 1);
}

#[test]
fn empty_range_opens_and_drains_immediately() {
    let mut engine = test_engine(None);

    let range = engine.open_range().unwrap();
    assert_eq!(range.pending, 0);
    assert!(range.is_drained());

    // And a fresh range can open right after.
    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    let next = engine.open_range().unwrap();
    assert_eq!(next.pending, 1);
}

#[test]
fn witness_for_unknown_identity_rejected() {
    let engine = test_engine(None);
    let result = engine.witness_for(&identity(9));
    assert!(matches!(result, Err(Error::UnknownIdentity(_))));
}

#[test]
fn forged_witness_rejected() {
    let mut engine = test_engine(None);
    engine.request_sign_up(&credential(1), identity(1)).unwrap();
    engine.open_range().unwrap();

    // A witness from a different tree shares no root with the engine.
    let mut foreign = LedgerTree::new(TREE_DEPTH).unwrap();
    foreign
        .commit(LeafKey::new(0), hash::hash_bytes(b"forged"))
        .unwrap();
    let forged: LedgerWitness = foreign.witness(LeafKey::new(0)).unwrap();

    let result = engine.process_sign_up(&forged);
    assert!(matches!(result, Err(Error::StaleWitness)));
}
