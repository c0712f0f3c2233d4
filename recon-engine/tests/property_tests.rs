//! Property-based tests for reconciliation invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Balance conservation: custody in == committed balance + custody out
//! - Ledger equivalence: settling reproduces an independently built tree
//! - Range counters: turn + pending always equals the frozen batch size

use merkle_ledger::{AccountRecord, IdentityKey, LeafKey, LedgerTree};
use proptest::prelude::*;
use recon_engine::{AllowAll, Config, Credential, Reconciler, SharedVault, Signature};
use rust_decimal::Decimal;

const TREE_DEPTH: usize = 8;

fn identity(byte: u8) -> IdentityKey {
    IdentityKey::from_bytes([byte; 32])
}

fn credential(byte: u8) -> Credential {
    Credential {
        identity: identity(byte),
        proof: Signature::from_bytes([0u8; 64]),
    }
}

fn engine_with_vault(vault: SharedVault) -> Reconciler {
    let mut config = Config::default();
    config.ledger.tree_depth = TREE_DEPTH;
    Reconciler::new(config, Box::new(AllowAll), Box::new(vault)).unwrap()
}

/// Register `byte` and settle the sign-up, returning the committed record
fn register(engine: &mut Reconciler, byte: u8) -> AccountRecord {
    engine
        .request_sign_up(&credential(byte), identity(byte))
        .unwrap();
    engine.open_range().unwrap();
    let witness = engine.witness_for(&identity(byte)).unwrap();
    engine.process_sign_up(&witness).unwrap();
    AccountRecord::opened(identity(byte), Decimal::ZERO)
}

/// Queue and settle one deposit, returning the updated committed record
fn settle_deposit(engine: &mut Reconciler, committed: &AccountRecord, amount: Decimal) -> AccountRecord {
    let witness = engine.witness_for(&committed.identity).unwrap();
    engine
        .request_add_funds(&credential(committed.identity.as_bytes()[0]), committed, &witness, amount)
        .unwrap();
    engine.open_range().unwrap();
    let witness = engine.witness_for(&committed.identity).unwrap();
    engine.process_add_funds(committed, &witness).unwrap();
    committed.with_deposit(amount).unwrap()
}

/// Strategy for deposit amounts
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000u64).prop_map(Decimal::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: deposits accumulate exactly and a release conserves the
    /// total between the committed balance and the counterparty credit
    #[test]
    fn prop_balance_conservation(
        deposits in proptest::collection::vec(amount_strategy(), 1..6),
        release_cents in 1u64..100u64,
    ) {
        let vault = SharedVault::new();
        let mut engine = engine_with_vault(vault.clone());

        let mut committed = register(&mut engine, 1);
        register(&mut engine, 2);

        let mut total = Decimal::ZERO;
        for amount in &deposits {
            committed = settle_deposit(&mut engine, &committed, *amount);
            total += *amount;
        }
        prop_assert_eq!(committed.balance, total);
        prop_assert_eq!(vault.held(), total);

        // Release a positive fraction of the committed balance.
        let release = (total * Decimal::from(release_cents) / Decimal::from(100u64)).round_dp(0);
        let release = if release < Decimal::ONE { Decimal::ONE } else { release };

        let witness = engine.witness_for(&identity(1)).unwrap();
        engine
            .request_release_funds(&credential(1), &committed, &witness, release, Some(identity(2)))
            .unwrap();
        engine.open_range().unwrap();
        let witness = engine.witness_for(&identity(1)).unwrap();
        engine.process_release_funds(&committed, &witness).unwrap();

        let settled = committed
            .with_release_scheduled(release, identity(2))
            .released()
            .unwrap();

        prop_assert_eq!(settled.balance, total - release);
        prop_assert_eq!(vault.credited(&identity(2)), release);
        prop_assert_eq!(vault.held(), total - release);

        // The committed leaf matches the mirror.
        let witness = engine.witness_for(&identity(1)).unwrap();
        prop_assert!(witness.proves(settled.leaf_hash(), engine.root()));
    }

    /// Property: settling all sign-ups reproduces the root of a fresh
    /// tree holding the same leaves at the same keys
    #[test]
    fn prop_ledger_equivalence(count in 1usize..8) {
        let mut engine = engine_with_vault(SharedVault::new());

        for byte in 0..count as u8 {
            engine
                .request_sign_up(&credential(byte + 1), identity(byte + 1))
                .unwrap();
        }
        engine.open_range().unwrap();

        let mut records = Vec::new();
        for byte in 0..count as u8 {
            let witness = engine.witness_for(&identity(byte + 1)).unwrap();
            engine.process_sign_up(&witness).unwrap();
            records.push(AccountRecord::opened(identity(byte + 1), Decimal::ZERO));
        }

        let mut fresh = LedgerTree::new(TREE_DEPTH).unwrap();
        let mut fresh_root = fresh.root();
        for (slot, record) in records.iter().enumerate() {
            fresh_root = fresh
                .commit(LeafKey::new(slot as u64), record.leaf_hash())
                .unwrap();
        }

        prop_assert_eq!(engine.root(), fresh_root);
    }

    /// Property: draining a range of N actions walks the counters from
    /// (pending = N, turn = 0) to (pending = 0, turn = N) one step at a
    /// time, with the sum constant throughout
    #[test]
    fn prop_range_counters(count in 1usize..10) {
        let mut engine = engine_with_vault(SharedVault::new());

        for byte in 0..count as u8 {
            engine
                .request_sign_up(&credential(byte + 1), identity(byte + 1))
                .unwrap();
        }
        let range = engine.open_range().unwrap();
        prop_assert_eq!(range.pending, count as u64);
        prop_assert_eq!(range.turn, 0);

        for step in 0..count {
            prop_assert_eq!(
                engine.range().turn + engine.range().pending,
                count as u64
            );
            prop_assert_eq!(engine.range().turn, step as u64);

            let current = engine.current_action().unwrap();
            prop_assert_eq!(current.turn, step as u64);

            let witness = engine.witness_for(&current.payload.identity).unwrap();
            engine.process_sign_up(&witness).unwrap();
        }

        prop_assert_eq!(engine.range().pending, 0);
        prop_assert_eq!(engine.range().turn, count as u64);
        prop_assert!(engine.range().is_drained());
    }
}
