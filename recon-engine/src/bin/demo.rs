//! End-to-end demo: two identities register, fund, and release against
//! one committed ledger, with settlement driven through the actor.
//!
//! Run with `RUST_LOG=info cargo run --bin recon-demo`.

use anyhow::Result;
use merkle_ledger::AccountRecord;
use recon_engine::{
    spawn_reconciler, Config, CustodialVault, Ed25519Authorizer, KeyPair, Reconciler,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let minimum_deposit = Decimal::from(5_000_000_000u64);
    let top_up = Decimal::from(1_000_000_000u64);

    let mut config = Config::default();
    config.ledger.tree_depth = 16;
    config.sign_up.minimum_deposit = Some(minimum_deposit);
    let mailbox_capacity = config.actor.mailbox_capacity;

    let engine = Reconciler::new(
        config,
        Box::new(Ed25519Authorizer),
        Box::new(CustodialVault::new()),
    )?;
    let handle = spawn_reconciler(engine, mailbox_capacity);

    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    // Both identities queue sign-ups, then the operator freezes and
    // drains the batch.
    handle
        .request_sign_up(alice.credential(), alice.identity())
        .await?;
    handle
        .request_sign_up(bob.credential(), bob.identity())
        .await?;

    let range = handle.open_range().await?;
    tracing::info!(actions = range.pending, "range frozen");

    let witness = handle.witness_for(alice.identity()).await?;
    handle.process_sign_up(witness).await?;
    let witness = handle.witness_for(bob.identity()).await?;
    handle.process_sign_up(witness).await?;

    // Alice tops up, then releases the same amount to Bob. Every call
    // carries the record currently committed for her plus a fresh
    // witness proving it; the mirror only advances once a settlement
    // replaces the committed leaf.
    let opened = AccountRecord::opened(alice.identity(), minimum_deposit);

    let witness = handle.witness_for(alice.identity()).await?;
    handle
        .request_add_funds(alice.credential(), opened.clone(), witness, top_up)
        .await?;

    handle.open_range().await?;
    let witness = handle.witness_for(alice.identity()).await?;
    handle.process_add_funds(opened.clone(), witness).await?;
    let deposited = opened
        .with_deposit(top_up)
        .expect("demo amounts cannot overflow");

    let witness = handle.witness_for(alice.identity()).await?;
    handle
        .request_release_funds(
            alice.credential(),
            deposited.clone(),
            witness,
            top_up,
            Some(bob.identity()),
        )
        .await?;

    handle.open_range().await?;
    let witness = handle.witness_for(alice.identity()).await?;
    handle
        .process_release_funds(deposited.clone(), witness)
        .await?;

    let snapshot = handle.snapshot().await?;
    println!("{}", snapshot.to_json()?);

    handle.shutdown().await?;
    Ok(())
}
