//! Recon Rail Reconciliation Engine
//!
//! Binds the append-only action log to the committed Merkle ledger:
//! requests queue cheaply and out of order, an operator freezes a range,
//! and settlement applies one action per call in strict turn order.
//!
//! # Architecture
//!
//! - **Request Handlers**: validate, then dispatch to the action log
//! - **Range Opening**: converts the unbounded log into a fixed batch
//! - **Settlement Handlers**: one queued action applied per call
//! - **Single Writer**: a tokio actor owns all mutable state, so every
//!   external call is synchronous, atomic, and all-or-nothing
//!
//! # Invariants
//!
//! - At most one registered record exists per identity
//! - A failure anywhere in a call leaves every piece of state untouched
//! - A new range opens only once the previous one is fully drained

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod transfer;

// Re-exports
pub use actor::{spawn_reconciler, ReconcilerHandle};
pub use auth::{AllowAll, Authorizer, Credential, Ed25519Authorizer, KeyPair, Signature};
pub use config::Config;
pub use engine::{Reconciler, StateSnapshot};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use transfer::{CustodialVault, SharedVault, ValueTransfer};
