//! Recon Rail Merkle Ledger
//!
//! Keyed Merkle commitments over account records.
//!
//! # Architecture
//!
//! - **Account Records**: the leaf payload describing one identity's state
//! - **Deterministic Hashing**: bincode canonical bytes under SHA-256 domain tags
//! - **Fixed-Depth Tree**: sparse keyed structure, one slot per assigned leaf key
//! - **Witnesses**: sibling paths that reconstruct the root for any claimed leaf
//!
//! # Invariants
//!
//! - The root always equals the Merkle root of the currently committed leaves
//! - An unregistered key hashes to a reserved empty-leaf sentinel,
//!   distinguishable from any real record hash
//! - Record mutations use exact checked arithmetic; no balance is ever
//!   silently truncated or wrapped

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod hash;
pub mod tree;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use tree::{LeafKey, LedgerTree, LedgerWitness};
pub use types::{AccountRecord, ActionKind, IdentityKey};
