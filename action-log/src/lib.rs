//! Recon Rail Action Log
//!
//! Append-only, hash-chained queue of pending ledger mutations, plus the
//! frozen ranges settlement drains from.
//!
//! # Architecture
//!
//! - **Dispatch**: unconditionally appends an action; all validation
//!   happens in the request handlers upstream
//! - **Cursors**: chain hashes acting as stable range boundaries
//! - **Ranges**: a contiguous, countable slice of the log frozen for
//!   settlement, drained one turn per call
//!
//! # Invariants
//!
//! - The log never shrinks or reorders
//! - `turn + pending` always equals the number of actions in a range
//! - Range queries cost O(range length), not O(log length)

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod log;
pub mod range;

// Re-exports
pub use error::{Error, Result};
pub use log::{ActionLog, ActionLogEntry, Cursor};
pub use range::{current_action, ActionRange, CurrentAction};
