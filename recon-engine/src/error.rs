//! Error types for the reconciliation engine
//!
//! Every failure is a synchronous whole-call abort with zero partial
//! state change; nothing commits until every check has passed.

use merkle_ledger::{ActionKind, IdentityKey, LeafKey};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks a valid credential over the identity being acted on
    #[error("credential does not prove control of identity {0}")]
    Unauthorized(IdentityKey),

    /// Identity already appears in the action log
    #[error("identity {0} is already registered")]
    DuplicateIdentity(IdentityKey),

    /// Identity has never been through sign-up
    #[error("identity {0} is not registered")]
    UnknownIdentity(IdentityKey),

    /// Settlement targeted an action of a different kind
    #[error("current action is {actual}, expected {expected}")]
    WrongAction {
        /// Kind the settlement handler expected
        expected: ActionKind,
        /// Kind of the action actually at the current turn
        actual: ActionKind,
    },

    /// Supplied witness does not reconstruct the live root
    #[error("witness does not reconstruct the committed root")]
    StaleWitness,

    /// Supplied witness targets the wrong leaf slot
    #[error("witness targets leaf {found}, expected {expected}")]
    WitnessKeyMismatch {
        /// Slot the identity is registered at
        expected: LeafKey,
        /// Slot the witness proves
        found: LeafKey,
    },

    /// Claimed record and resolved action disagree on the identity
    #[error("claimed record is for {found}, current action targets {expected}")]
    RecordMismatch {
        /// Identity of the action at the current turn
        expected: IdentityKey,
        /// Identity on the caller-supplied record
        found: IdentityKey,
    },

    /// Release amount exceeds the committed balance
    #[error("release of {requested} exceeds committed balance {available}")]
    InsufficientFunds {
        /// Requested release amount
        requested: Decimal,
        /// Committed balance available
        available: Decimal,
    },

    /// Deposits and releases must move a positive amount
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A range can only open once the previous one is drained
    #[error("cannot open a range while {pending} actions are pending")]
    RangeStillOpen {
        /// Actions still awaiting settlement
        pending: u64,
    },

    /// Every leaf slot has been assigned
    #[error("ledger is full ({capacity} slots)")]
    LedgerFull {
        /// Total slots in the tree
        capacity: u64,
    },

    /// Release action carries no recorded counterparty
    #[error("release action has no recorded counterparty")]
    MissingCounterparty,

    /// Ledger commitment error
    #[error("ledger error: {0}")]
    Ledger(#[from] merkle_ledger::Error),

    /// Action log error
    #[error("action log error: {0}")]
    Log(#[from] action_log::Error),

    /// Custodial value transfer failed
    #[error("value transfer failed: {0}")]
    Transfer(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("concurrency error: {0}")]
    Concurrency(String),
}
