//! Core types for the committed ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for balances)

use crate::{hash, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity key (32-byte public identity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey([u8; 32]);

impl IdentityKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..")
    }
}

/// Action discriminator recording which request handler produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionKind {
    /// Account registration
    SignUp = 1,
    /// Balance deposit
    AddFunds = 2,
    /// Balance release to a counterparty
    ReleaseFunds = 3,
}

impl ActionKind {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::SignUp => "sign-up",
            ActionKind::AddFunds => "add-funds",
            ActionKind::ReleaseFunds => "release-funds",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One identity's committed state, and also the payload of every queued
/// action (an action is simply the record it intends to commit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Identity this record belongs to
    pub identity: IdentityKey,

    /// Committed balance (exact decimal)
    pub balance: Decimal,

    /// Amount scheduled for release, zero outside a pending release
    pub pending_release: Decimal,

    /// The operation that produced this record
    pub kind: ActionKind,

    /// Recipient of a pending release, if one is scheduled
    pub counterparty: Option<IdentityKey>,
}

impl AccountRecord {
    /// Freshly registered record with an initial balance
    pub fn opened(identity: IdentityKey, initial_balance: Decimal) -> Self {
        Self {
            identity,
            balance: initial_balance,
            pending_release: Decimal::ZERO,
            kind: ActionKind::SignUp,
            counterparty: None,
        }
    }

    /// Record with `amount` added to the balance
    pub fn with_deposit(&self, amount: Decimal) -> Result<Self> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(Error::AmountOverflow)?;
        Ok(Self {
            balance,
            kind: ActionKind::AddFunds,
            ..self.clone()
        })
    }

    /// Record with `amount` scheduled for release to `counterparty`
    ///
    /// The balance is untouched until the release settles.
    pub fn with_release_scheduled(&self, amount: Decimal, counterparty: IdentityKey) -> Self {
        Self {
            pending_release: amount,
            kind: ActionKind::ReleaseFunds,
            counterparty: Some(counterparty),
            ..self.clone()
        }
    }

    /// Record after its pending release has been paid out
    ///
    /// Subtracts the scheduled amount from the balance and zeroes the
    /// pending release.
    pub fn released(&self) -> Result<Self> {
        if self.pending_release > self.balance {
            return Err(Error::ReleaseExceedsBalance {
                requested: self.pending_release,
                available: self.balance,
            });
        }
        let balance = self
            .balance
            .checked_sub(self.pending_release)
            .ok_or(Error::AmountOverflow)?;
        Ok(Self {
            balance,
            pending_release: Decimal::ZERO,
            ..self.clone()
        })
    }

    /// Create canonical bytes for hashing
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Deterministic serialization for commitment and chaining
        bincode::serialize(self).expect("serialization cannot fail")
    }

    /// Leaf hash committed into the ledger for this record
    pub fn leaf_hash(&self) -> [u8; 32] {
        hash::tagged(hash::TAG_RECORD_LEAF, &[&self.canonical_bytes()])
    }
}
