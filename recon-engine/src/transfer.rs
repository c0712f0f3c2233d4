//! Custodial value transfer
//!
//! Deposits and release payouts move real custodial balance atomically
//! alongside the state transition that records them. The engine consumes
//! the movement through [`ValueTransfer`]; a failed transfer aborts the
//! whole call before any ledger or log state changes.

use crate::{Error, Result};
use merkle_ledger::IdentityKey;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Atomic custodial balance movement alongside a state transition
pub trait ValueTransfer: Send {
    /// Pull `amount` from `from` into custody
    fn deposit(&mut self, from: &IdentityKey, amount: Decimal) -> Result<()>;

    /// Pay `amount` out of custody to `to`
    fn payout(&mut self, to: &IdentityKey, amount: Decimal) -> Result<()>;
}

/// In-memory custodial vault
///
/// Tracks total held custody and per-identity credited payouts; the
/// conservation tests read both sides.
#[derive(Debug, Default)]
pub struct CustodialVault {
    held: Decimal,
    credited: HashMap<IdentityKey, Decimal>,
}

impl CustodialVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Total balance currently held in custody
    pub fn held(&self) -> Decimal {
        self.held
    }

    /// Total paid out to `identity` so far
    pub fn credited(&self, identity: &IdentityKey) -> Decimal {
        self.credited
            .get(identity)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl ValueTransfer for CustodialVault {
    fn deposit(&mut self, from: &IdentityKey, amount: Decimal) -> Result<()> {
        self.held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| Error::Transfer("custodial balance overflow".to_string()))?;

        tracing::debug!(from = %from, %amount, held = %self.held, "custodial deposit");
        Ok(())
    }

    fn payout(&mut self, to: &IdentityKey, amount: Decimal) -> Result<()> {
        if amount > self.held {
            return Err(Error::Transfer(format!(
                "payout of {} exceeds held custody {}",
                amount, self.held
            )));
        }

        self.held -= amount;
        let credited = self.credited.entry(*to).or_insert(Decimal::ZERO);
        *credited = credited
            .checked_add(amount)
            .ok_or_else(|| Error::Transfer("credited balance overflow".to_string()))?;

        tracing::debug!(to = %to, %amount, held = %self.held, "custodial payout");
        Ok(())
    }
}

/// Cloneable handle over one custodial vault
///
/// The engine takes ownership of its transfer collaborator; handing it a
/// clone of this handle keeps the balances observable from outside.
#[derive(Debug, Clone, Default)]
pub struct SharedVault {
    inner: Arc<Mutex<CustodialVault>>,
}

impl SharedVault {
    /// Create an empty shared vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Total balance currently held in custody
    pub fn held(&self) -> Decimal {
        self.inner.lock().held()
    }

    /// Total paid out to `identity` so far
    pub fn credited(&self, identity: &IdentityKey) -> Decimal {
        self.inner.lock().credited(identity)
    }
}

impl ValueTransfer for SharedVault {
    fn deposit(&mut self, from: &IdentityKey, amount: Decimal) -> Result<()> {
        self.inner.lock().deposit(from, amount)
    }

    fn payout(&mut self, to: &IdentityKey, amount: Decimal) -> Result<()> {
        self.inner.lock().payout(to, amount)
    }
}
