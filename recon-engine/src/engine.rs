//! Main reconciliation orchestration layer
//!
//! The [`Reconciler`] is the one exclusively-owned service object holding
//! the shared mutable resource: ledger root, log head, range cursors,
//! pending count, and turn. Every operation reads the current state,
//! runs all of its checks, and only then mutates; any failure is a
//! whole-call abort with nothing committed.
//!
//! Request handlers validate and append to the action log. An operator
//! freezes a range of the log, then drains it through the settlement
//! handlers one action per call, in strict turn order.

use crate::{
    auth::{Authorizer, Credential},
    config::Config,
    metrics::Metrics,
    transfer::ValueTransfer,
    Error, Result,
};
use action_log::{current_action, ActionLog, ActionRange, CurrentAction, Cursor};
use merkle_ledger::{
    hash, AccountRecord, ActionKind, IdentityKey, LeafKey, LedgerTree, LedgerWitness,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The externally readable commitment surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Log genesis cursor
    pub genesis: Cursor,

    /// Log head cursor
    pub head: Cursor,

    /// Next leaf slot to assign
    pub identity_counter: u64,

    /// Actions awaiting settlement in the current range
    pub pending: u64,

    /// Turn index within the current range
    pub turn: u64,

    /// Current range start cursor
    pub range_start: Cursor,

    /// Current range end cursor
    pub range_end: Cursor,

    /// Committed ledger root
    pub root: [u8; 32],
}

impl StateSnapshot {
    /// Serialize for external readers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Reconciliation engine binding the action log to the committed ledger
pub struct Reconciler {
    /// Committed account ledger
    ledger: LedgerTree,

    /// Append-only action queue
    log: ActionLog,

    /// Current settlement range (drained when idle)
    range: ActionRange,

    /// Next leaf slot to assign at sign-up
    identity_counter: u64,

    /// Identity -> assigned leaf slot
    registry: HashMap<IdentityKey, LeafKey>,

    /// Capability check for request callers
    authorizer: Box<dyn Authorizer>,

    /// Custodial balance movement
    vault: Box<dyn ValueTransfer>,

    /// Prometheus metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("identity_counter", &self.identity_counter)
            .field("log_len", &self.log.len())
            .field("pending", &self.range.pending)
            .field("turn", &self.range.turn)
            .finish()
    }
}

impl Reconciler {
    /// Create an engine with the given collaborators
    pub fn new(
        config: Config,
        authorizer: Box<dyn Authorizer>,
        vault: Box<dyn ValueTransfer>,
    ) -> Result<Self> {
        let ledger = LedgerTree::new(config.ledger.tree_depth)?;
        let log = ActionLog::new();
        let range = ActionRange::drained_at(log.genesis());
        let metrics = Metrics::new().map_err(|e| Error::Metrics(e.to_string()))?;

        tracing::info!(
            service = %config.service_name,
            tree_depth = config.ledger.tree_depth,
            capacity = ledger.capacity(),
            "reconciler initialized"
        );

        Ok(Self {
            ledger,
            log,
            range,
            identity_counter: 0,
            registry: HashMap::new(),
            authorizer,
            vault,
            metrics,
            config,
        })
    }

    // --- published state ---

    /// Committed ledger root
    pub fn root(&self) -> [u8; 32] {
        self.ledger.root()
    }

    /// The action log (read-only)
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// The current settlement range
    pub fn range(&self) -> &ActionRange {
        &self.range
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Leaf slot assigned to `identity`
    pub fn leaf_key(&self, identity: &IdentityKey) -> Result<LeafKey> {
        self.registry
            .get(identity)
            .copied()
            .ok_or(Error::UnknownIdentity(*identity))
    }

    /// Fresh witness for `identity` against the current root
    ///
    /// Callers recompute witnesses from here after any rejection; there
    /// are no implicit retries.
    pub fn witness_for(&self, identity: &IdentityKey) -> Result<LedgerWitness> {
        let key = self.leaf_key(identity)?;
        Ok(self.ledger.witness(key)?)
    }

    /// Snapshot of the whole commitment surface
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            genesis: self.log.genesis(),
            head: self.log.head(),
            identity_counter: self.identity_counter,
            pending: self.range.pending,
            turn: self.range.turn,
            range_start: self.range.start,
            range_end: self.range.end,
            root: self.ledger.root(),
        }
    }

    // --- request handlers ---

    /// Queue a sign-up action for `identity`
    ///
    /// Rejects identities that already appear anywhere in the log, then
    /// reserves the next leaf slot and, when configured, pulls the
    /// minimum deposit into custody atomically with the request.
    pub fn request_sign_up(
        &mut self,
        credential: &Credential,
        identity: IdentityKey,
    ) -> Result<Cursor> {
        if !self.authorizer.verify(credential, &identity) {
            return Err(Error::Unauthorized(identity));
        }
        if self.log.contains_identity(&identity) {
            return Err(Error::DuplicateIdentity(identity));
        }
        if self.identity_counter >= self.ledger.capacity() {
            return Err(Error::LedgerFull {
                capacity: self.ledger.capacity(),
            });
        }

        let initial_balance = match self.config.sign_up.minimum_deposit {
            Some(amount) => {
                self.vault.deposit(&identity, amount)?;
                amount
            }
            None => Decimal::ZERO,
        };

        let key = LeafKey::new(self.identity_counter);
        self.identity_counter += 1;
        self.registry.insert(identity, key);
        self.metrics.set_registered(self.identity_counter);

        let record = AccountRecord::opened(identity, initial_balance);
        let cursor = self.log.dispatch(record);
        self.metrics.record_dispatch();

        tracing::info!(identity = %identity, slot = %key, "sign-up queued");
        Ok(cursor)
    }

    /// Queue an add-funds action carrying the new intended balance
    ///
    /// `claimed` must be the caller's committed record, proven by
    /// `witness` against the live root; `amount` moves into custody
    /// atomically with the request.
    pub fn request_add_funds(
        &mut self,
        credential: &Credential,
        claimed: &AccountRecord,
        witness: &LedgerWitness,
        amount: Decimal,
    ) -> Result<Cursor> {
        if !self.authorizer.verify(credential, &claimed.identity) {
            return Err(Error::Unauthorized(claimed.identity));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(amount));
        }
        self.check_claim(claimed, witness)?;

        let record = claimed.with_deposit(amount)?;
        self.vault.deposit(&claimed.identity, amount)?;

        let cursor = self.log.dispatch(record);
        self.metrics.record_dispatch();

        tracing::info!(identity = %claimed.identity, %amount, "add-funds queued");
        Ok(cursor)
    }

    /// Queue a release action for `amount`, payable to `counterparty`
    ///
    /// Rejects amounts above the committed balance before anything is
    /// dispatched. A missing counterparty releases back to the caller.
    pub fn request_release_funds(
        &mut self,
        credential: &Credential,
        claimed: &AccountRecord,
        witness: &LedgerWitness,
        amount: Decimal,
        counterparty: Option<IdentityKey>,
    ) -> Result<Cursor> {
        if !self.authorizer.verify(credential, &claimed.identity) {
            return Err(Error::Unauthorized(claimed.identity));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(amount));
        }
        self.check_claim(claimed, witness)?;
        if amount > claimed.balance {
            return Err(Error::InsufficientFunds {
                requested: amount,
                available: claimed.balance,
            });
        }

        let to = counterparty.unwrap_or(claimed.identity);
        let record = claimed.with_release_scheduled(amount, to);
        let cursor = self.log.dispatch(record);
        self.metrics.record_dispatch();

        tracing::info!(
            identity = %claimed.identity,
            %amount,
            counterparty = %to,
            "release-funds queued"
        );
        Ok(cursor)
    }

    // --- range management ---

    /// Freeze every action appended since the previous range's end
    ///
    /// Precondition: the previous range is fully drained. The new range
    /// runs from the old end cursor to the log head at call time.
    pub fn open_range(&mut self) -> Result<ActionRange> {
        if self.range.pending != 0 {
            return Err(Error::RangeStillOpen {
                pending: self.range.pending,
            });
        }

        let start = self.range.end;
        let end = self.log.head();
        let count = self.log.count_between(&start, &end)?;

        self.range = ActionRange::open(start, end, count);
        self.metrics.record_range_opened(count);

        tracing::info!(
            range_id = %self.range.range_id,
            actions = count,
            "settlement range opened"
        );
        Ok(self.range.clone())
    }

    /// The action whose turn it is within the open range
    pub fn current_action(&self) -> Result<CurrentAction> {
        Ok(current_action(&self.log, &self.range)?)
    }

    // --- settlement handlers ---

    /// Settle the sign-up action at the current turn
    ///
    /// `witness` must prove the empty-leaf sentinel at the identity's
    /// assigned slot under the live root; a slot already holding a
    /// record fails this check, which is what rejects replays.
    pub fn process_sign_up(&mut self, witness: &LedgerWitness) -> Result<[u8; 32]> {
        let current = self.resolve_expected(ActionKind::SignUp)?;

        let key = self.leaf_key(&current.payload.identity)?;
        if witness.key() != key {
            return Err(Error::WitnessKeyMismatch {
                expected: key,
                found: witness.key(),
            });
        }
        if !witness.proves(hash::empty_leaf(), self.ledger.root()) {
            return Err(Error::StaleWitness);
        }

        let root = self.apply(key, &current.payload)?;
        Ok(root)
    }

    /// Settle the add-funds action at the current turn
    pub fn process_add_funds(
        &mut self,
        claimed: &AccountRecord,
        witness: &LedgerWitness,
    ) -> Result<[u8; 32]> {
        self.check_claim(claimed, witness)?;
        let current = self.resolve_expected(ActionKind::AddFunds)?;
        if current.payload.identity != claimed.identity {
            return Err(Error::RecordMismatch {
                expected: current.payload.identity,
                found: claimed.identity,
            });
        }

        let key = self.leaf_key(&current.payload.identity)?;
        let root = self.apply(key, &current.payload)?;
        Ok(root)
    }

    /// Settle the release action at the current turn
    ///
    /// Pays the scheduled amount out of custody to the recorded
    /// counterparty, then commits the record with the balance reduced
    /// and the pending release zeroed.
    pub fn process_release_funds(
        &mut self,
        claimed: &AccountRecord,
        witness: &LedgerWitness,
    ) -> Result<[u8; 32]> {
        self.check_claim(claimed, witness)?;
        let current = self.resolve_expected(ActionKind::ReleaseFunds)?;
        if current.payload.identity != claimed.identity {
            return Err(Error::RecordMismatch {
                expected: current.payload.identity,
                found: claimed.identity,
            });
        }

        let key = self.leaf_key(&current.payload.identity)?;
        let counterparty = current.payload.counterparty.ok_or(Error::MissingCounterparty)?;
        let settled = current.payload.released()?;

        // Last fallible step; everything after commits unconditionally.
        self.vault.payout(&counterparty, current.payload.pending_release)?;

        let root = self.apply(key, &settled)?;
        Ok(root)
    }

    // --- internals ---

    /// Verify a caller-supplied record/witness pair against the live root
    fn check_claim(&self, claimed: &AccountRecord, witness: &LedgerWitness) -> Result<()> {
        let key = self.leaf_key(&claimed.identity)?;
        if witness.key() != key {
            return Err(Error::WitnessKeyMismatch {
                expected: key,
                found: witness.key(),
            });
        }
        if !witness.proves(claimed.leaf_hash(), self.ledger.root()) {
            return Err(Error::StaleWitness);
        }
        Ok(())
    }

    /// Resolve the current action and assert its kind and coordinates
    fn resolve_expected(&self, expected: ActionKind) -> Result<CurrentAction> {
        let current = current_action(&self.log, &self.range)?;
        if current.payload.kind != expected {
            return Err(Error::WrongAction {
                expected,
                actual: current.payload.kind,
            });
        }
        if !current.matches(&self.range) {
            return Err(Error::Concurrency(
                "resolved action diverged from the persisted range".to_string(),
            ));
        }
        Ok(current)
    }

    /// Commit `record` at `key` and pass the turn
    fn apply(&mut self, key: LeafKey, record: &AccountRecord) -> Result<[u8; 32]> {
        let root = self.ledger.commit(key, record.leaf_hash())?;
        self.range.advance();
        self.metrics
            .record_settlement(self.range.turn, self.range.pending);

        tracing::info!(
            kind = record.kind.label(),
            identity = %record.identity,
            turn = self.range.turn,
            pending = self.range.pending,
            "action settled"
        );
        Ok(root)
    }
}
