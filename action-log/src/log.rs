//! Append-only hash-chained action log
//!
//! Every entry links to its predecessor through a chain hash over the
//! payload's leaf hash. Chain hashes double as **cursors**: stable,
//! content-derived boundaries that name a position in the log without
//! holding an index into it.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use merkle_ledger::{hash, AccountRecord, IdentityKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Domain tag for the genesis cursor
const TAG_GENESIS: &[u8] = b"recon.log-genesis.v1";

/// Domain tag for chain links
const TAG_CHAIN_LINK: &[u8] = b"recon.log-chain.v1";

/// Stable position in the log (a chain hash)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor([u8; 32]);

impl Cursor {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..")
    }
}

/// One queued action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// The record this action intends to commit
    pub payload: AccountRecord,

    /// Chain hash over (previous chain hash, payload leaf hash)
    pub chain_hash: [u8; 32],

    /// Append timestamp
    pub appended_at: DateTime<Utc>,
}

impl ActionLogEntry {
    /// Cursor naming the position immediately after this entry
    pub fn cursor(&self) -> Cursor {
        Cursor(self.chain_hash)
    }
}

/// Append-only, hash-chained action log
///
/// A cursor-to-position index is kept alongside the entries so range
/// queries resolve their boundaries in O(1) and walk only the range.
#[derive(Debug, Clone)]
pub struct ActionLog {
    genesis: Cursor,
    entries: Vec<ActionLogEntry>,
    /// Cursor -> number of entries appended before it
    positions: HashMap<Cursor, usize>,
}

impl ActionLog {
    /// Create an empty log
    pub fn new() -> Self {
        let genesis = Cursor(hash::tagged(TAG_GENESIS, &[]));
        let mut positions = HashMap::new();
        positions.insert(genesis, 0);

        Self {
            genesis,
            entries: Vec::new(),
            positions,
        }
    }

    /// Genesis cursor (the position before any entry)
    pub fn genesis(&self) -> Cursor {
        self.genesis
    }

    /// Head cursor (the position after the last entry)
    pub fn head(&self) -> Cursor {
        self.entries
            .last()
            .map(ActionLogEntry::cursor)
            .unwrap_or(self.genesis)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[ActionLogEntry] {
        &self.entries
    }

    /// Unconditionally append an action, returning the new head cursor
    ///
    /// Dispatch never fails; request handlers validate before calling.
    pub fn dispatch(&mut self, payload: AccountRecord) -> Cursor {
        let chain_hash = hash::tagged(
            TAG_CHAIN_LINK,
            &[self.head().as_bytes(), &payload.leaf_hash()],
        );
        let entry = ActionLogEntry {
            entry_id: Uuid::now_v7(),
            payload,
            chain_hash,
            appended_at: Utc::now(),
        };
        let cursor = entry.cursor();

        tracing::debug!(
            entry_id = %entry.entry_id,
            kind = entry.payload.kind.label(),
            identity = %entry.payload.identity,
            "dispatched action"
        );

        self.entries.push(entry);
        self.positions.insert(cursor, self.entries.len());
        cursor
    }

    /// Check whether any queued action references `identity`
    ///
    /// Walks the whole log from genesis; sign-up pays this cost on every
    /// request so no ledger lookup is needed before an identity commits.
    pub fn contains_identity(&self, identity: &IdentityKey) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.payload.identity == *identity)
    }

    /// Number of entries appended before `cursor`
    pub fn position(&self, cursor: &Cursor) -> Result<usize> {
        self.positions
            .get(cursor)
            .copied()
            .ok_or(Error::UnknownCursor(*cursor))
    }

    /// Entries between two cursors, oldest first
    pub fn entries_between(&self, start: &Cursor, end: &Cursor) -> Result<&[ActionLogEntry]> {
        let start_pos = self.position(start)?;
        let end_pos = self.position(end)?;
        if start_pos > end_pos {
            return Err(Error::InvertedRange {
                start: *start,
                end: *end,
            });
        }
        Ok(&self.entries[start_pos..end_pos])
    }

    /// Number of entries between two cursors
    pub fn count_between(&self, start: &Cursor, end: &Cursor) -> Result<u64> {
        Ok(self.entries_between(start, end)?.len() as u64)
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn identity(byte: u8) -> IdentityKey {
        IdentityKey::from_bytes([byte; 32])
    }

    fn record(byte: u8) -> AccountRecord {
        AccountRecord::opened(identity(byte), Decimal::from(byte))
    }

    #[test]
    fn test_empty_log_head_is_genesis() {
        let log = ActionLog::new();
        assert!(log.is_empty());
        assert_eq!(log.head(), log.genesis());
        assert_eq!(log.position(&log.genesis()).unwrap(), 0);
    }

    #[test]
    fn test_dispatch_advances_head() {
        let mut log = ActionLog::new();
        let first = log.dispatch(record(1));
        assert_eq!(log.head(), first);
        assert_eq!(log.len(), 1);

        let second = log.dispatch(record(2));
        assert_ne!(first, second);
        assert_eq!(log.head(), second);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_chain_depends_on_history() {
        let mut a = ActionLog::new();
        let mut b = ActionLog::new();

        a.dispatch(record(1));
        b.dispatch(record(2));

        // Same payload on different histories chains differently.
        assert_ne!(a.dispatch(record(3)), b.dispatch(record(3)));
    }

    #[test]
    fn test_contains_identity_scans_whole_log() {
        let mut log = ActionLog::new();
        log.dispatch(record(1));
        log.dispatch(record(2));
        log.dispatch(record(3));

        assert!(log.contains_identity(&identity(1)));
        assert!(log.contains_identity(&identity(3)));
        assert!(!log.contains_identity(&identity(4)));
    }

    #[test]
    fn test_entries_between() {
        let mut log = ActionLog::new();
        let genesis = log.genesis();
        log.dispatch(record(1));
        let mid = log.dispatch(record(2));
        log.dispatch(record(3));
        let head = log.head();

        let all = log.entries_between(&genesis, &head).unwrap();
        assert_eq!(all.len(), 3);

        let tail = log.entries_between(&mid, &head).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].payload.identity, identity(3));

        assert_eq!(log.count_between(&mid, &mid).unwrap(), 0);
    }

    #[test]
    fn test_unknown_cursor_rejected() {
        let log = ActionLog::new();
        let bogus = Cursor::from_bytes([9u8; 32]);
        assert!(matches!(
            log.position(&bogus),
            Err(Error::UnknownCursor(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut log = ActionLog::new();
        let genesis = log.genesis();
        log.dispatch(record(1));
        let head = log.head();

        let result = log.entries_between(&head, &genesis);
        assert!(matches!(result, Err(Error::InvertedRange { .. })));
    }
}
