//! Frozen settlement ranges and the current-action resolver
//!
//! A range freezes a contiguous slice of the log between two cursors and
//! counts it. Settlement then drains the range one turn per call; the
//! resolver names the single action whose turn it is.
//!
//! # Lifecycle
//!
//! ```text
//! Idle(pending = 0)
//!   └─ open ─▶ Open(pending = N, turn = 0)
//!                └─ settle ×N, one call each ─▶ Idle(pending = 0, turn = N)
//! ```
//!
//! No transition skips steps; a settlement call always targets exactly
//! the entry at the current turn.

use crate::{ActionLog, Cursor, Error, Result};
use chrono::{DateTime, Utc};
use merkle_ledger::AccountRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A frozen, countable slice of the log awaiting settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRange {
    /// Unique range ID (UUIDv7 for time-ordering)
    pub range_id: Uuid,

    /// Cursor before the first action in the range
    pub start: Cursor,

    /// Cursor after the last action in the range
    pub end: Cursor,

    /// Actions not yet settled
    pub pending: u64,

    /// Index, within the range, of the next action to settle
    pub turn: u64,

    /// When the range was frozen
    pub opened_at: DateTime<Utc>,
}

impl ActionRange {
    /// Initial idle state: an already-drained range sitting at `cursor`
    pub fn drained_at(cursor: Cursor) -> Self {
        Self {
            range_id: Uuid::now_v7(),
            start: cursor,
            end: cursor,
            pending: 0,
            turn: 0,
            opened_at: Utc::now(),
        }
    }

    /// Freeze a new range of `count` actions between two cursors
    pub fn open(start: Cursor, end: Cursor, count: u64) -> Self {
        Self {
            range_id: Uuid::now_v7(),
            start,
            end,
            pending: count,
            turn: 0,
            opened_at: Utc::now(),
        }
    }

    /// Total actions frozen into this range
    pub fn total(&self) -> u64 {
        self.turn + self.pending
    }

    /// Check whether every action has been settled
    pub fn is_drained(&self) -> bool {
        self.pending == 0
    }

    /// Record one settled action: the turn passes, one fewer pending
    ///
    /// Callers resolve the current action first, so the range is never
    /// advanced past its end.
    pub fn advance(&mut self) {
        self.turn += 1;
        self.pending -= 1;
    }
}

/// The action whose turn it is, plus an echo of the range coordinates
///
/// The echo lets the caller reassert `start`/`end`/`turn` against the
/// persisted range state before mutating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAction {
    /// Payload of the entry at the current turn
    pub payload: AccountRecord,

    /// Echoed range start
    pub start: Cursor,

    /// Echoed range end
    pub end: Cursor,

    /// Echoed turn the payload was resolved at
    pub turn: u64,
}

impl CurrentAction {
    /// Check the echoed coordinates against a persisted range
    pub fn matches(&self, range: &ActionRange) -> bool {
        self.start == range.start && self.end == range.end && self.turn == range.turn
    }
}

/// Resolve the action at the current turn of an open range
///
/// Indexes directly into the frozen slice; the result is identical to
/// visiting every entry and keeping the one at the turn position.
pub fn current_action(log: &ActionLog, range: &ActionRange) -> Result<CurrentAction> {
    let entries = log.entries_between(&range.start, &range.end)?;

    let found = entries.len() as u64;
    if found != range.total() {
        return Err(Error::RangeMismatch {
            expected: range.total(),
            found,
        });
    }
    if range.is_drained() {
        return Err(Error::RangeDrained);
    }

    Ok(CurrentAction {
        payload: entries[range.turn as usize].payload.clone(),
        start: range.start,
        end: range.end,
        turn: range.turn,
    })
}
