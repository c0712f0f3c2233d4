//! Error types for the action log

use crate::log::Cursor;
use thiserror::Error;

/// Result type for log operations
pub type Result<T> = std::result::Result<T, Error>;

/// Action log errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Cursor does not point into this log
    #[error("unknown cursor {0}")]
    UnknownCursor(Cursor),

    /// Range boundaries are reversed
    #[error("inverted range: start {start} is after end {end}")]
    InvertedRange {
        /// Claimed range start
        start: Cursor,
        /// Claimed range end
        end: Cursor,
    },

    /// Range counters disagree with the log slice they describe
    #[error("range mismatch: counters describe {expected} actions, log slice holds {found}")]
    RangeMismatch {
        /// Actions according to the range counters
        expected: u64,
        /// Actions actually between the range cursors
        found: u64,
    },

    /// Every action in the range has already been settled
    #[error("range is fully drained")]
    RangeDrained,
}
