//! Error types for ledger commitments

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Leaf key outside the tree's capacity
    #[error("leaf key {key} out of range for tree depth {depth}")]
    KeyOutOfRange {
        /// Offending key index
        key: u64,
        /// Tree depth
        depth: usize,
    },

    /// Tree depth outside the supported range
    #[error("unsupported tree depth {0} (expected 1..=63)")]
    DepthOutOfRange(usize),

    /// Checked balance arithmetic overflowed
    #[error("amount arithmetic overflow")]
    AmountOverflow,

    /// Release amount exceeds the record's balance
    #[error("release of {requested} exceeds balance {available}")]
    ReleaseExceedsBalance {
        /// Amount scheduled for release
        requested: Decimal,
        /// Balance available on the record
        available: Decimal,
    },
}
