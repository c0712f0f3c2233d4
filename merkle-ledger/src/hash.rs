//! Hashing glue for commitments
//!
//! SHA-256 with domain separation. Record leaves, the empty-leaf
//! sentinel, and external chaining each hash under a distinct tag, so a
//! value from one domain can never be mistaken for a value from another.

use sha2::{Digest, Sha256};

/// Domain tag for committed account record leaves
pub const TAG_RECORD_LEAF: &[u8] = b"recon.record-leaf.v1";

/// Domain tag for the reserved empty-leaf sentinel
pub const TAG_EMPTY_LEAF: &[u8] = b"recon.empty-leaf.v1";

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a pair of hashes (used for internal tree nodes)
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Hash one or more byte slices under a domain tag
pub fn tagged(tag: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// The reserved sentinel hash committed at every unregistered leaf key
///
/// Domain-tagged with no payload, so it cannot collide with the hash of
/// any real account record.
pub fn empty_leaf() -> [u8; 32] {
    tagged(TAG_EMPTY_LEAF, &[])
}
