//! Keyed Merkle tree for ledger commitments
//!
//! This module provides the fixed-depth keyed Merkle structure that
//! collapses all committed account records to a single root.
//!
//! # Design
//!
//! - Binary Merkle tree with SHA-256 hashing, fixed depth D
//! - Leaf keys are u64 indices; capacity is 2^D slots
//! - Unoccupied slots hash to the empty-leaf sentinel; per-level default
//!   hashes keep the node store sparse
//! - Witness generation is O(D); commits rewrite one root-path

use crate::{hash, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Monotonically assigned leaf slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeafKey(u64);

impl LeafKey {
    /// Create from a slot index
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// Get the slot index
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeafKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sibling path proving a leaf occupies a key under some root
///
/// Siblings are ordered bottom-up; the key's bits select the hashing
/// side at each level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerWitness {
    key: LeafKey,
    siblings: Vec<[u8; 32]>,
}

impl LedgerWitness {
    /// Key this witness targets
    pub fn key(&self) -> LeafKey {
        self.key
    }

    /// Sibling hashes, bottom-up
    pub fn siblings(&self) -> &[[u8; 32]] {
        &self.siblings
    }

    /// Root reconstructed by placing `leaf` at the witnessed key
    pub fn root_for(&self, leaf: [u8; 32]) -> [u8; 32] {
        let mut current = leaf;
        for (level, sibling) in self.siblings.iter().enumerate() {
            current = if (self.key.index() >> level) & 1 == 0 {
                hash::hash_pair(&current, sibling)
            } else {
                hash::hash_pair(sibling, &current)
            };
        }
        current
    }

    /// Check that this witness proves `leaf` under `expected_root`
    pub fn proves(&self, leaf: [u8; 32], expected_root: [u8; 32]) -> bool {
        self.root_for(leaf) == expected_root
    }
}

/// Fixed-depth keyed Merkle tree
///
/// Only nodes that differ from the per-level defaults are stored, so an
/// almost-empty tree of depth 32 costs a handful of entries.
#[derive(Debug, Clone)]
pub struct LedgerTree {
    depth: usize,
    /// Non-default nodes, keyed by (level, index); level 0 = leaves
    nodes: HashMap<(usize, u64), [u8; 32]>,
    /// Default hash per level for unoccupied subtrees
    defaults: Vec<[u8; 32]>,
    root: [u8; 32],
}

impl LedgerTree {
    /// Create an empty tree of the given depth (capacity 2^depth slots)
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 || depth > 63 {
            return Err(Error::DepthOutOfRange(depth));
        }

        let mut defaults = Vec::with_capacity(depth + 1);
        defaults.push(hash::empty_leaf());
        for level in 0..depth {
            let below = defaults[level];
            defaults.push(hash::hash_pair(&below, &below));
        }
        let root = defaults[depth];

        Ok(Self {
            depth,
            nodes: HashMap::new(),
            defaults,
            root,
        })
    }

    /// Tree depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaf slots
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Current root commitment
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Hash currently committed at `key` (the sentinel if unoccupied)
    pub fn leaf(&self, key: LeafKey) -> Result<[u8; 32]> {
        self.check_key(key)?;
        Ok(self.node(0, key.index()))
    }

    /// Commit `leaf` at `key`, returning the new root
    pub fn commit(&mut self, key: LeafKey, leaf: [u8; 32]) -> Result<[u8; 32]> {
        self.check_key(key)?;

        let mut index = key.index();
        self.nodes.insert((0, index), leaf);

        for level in 0..self.depth {
            let node = self.node(level, index);
            let sibling = self.node(level, index ^ 1);
            let parent = if index & 1 == 0 {
                hash::hash_pair(&node, &sibling)
            } else {
                hash::hash_pair(&sibling, &node)
            };
            index >>= 1;
            self.nodes.insert((level + 1, index), parent);
        }

        self.root = self.node(self.depth, 0);
        Ok(self.root)
    }

    /// Generate a witness for `key` against the current root
    pub fn witness(&self, key: LeafKey) -> Result<LedgerWitness> {
        self.check_key(key)?;

        let mut siblings = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            let index = key.index() >> level;
            siblings.push(self.node(level, index ^ 1));
        }

        Ok(LedgerWitness { key, siblings })
    }

    fn node(&self, level: usize, index: u64) -> [u8; 32] {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.defaults[level])
    }

    fn check_key(&self, key: LeafKey) -> Result<()> {
        if key.index() >= self.capacity() {
            return Err(Error::KeyOutOfRange {
                key: key.index(),
                depth: self.depth,
            });
        }
        Ok(())
    }
}
