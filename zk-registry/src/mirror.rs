//! Off-registry mirror of the doctor tree.
//!
//! The registry only keeps the root and the next free slot. Whoever submits
//! registrations keeps this mirror next to it, writes each accepted leaf into
//! it, and asks it for the sibling paths that `register` and the verifier
//! consume.

use crate::config::validate_depth;
use crate::constants::capacity;
use crate::errors::RegistryError;
use crate::merkle::{hash_two, leaf_hash, zero_hashes};
use crate::signature::PublicKey;
use crate::types::{Direction, MembershipProof, PathStep, Root};
use std::collections::BTreeMap;

/// Sparse in-memory tree: only non-empty nodes are stored.
#[derive(Clone, Debug)]
pub struct TreeMirror {
    depth: usize,
    zeros: Vec<Root>,
    // levels[0] holds leaves, levels[depth] holds the root.
    levels: Vec<BTreeMap<u64, Root>>,
}

impl TreeMirror {
    pub fn new(depth: usize) -> Result<Self, RegistryError> {
        validate_depth(depth)?;
        Ok(Self {
            depth,
            zeros: zero_hashes(depth),
            levels: vec![BTreeMap::new(); depth + 1],
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        capacity(self.depth)
    }

    /// Number of non-empty leaf slots.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    fn node(&self, level: usize, index: u64) -> Root {
        self.levels[level]
            .get(&index)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    fn check_index(&self, index: u64) -> Result<(), RegistryError> {
        let cap = self.capacity();
        if index >= cap {
            return Err(RegistryError::IndexOutOfRange { index, capacity: cap });
        }
        Ok(())
    }

    pub fn root(&self) -> Root {
        self.node(self.depth, 0)
    }

    pub fn leaf(&self, index: u64) -> Result<Root, RegistryError> {
        self.check_index(index)?;
        Ok(self.node(0, index))
    }

    /// Write a raw leaf value and refresh the path above it.
    pub fn set_leaf(&mut self, index: u64, value: Root) -> Result<(), RegistryError> {
        self.check_index(index)?;

        let mut idx = index;
        let mut cur = value;
        for level in 0..self.depth {
            self.store(level, idx, cur);
            let sibling = self.node(level, idx ^ 1);
            cur = if idx & 1 == 0 {
                hash_two(&cur, &sibling)
            } else {
                hash_two(&sibling, &cur)
            };
            idx >>= 1;
        }
        self.store(self.depth, 0, cur);
        Ok(())
    }

    /// Write the leaf of a doctor key.
    pub fn set_member(&mut self, index: u64, public_key: &PublicKey) -> Result<(), RegistryError> {
        self.set_leaf(index, leaf_hash(public_key))
    }

    fn store(&mut self, level: usize, index: u64, value: Root) {
        if value == self.zeros[level] {
            self.levels[level].remove(&index);
        } else {
            self.levels[level].insert(index, value);
        }
    }

    /// Sibling path for `index`, leaf level first.
    pub fn proof(&self, index: u64) -> Result<MembershipProof, RegistryError> {
        self.check_index(index)?;

        let mut idx = index;
        let mut path = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            path.push(PathStep {
                sibling: self.node(level, idx ^ 1),
                direction: if idx & 1 == 0 { Direction::Left } else { Direction::Right },
            });
            idx >>= 1;
        }
        Ok(MembershipProof::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::{compute_root, empty_root, index_from_proof, verify_inclusion, zero_leaf};

    #[test]
    fn fresh_mirror_has_empty_root() {
        let tree = TreeMirror::new(4).unwrap();
        assert_eq!(tree.root(), empty_root(4));
        assert!(tree.is_empty());
        assert_eq!(tree.capacity(), 16);
    }

    #[test]
    fn rejects_bad_depth() {
        assert!(matches!(TreeMirror::new(0), Err(RegistryError::InvalidDepth { .. })));
        assert!(matches!(TreeMirror::new(33), Err(RegistryError::InvalidDepth { .. })));
    }

    #[test]
    fn proofs_match_root_for_every_slot() {
        let mut tree = TreeMirror::new(4).unwrap();
        tree.set_member(0, &PublicKey([1u8; 32])).unwrap();
        tree.set_member(5, &PublicKey([2u8; 32])).unwrap();
        tree.set_member(15, &PublicKey([3u8; 32])).unwrap();

        for i in 0..16 {
            let proof = tree.proof(i).unwrap();
            assert_eq!(index_from_proof(&proof).unwrap(), i);
            assert_eq!(compute_root(&tree.leaf(i).unwrap(), &proof), tree.root());
        }
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn clearing_a_leaf_restores_empty_root() {
        let mut tree = TreeMirror::new(4).unwrap();
        tree.set_member(7, &PublicKey([4u8; 32])).unwrap();
        assert_ne!(tree.root(), empty_root(4));
        tree.set_leaf(7, zero_leaf()).unwrap();
        assert_eq!(tree.root(), empty_root(4));
        assert!(tree.is_empty());
    }

    #[test]
    fn proof_taken_before_write_gives_same_root_after() {
        let mut tree = TreeMirror::new(4).unwrap();
        tree.set_member(0, &PublicKey([1u8; 32])).unwrap();
        let proof = tree.proof(1).unwrap();
        let key = PublicKey([2u8; 32]);
        tree.set_member(1, &key).unwrap();
        assert!(verify_inclusion(&tree.root(), &leaf_hash(&key), &proof));
    }

    #[test]
    fn out_of_range_slot() {
        let tree = TreeMirror::new(4).unwrap();
        assert_eq!(
            tree.proof(16),
            Err(RegistryError::IndexOutOfRange { index: 16, capacity: 16 })
        );
    }
}
