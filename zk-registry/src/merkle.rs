//! Fixed-depth Merkle accumulator over Poseidon.
//!
//! Stateless: every function takes the leaf values and the caller-supplied
//! sibling path. Storage of the full tree lives in [`crate::mirror`].
//!
//! - Node: `Poseidon(NODE_DOMAIN, left, right)`.
//! - Key leaf: `Poseidon(LEAF_DOMAIN, lo, hi)` over the two 16-byte halves of the key.
//! - Empty slot: `Fr::zero()`.

use crate::config::validate_depth;
use crate::constants::{capacity, poseidon_config, LEAF_DOMAIN, MAX_TREE_DEPTH, NODE_DOMAIN};
use crate::errors::RegistryError;
use crate::signature::PublicKey;
use crate::types::{Direction, MembershipProof, Root};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::PrimeField;

/// Roots implied by one proof before and after a leaf substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootUpdate {
    pub old_root: Root,
    pub new_root: Root,
}

fn poseidon3(domain: u64, a: Fr, b: Fr) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    let input: &[Fr] = &[Fr::from(domain), a, b];
    sponge.absorb(&input);
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Combine two children into their parent.
pub fn hash_two(left: &Root, right: &Root) -> Root {
    Root(poseidon3(NODE_DOMAIN, left.0, right.0))
}

/// Leaf value of a registered public key.
///
/// Each 16-byte half fits below the BN254 modulus, so the embedding is injective.
pub fn leaf_hash(public_key: &PublicKey) -> Root {
    let bytes = public_key.as_bytes();
    let lo = Fr::from_le_bytes_mod_order(&bytes[..16]);
    let hi = Fr::from_le_bytes_mod_order(&bytes[16..]);
    Root(poseidon3(LEAF_DOMAIN, lo, hi))
}

/// Value of an empty slot.
pub fn zero_leaf() -> Root {
    Root::zero()
}

/// Roots of all-empty subtrees, index = subtree height (`0..=depth`).
pub fn zero_hashes(depth: usize) -> Vec<Root> {
    let mut out = Vec::with_capacity(depth + 1);
    let mut cur = zero_leaf();
    out.push(cur);
    for _ in 0..depth {
        cur = hash_two(&cur, &cur);
        out.push(cur);
    }
    out
}

/// Root of a tree of `depth` levels whose leaves are all empty.
pub fn empty_root(depth: usize) -> Root {
    let mut cur = zero_leaf();
    for _ in 0..depth {
        cur = hash_two(&cur, &cur);
    }
    cur
}

/// Slot index encoded by the path directions; bit `i` is the direction at level `i`.
pub fn index_from_proof(proof: &MembershipProof) -> Result<u64, RegistryError> {
    if proof.len() > MAX_TREE_DEPTH {
        return Err(RegistryError::MalformedProof { expected: MAX_TREE_DEPTH, got: proof.len() });
    }
    Ok(proof
        .path
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, step)| acc | (step.direction.bit() << i)))
}

/// Walk `leaf` up the sibling path and return the root it implies.
pub fn compute_root(leaf: &Root, proof: &MembershipProof) -> Root {
    proof.path.iter().fold(*leaf, |cur, step| match step.direction {
        Direction::Left => hash_two(&cur, &step.sibling),
        Direction::Right => hash_two(&step.sibling, &cur),
    })
}

/// Recompute the root around the slot `proof` points at, once with `old_leaf`
/// and once with `new_leaf`.
///
/// The old root is returned, not checked: comparing it with the committed root
/// is the caller's job.
pub fn verify_and_compute_new_root(
    old_leaf: &Root,
    new_leaf: &Root,
    proof: &MembershipProof,
    claimed_index: u64,
    depth: usize,
) -> Result<RootUpdate, RegistryError> {
    validate_depth(depth)?;
    if proof.len() != depth {
        return Err(RegistryError::MalformedProof { expected: depth, got: proof.len() });
    }
    let cap = capacity(depth);
    if claimed_index >= cap {
        return Err(RegistryError::IndexOutOfRange { index: claimed_index, capacity: cap });
    }
    let got = index_from_proof(proof)?;
    if got != claimed_index {
        return Err(RegistryError::IndexMismatch { expected: claimed_index, got });
    }

    Ok(RootUpdate {
        old_root: compute_root(old_leaf, proof),
        new_root: compute_root(new_leaf, proof),
    })
}

/// Whether `leaf` sits under `root` along `proof`.
pub fn verify_inclusion(root: &Root, leaf: &Root, proof: &MembershipProof) -> bool {
    compute_root(leaf, proof) == *root
}
