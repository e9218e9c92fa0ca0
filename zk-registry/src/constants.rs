//! Crate-wide constants shared by the accumulator, the registry and the verifier.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;
use std::sync::OnceLock;

/// Default depth of the doctor tree.
///
/// Depth 4 gives 16 leaf slots, enough for a small registry of practitioners.
pub const DEFAULT_TREE_DEPTH: usize = 4;

/// Largest supported depth. Leaf indices are `u64` and capacity is `2^depth`.
pub const MAX_TREE_DEPTH: usize = 32;

/// Environment variable consulted by [`crate::config::RegistryConfig::from_env`].
pub const TREE_DEPTH_ENV: &str = "REGISTRY_TREE_DEPTH";

/// Domain tag absorbed before the two children of an interior node.
pub const NODE_DOMAIN: u64 = 1;

/// Domain tag absorbed before the two halves of a public key leaf.
pub const LEAF_DOMAIN: u64 = 2;

/// Prefix of messages produced by [`crate::verifier::context_bound_message`].
pub const CONTEXT_TAG: &[u8] = b"sick-note/v1";

// Poseidon sponge configuration.
//
// Width-3 sponge (rate=2, capacity=1): every node hash absorbs a domain tag and
// two field elements.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Number of leaf slots in a tree of the given depth.
///
/// Callers run [`crate::config::validate_depth`] first, so the shift cannot overflow.
pub fn capacity(depth: usize) -> u64 {
    1u64 << depth
}

/// Poseidon parameters for BN254::Fr.
///
/// Derivation runs the Grain LFSR, so the result is computed once and shared.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

    CONFIG.get_or_init(|| {
        let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            prime_bits,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );

        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}
