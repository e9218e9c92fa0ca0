//! Privacy-preserving doctor registry.
//!
//! A small set of doctor public keys is accumulated into a Poseidon Merkle tree
//! whose root is the only registry state besides the authority key and the next
//! free slot. A doctor's sick note is checked against that root: membership of
//! the signing key plus a valid signature over the patient's key.
//!
//! This crate contains:
//! - The Merkle accumulator (`merkle`) and an off-registry tree mirror (`mirror`).
//! - The registry state machine with compare-and-commit updates (`registry`).
//! - The sick-note verifier predicate (`verifier`) over Ed25519 signatures (`signature`).

pub mod config;
pub mod constants;
pub mod errors;
pub mod merkle;
pub mod mirror;
pub mod registry;
pub mod signature;
pub mod types;
pub mod verifier;

pub use config::RegistryConfig;
pub use errors::{CodecError, RegistryError, VerifyError};
pub use merkle::{empty_root, RootUpdate};
pub use mirror::TreeMirror;
pub use registry::{Registry, RegistryState};
pub use signature::{DoctorKeyPair, PublicKey, Signature};
pub use types::{Direction, Member, MembershipProof, PathStep, Root};
pub use verifier::{check_membership_signature, verify_membership_signature};
