//! Types shared between the accumulator, the registry and the verifier.

use crate::errors::{CodecError, RegistryError};
use crate::signature::PublicKey;
use ark_bn254::Fr;
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// JSON-friendly representation of a field element.
///
/// Fr values travel as hex of arkworks' canonical compressed encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrHex {
    pub hex: String,
}

impl FrHex {
    pub fn from_fr(x: &Fr) -> Self {
        let mut bytes = Vec::new();
        x.serialize_compressed(&mut bytes)
            .expect("in-memory serialization");
        Self { hex: hex::encode(bytes) }
    }

    pub fn to_fr(&self) -> Result<Fr, CodecError> {
        let bytes = hex::decode(&self.hex).map_err(|e| CodecError::Hex(e.to_string()))?;
        Fr::deserialize_compressed(&bytes[..]).map_err(|e| CodecError::Field(e.to_string()))
    }
}

/// A node value of the doctor tree: a leaf hash, an interior hash, or the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Root(pub Fr);

impl Root {
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn as_fr(&self) -> &Fr {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        FrHex::from_fr(&self.0).hex
    }

    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        FrHex { hex: hex.trim().to_lowercase() }.to_fr().map(Self)
    }

    /// Canonical compressed encoding (32 bytes, little-endian).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32);
        self.0
            .serialize_compressed(&mut bytes)
            .expect("in-memory serialization");
        bytes
    }
}

impl From<Fr> for Root {
    fn from(x: Fr) -> Self {
        Self(x)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Root {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Root {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Root::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Which child the running node is at one level of a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Current node is the left child; path bit 0.
    Left,
    /// Current node is the right child; path bit 1.
    Right,
}

impl Direction {
    pub fn bit(self) -> u64 {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
        }
    }

    pub fn from_bit(bit: u64) -> Self {
        if bit & 1 == 1 { Direction::Right } else { Direction::Left }
    }
}

/// One level of a membership proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub sibling: Root,
    pub direction: Direction,
}

/// Sibling path from a leaf up to the root, leaf level first.
///
/// A witness produced per call by the tree mirror; never persisted by the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    pub path: Vec<PathStep>,
}

impl MembershipProof {
    pub fn new(path: Vec<PathStep>) -> Self {
        Self { path }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Slot this path points at; see [`crate::merkle::index_from_proof`].
    pub fn index(&self) -> Result<u64, RegistryError> {
        crate::merkle::index_from_proof(self)
    }
}

/// A registered doctor key and the slot it occupies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub public_key: PublicKey,
    pub index: u64,
}
