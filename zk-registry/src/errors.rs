use thiserror::Error;

/// Reasons an accumulator call or a registry transition is rejected.
///
/// Every variant is raised before any state is written, so a rejected
/// operation leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("caller is not the registry authority")]
    Unauthorized,

    #[error("stale state: observed {field} {observed}, current {current}")]
    StaleState {
        field: &'static str,
        observed: String,
        current: String,
    },

    #[error("proof targets slot {got}, expected next free slot {expected}")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("slot {index} is outside a tree of capacity {capacity}")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("malformed proof: expected {expected} path steps, got {got}")]
    MalformedProof { expected: usize, got: usize },

    #[error("invalid tree depth {depth}: must be between 1 and {max}")]
    InvalidDepth { depth: usize, max: usize },

    #[error("registry is already initialized")]
    AlreadyInitialized,

    #[error("registry is not initialized")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a sick-note check failed.
///
/// The boolean predicate collapses all of these to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("candidate key is not a member of the registry root")]
    NotAMember,

    #[error("signature does not verify under the candidate key")]
    InvalidSignature,
}

/// Encoding failures for keys, signatures and field elements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("invalid field bytes: {0}")]
    Field(String),
}
