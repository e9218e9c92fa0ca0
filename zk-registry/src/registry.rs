//! Doctor registry state machine.
//!
//! State is the triple (authority, root, next free slot) plus the tree depth.
//! [`RegistryState`] is an immutable snapshot with pure transitions;
//! [`Registry`] is the single-writer cell that applies them with a
//! compare-and-commit step, so a writer holding an outdated snapshot is
//! rejected instead of overwriting newer state.
//!
//! All checks precede all writes. A rejected call leaves the cell untouched.

use crate::config::{validate_depth, RegistryConfig};
use crate::constants::capacity;
use crate::errors::RegistryError;
use crate::merkle::{leaf_hash, verify_and_compute_new_root, zero_leaf};
use crate::signature::PublicKey;
use crate::types::{Member, MembershipProof, Root};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One consistent view of the registry.
///
/// Serializable so the ledger that persists it between calls can store it as-is.
/// Deserialization applies the same depth and slot bounds as `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredState")]
pub struct RegistryState {
    authority: PublicKey,
    root: Root,
    next_index: u64,
    depth: usize,
}

/// Wire form of [`RegistryState`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredState {
    authority: PublicKey,
    root: Root,
    next_index: u64,
    depth: usize,
}

impl TryFrom<StoredState> for RegistryState {
    type Error = RegistryError;

    fn try_from(raw: StoredState) -> Result<Self, Self::Error> {
        validate_depth(raw.depth)?;
        let cap = capacity(raw.depth);
        if raw.next_index > cap {
            return Err(RegistryError::IndexOutOfRange { index: raw.next_index, capacity: cap });
        }
        Ok(Self {
            authority: raw.authority,
            root: raw.root,
            next_index: raw.next_index,
            depth: raw.depth,
        })
    }
}

impl RegistryState {
    /// Fresh state: `root` is normally [`crate::merkle::empty_root`] at the configured depth.
    pub fn initialize(
        authority: PublicKey,
        initial_root: Root,
        config: &RegistryConfig,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self {
            authority,
            root: initial_root,
            next_index: 0,
            depth: config.tree_depth,
        })
    }

    pub fn authority(&self) -> &PublicKey {
        &self.authority
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        capacity(self.depth)
    }

    /// Append `doctor` at the next free slot.
    ///
    /// `proof` is the mirror's path for slot `next_index`, taken while that slot
    /// was still empty. Returns the successor state and the new member.
    pub fn register(
        &self,
        caller: &PublicKey,
        doctor: &PublicKey,
        proof: &MembershipProof,
    ) -> Result<(RegistryState, Member), RegistryError> {
        if *caller != self.authority {
            return Err(RegistryError::Unauthorized);
        }

        let cap = self.capacity();
        if self.next_index >= cap {
            return Err(RegistryError::IndexOutOfRange { index: self.next_index, capacity: cap });
        }

        let update = verify_and_compute_new_root(
            &zero_leaf(),
            &leaf_hash(doctor),
            proof,
            self.next_index,
            self.depth,
        )?;

        // The path must describe the tree this state committed to.
        if update.old_root != self.root {
            return Err(RegistryError::StaleState {
                field: "root",
                observed: update.old_root.to_hex(),
                current: self.root.to_hex(),
            });
        }

        let member = Member { public_key: *doctor, index: self.next_index };
        let next = RegistryState {
            authority: self.authority,
            root: update.new_root,
            next_index: self.next_index + 1,
            depth: self.depth,
        };
        Ok((next, member))
    }

    /// First field in which `self` (what a caller observed) differs from `current`.
    fn ensure_matches(&self, current: &RegistryState) -> Result<(), RegistryError> {
        if self.authority != current.authority {
            return stale("authority", self.authority, current.authority);
        }
        if self.root != current.root {
            return stale("root", self.root, current.root);
        }
        if self.next_index != current.next_index {
            return stale("next_index", self.next_index, current.next_index);
        }
        if self.depth != current.depth {
            return stale("depth", self.depth, current.depth);
        }
        Ok(())
    }
}

fn stale<T: std::fmt::Display>(
    field: &'static str,
    observed: T,
    current: T,
) -> Result<(), RegistryError> {
    Err(RegistryError::StaleState {
        field,
        observed: observed.to_string(),
        current: current.to_string(),
    })
}

/// Single-writer registry cell: `Uninitialized -> Initialized`.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    state: Option<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a state persisted by the ledger.
    pub fn from_state(state: RegistryState) -> Self {
        Self { state: Some(state) }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn initialize(
        &mut self,
        authority: PublicKey,
        initial_root: Root,
        config: &RegistryConfig,
    ) -> Result<(), RegistryError> {
        if self.state.is_some() {
            warn!("initialize called on an initialized registry");
            return Err(RegistryError::AlreadyInitialized);
        }
        let state = RegistryState::initialize(authority, initial_root, config)?;
        info!(
            authority = %state.authority,
            root = %state.root,
            depth = state.depth,
            "registry initialized"
        );
        self.state = Some(state);
        Ok(())
    }

    pub fn state(&self) -> Result<&RegistryState, RegistryError> {
        self.state.as_ref().ok_or(RegistryError::NotInitialized)
    }

    pub fn current_root(&self) -> Result<Root, RegistryError> {
        Ok(self.state()?.root())
    }

    pub fn current_index(&self) -> Result<u64, RegistryError> {
        Ok(self.state()?.next_index())
    }

    pub fn authority(&self) -> Result<PublicKey, RegistryError> {
        Ok(*self.state()?.authority())
    }

    /// Observe the current state and register against it.
    pub fn register(
        &mut self,
        caller: &PublicKey,
        doctor: &PublicKey,
        proof: &MembershipProof,
    ) -> Result<Member, RegistryError> {
        let observed = self.state()?.clone();
        self.register_observed(&observed, caller, doctor, proof)
    }

    /// Register against a state the caller read earlier.
    ///
    /// Fails with `StaleState` if the registry moved since `observed` was read.
    pub fn register_observed(
        &mut self,
        observed: &RegistryState,
        caller: &PublicKey,
        doctor: &PublicKey,
        proof: &MembershipProof,
    ) -> Result<Member, RegistryError> {
        let result = self.try_register(observed, caller, doctor, proof);
        match &result {
            Ok(member) => {
                info!(doctor = %member.public_key, index = member.index, "doctor registered")
            }
            Err(e) => warn!(doctor = %doctor, error = %e, "registration rejected"),
        }
        result
    }

    fn try_register(
        &mut self,
        observed: &RegistryState,
        caller: &PublicKey,
        doctor: &PublicKey,
        proof: &MembershipProof,
    ) -> Result<Member, RegistryError> {
        observed.ensure_matches(self.state()?)?;
        let (next, member) = observed.register(caller, doctor, proof)?;
        self.commit(observed, next)?;
        Ok(member)
    }

    /// Replace the state with `next` only if it still equals `observed`.
    pub fn commit(
        &mut self,
        observed: &RegistryState,
        next: RegistryState,
    ) -> Result<(), RegistryError> {
        let current = self.state.as_mut().ok_or(RegistryError::NotInitialized)?;
        observed.ensure_matches(current)?;
        *current = next;
        Ok(())
    }
}
