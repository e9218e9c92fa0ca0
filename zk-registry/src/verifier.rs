//! Sick-note verification.
//!
//! A note is valid when the claimed doctor key sits under the registry root and
//! that key signed the message (the patient's public key). Wrapped in a succinct
//! proof, this predicate tells an employer that *some* registered doctor signed,
//! without revealing which one and therefore without revealing the specialty.

use crate::constants::CONTEXT_TAG;
use crate::errors::VerifyError;
use crate::merkle::{leaf_hash, verify_inclusion};
use crate::signature::{verify as verify_signature, PublicKey, Signature};
use crate::types::{MembershipProof, Root};
use tracing::debug;

/// Pure predicate: inclusion of `candidate` under `root` and a valid signature.
pub fn verify_membership_signature(
    root: &Root,
    proof: &MembershipProof,
    candidate: &PublicKey,
    signature: &Signature,
    message: &[u8],
) -> bool {
    check_membership_signature(root, proof, candidate, signature, message).is_ok()
}

/// Same check as [`verify_membership_signature`], reporting which half failed.
pub fn check_membership_signature(
    root: &Root,
    proof: &MembershipProof,
    candidate: &PublicKey,
    signature: &Signature,
    message: &[u8],
) -> Result<(), VerifyError> {
    if !verify_inclusion(root, &leaf_hash(candidate), proof) {
        debug!(%root, "sick note rejected: key not under root");
        return Err(VerifyError::NotAMember);
    }
    if !verify_signature(candidate, message, signature) {
        debug!(%root, "sick note rejected: bad signature");
        return Err(VerifyError::InvalidSignature);
    }
    Ok(())
}

/// `CONTEXT_TAG || root || message`.
///
/// Opt-in: signing this instead of the bare message ties a note to one registry
/// root, so it stops verifying once the registry moves on.
pub fn context_bound_message(root: &Root, message: &[u8]) -> Vec<u8> {
    let root_bytes = root.to_bytes();
    let mut out = Vec::with_capacity(CONTEXT_TAG.len() + root_bytes.len() + message.len());
    out.extend_from_slice(CONTEXT_TAG);
    out.extend_from_slice(&root_bytes);
    out.extend_from_slice(message);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::TreeMirror;
    use crate::signature::DoctorKeyPair;

    fn tree_with(doctors: &[&DoctorKeyPair]) -> TreeMirror {
        let mut tree = TreeMirror::new(4).unwrap();
        for (i, d) in doctors.iter().enumerate() {
            tree.set_member(i as u64, &d.public_key()).unwrap();
        }
        tree
    }

    #[test]
    fn member_signature_verifies() {
        let doc = DoctorKeyPair::from_seed([1u8; 32]);
        let patient = DoctorKeyPair::from_seed([2u8; 32]).public_key();
        let tree = tree_with(&[&doc]);
        let sig = doc.sign(patient.as_bytes());

        let proof = tree.proof(0).unwrap();
        let signer = doc.public_key();
        let message = patient.as_bytes();
        let result = check_membership_signature(&tree.root(), &proof, &signer, &sig, message);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn outsider_is_not_a_member() {
        let doc = DoctorKeyPair::from_seed([1u8; 32]);
        let outsider = DoctorKeyPair::from_seed([3u8; 32]);
        let tree = tree_with(&[&doc]);
        let sig = outsider.sign(b"patient");

        let proof = tree.proof(0).unwrap();
        let signer = outsider.public_key();
        let result = check_membership_signature(&tree.root(), &proof, &signer, &sig, b"patient");
        assert_eq!(result, Err(VerifyError::NotAMember));
    }

    #[test]
    fn member_with_foreign_signature_fails() {
        let a = DoctorKeyPair::from_seed([1u8; 32]);
        let b = DoctorKeyPair::from_seed([4u8; 32]);
        let tree = tree_with(&[&a, &b]);
        let sig = b.sign(b"patient");

        let proof = tree.proof(0).unwrap();
        let signer = a.public_key();
        let result = check_membership_signature(&tree.root(), &proof, &signer, &sig, b"patient");
        assert_eq!(result, Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn context_binding_ties_note_to_root() {
        let doc = DoctorKeyPair::from_seed([1u8; 32]);
        let mut tree = tree_with(&[&doc]);
        let old_root = tree.root();
        let msg = context_bound_message(&old_root, b"patient");
        let sig = doc.sign(&msg);
        let signer = doc.public_key();
        let proof = tree.proof(0).unwrap();
        assert!(verify_membership_signature(&old_root, &proof, &signer, &sig, &msg));

        tree.set_member(1, &DoctorKeyPair::from_seed([5u8; 32]).public_key()).unwrap();
        let new_root = tree.root();
        let new_msg = context_bound_message(&new_root, b"patient");
        let proof = tree.proof(0).unwrap();
        assert!(!verify_membership_signature(&new_root, &proof, &signer, &sig, &new_msg));
        assert!(msg.starts_with(CONTEXT_TAG));
    }
}
