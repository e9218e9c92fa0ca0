//! Registry lifecycle and sick-note checks through the public API.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::EnvFilter;
use zk_registry::merkle::{leaf_hash, verify_inclusion};
use zk_registry::{
    empty_root, verify_membership_signature, DoctorKeyPair, Member, Registry, RegistryConfig,
    RegistryError, Root, TreeMirror,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn keypair(seed: u64) -> DoctorKeyPair {
    DoctorKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(seed))
}

struct Fixture {
    authority: DoctorKeyPair,
    registry: Registry,
    tree: TreeMirror,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        let cfg = RegistryConfig::default();
        let authority = keypair(0);
        let mut registry = Registry::new();
        registry
            .initialize(authority.public_key(), empty_root(cfg.tree_depth), &cfg)
            .unwrap();
        let tree = TreeMirror::new(cfg.tree_depth).unwrap();
        Self { authority, registry, tree }
    }

    fn add(&mut self, doctor: &DoctorKeyPair) -> Result<Member, RegistryError> {
        let index = self.registry.current_index()?;
        let proof = self.tree.proof(index)?;
        let member = self
            .registry
            .register(&self.authority.public_key(), &doctor.public_key(), &proof)?;
        self.tree.set_member(member.index, &doctor.public_key())?;
        Ok(member)
    }
}

#[test]
fn doctors_note_end_to_end() {
    let mut fx = Fixture::new();
    let cardio = keypair(1);
    let derm = keypair(2);
    let patient = keypair(3).public_key();

    let m1 = fx.add(&cardio).unwrap();
    assert_eq!(m1, Member { public_key: cardio.public_key(), index: 0 });
    assert_eq!(fx.registry.current_index().unwrap(), 1);
    assert_eq!(fx.registry.current_root().unwrap(), fx.tree.root());

    let m2 = fx.add(&derm).unwrap();
    assert_eq!(m2, Member { public_key: derm.public_key(), index: 1 });
    assert_eq!(fx.registry.current_root().unwrap(), fx.tree.root());

    let root = fx.registry.current_root().unwrap();
    let proof = fx.tree.proof(1).unwrap();
    let sig = derm.sign(patient.as_bytes());

    let message = patient.as_bytes();
    assert!(verify_membership_signature(&root, &proof, &derm.public_key(), &sig, message));
    assert!(!verify_membership_signature(&root, &proof, &cardio.public_key(), &sig, message));
}

#[test]
fn seventeenth_registration_is_out_of_range() {
    let mut fx = Fixture::new();
    for seed in 1..=16 {
        fx.add(&keypair(seed)).unwrap();
    }
    assert_eq!(
        fx.add(&keypair(17)),
        Err(RegistryError::IndexOutOfRange { index: 16, capacity: 16 })
    );
    assert_eq!(fx.registry.current_index().unwrap(), 16);
}

#[test]
fn non_authority_cannot_register() {
    let mut fx = Fixture::new();
    let before = fx.registry.state().unwrap().clone();
    let intruder = keypair(9);
    let proof = fx.tree.proof(0).unwrap();

    assert_eq!(
        fx.registry
            .register(&intruder.public_key(), &intruder.public_key(), &proof),
        Err(RegistryError::Unauthorized)
    );
    assert_eq!(fx.registry.state().unwrap(), &before);
}

#[test]
fn every_registered_doctor_can_sign() {
    let mut fx = Fixture::new();
    let doctors: Vec<_> = (10..15).map(keypair).collect();
    for d in &doctors {
        fx.add(d).unwrap();
    }
    let root = fx.registry.current_root().unwrap();
    for (i, d) in doctors.iter().enumerate() {
        let sig = d.sign(b"patient-key");
        let proof = fx.tree.proof(i as u64).unwrap();
        assert!(verify_membership_signature(&root, &proof, &d.public_key(), &sig, b"patient-key"));
    }
}

fn flip(bytes: &mut [u8], bit: usize) {
    bytes[bit / 8] ^= 1 << (bit % 8);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn registrations_are_append_only(n in 1usize..=16) {
        let mut fx = Fixture::new();
        for i in 0..n {
            let before = fx.registry.current_index().unwrap();
            let proof = fx.tree.proof(before).unwrap();
            let doctor = keypair(100 + i as u64);
            let member = fx
                .registry
                .register(&fx.authority.public_key(), &doctor.public_key(), &proof)
                .unwrap();
            fx.tree.set_member(member.index, &doctor.public_key()).unwrap();

            prop_assert_eq!(member.index, before);
            prop_assert_eq!(fx.registry.current_index().unwrap(), before + 1);
            prop_assert!(verify_inclusion(
                &fx.registry.current_root().unwrap(),
                &leaf_hash(&doctor.public_key()),
                &proof
            ));
        }
    }

    #[test]
    fn proof_for_other_slot_is_rejected(registered in 0u64..8, target in 0u64..16) {
        prop_assume!(target != registered);
        let mut fx = Fixture::new();
        for i in 0..registered {
            fx.add(&keypair(200 + i)).unwrap();
        }
        let before = fx.registry.state().unwrap().clone();
        let proof = fx.tree.proof(target).unwrap();

        let err = fx
            .registry
            .register(&fx.authority.public_key(), &keypair(300).public_key(), &proof)
            .unwrap_err();
        prop_assert_eq!(err, RegistryError::IndexMismatch { expected: registered, got: target });
        prop_assert_eq!(fx.registry.state().unwrap(), &before);
    }

    #[test]
    fn single_bit_flip_breaks_note(which in 0u8..3, bit in 0usize..512, level in 0usize..4) {
        let mut fx = Fixture::new();
        let doctor = keypair(1);
        fx.add(&keypair(2)).unwrap();
        fx.add(&doctor).unwrap();

        let root = fx.registry.current_root().unwrap();
        let mut proof = fx.tree.proof(1).unwrap();
        let mut message = keypair(3).public_key().as_bytes().to_vec();
        let mut sig = doctor.sign(&message);
        let signer = doctor.public_key();
        prop_assert!(verify_membership_signature(&root, &proof, &signer, &sig, &message));

        match which {
            0 => flip(&mut sig.0, bit),
            1 => flip(&mut message, bit % 256),
            _ => {
                let mut bytes = proof.path[level].sibling.to_bytes();
                flip(&mut bytes, bit % 254);
                let flipped = Root::from_hex(&hex::encode(&bytes));
                prop_assume!(flipped.is_ok());
                proof.path[level].sibling = flipped.unwrap();
            }
        }
        prop_assert!(!verify_membership_signature(&root, &proof, &signer, &sig, &message));
    }
}
