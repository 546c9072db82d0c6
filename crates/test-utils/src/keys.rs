//! Deterministic and random keys for test accounts.

use plasma_primitives::types::Address;
use secp256k1::{rand::thread_rng, SecretKey, SECP256K1};
use sha2::{Digest, Sha256};

/// An account that can sign transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestAccount {
    /// The signing key.
    pub key: SecretKey,

    /// The address controlled by [`Self::key`].
    pub address: Address,
}

impl TestAccount {
    /// Creates an account whose key is derived from `seed`.
    pub fn from_seed(seed: &str) -> Self {
        let (key, address) = keypair_from_seed(seed);

        Self { key, address }
    }

    /// Creates an account with a random key.
    pub fn random() -> Self {
        let (key, address) = generate_keypair();

        Self { key, address }
    }
}

/// Generates a random secret key together with the address it controls.
pub fn generate_keypair() -> (SecretKey, Address) {
    let sk = SecretKey::new(&mut thread_rng());

    (sk, address_of(&sk))
}

/// Derives a secret key from `seed` by hashing it until the digest is a valid key.
///
/// The same seed always yields the same key.
pub fn keypair_from_seed(seed: &str) -> (SecretKey, Address) {
    let mut digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();

    loop {
        if let Ok(sk) = SecretKey::from_slice(&digest) {
            return (sk, address_of(&sk));
        }

        digest = Sha256::digest(digest).into();
    }
}

fn address_of(sk: &SecretKey) -> Address {
    Address::from_public_key(&sk.public_key(SECP256K1))
}
