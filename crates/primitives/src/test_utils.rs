//! Test utilities for the primitives.
//!
//! These utilities are not written in the `test-utils` crate to keep the primitives crate
//! completely independent.

use secp256k1::{rand::thread_rng, SecretKey, SECP256K1};

use crate::types::Address;

/// Generates a random secret key together with the address it controls.
pub(crate) fn generate_keypair() -> (SecretKey, Address) {
    let sk = SecretKey::new(&mut thread_rng());
    let address = Address::from_public_key(&sk.public_key(SECP256K1));

    (sk, address)
}

/// Generates a random address.
pub(crate) fn generate_address() -> Address {
    generate_keypair().1
}
