//! SECP256K1 primitives.
//!
//! Transactions are signed with recoverable ECDSA so that the signer of each input can be derived
//! from the signature alone.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SecretKey, SECP256K1,
};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{
    constants::SIGNATURE_LEN,
    types::{impl_hex_newtype, Address, TxHash},
};

/// A 65-byte recoverable ECDSA signature: the compact signature followed by the recovery id.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl_hex_newtype!(Signature, SIGNATURE_LEN);

impl Default for Signature {
    fn default() -> Self {
        Self::NULL
    }
}

impl Signature {
    /// The null signature, carried by unsigned input slots.
    pub const NULL: Signature = Signature([0u8; SIGNATURE_LEN]);

    /// Whether this is the null signature.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// Signs a 32-byte digest with the given key.
pub fn sign_digest(digest: &TxHash, key: &SecretKey) -> Signature {
    let msg = Message::from_digest(*digest.as_bytes());
    let (recid, compact) = SECP256K1
        .sign_ecdsa_recoverable(&msg, key)
        .serialize_compact();

    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[..SIGNATURE_LEN - 1].copy_from_slice(&compact);
    bytes[SIGNATURE_LEN - 1] = recid.to_i32() as u8;

    Signature(bytes)
}

/// Recovers the address that produced `signature` over `digest`.
///
/// The null signature recovers to [`Address::NULL`]. Returns [`None`] if the signature is not
/// null and cannot be recovered.
pub fn recover_signer(digest: &TxHash, signature: &Signature) -> Option<Address> {
    if signature.is_null() {
        return Some(Address::NULL);
    }

    let recid = RecoveryId::from_i32(signature.0[SIGNATURE_LEN - 1] as i32).ok()?;
    let sig = RecoverableSignature::from_compact(&signature.0[..SIGNATURE_LEN - 1], recid).ok()?;
    let msg = Message::from_digest(*digest.as_bytes());

    SECP256K1
        .recover_ecdsa(&msg, &sig)
        .ok()
        .map(|pubkey| Address::from_public_key(&pubkey))
}
