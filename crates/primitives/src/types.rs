//! Scalar aliases and fixed-size byte identifiers.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::PublicKey;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::{Digest, Sha256};

use crate::{
    constants::{ADDRESS_LEN, HASH_LEN},
    errors::EncodingError,
};

/// An amount of some token, in its smallest denomination.
pub type Amount = u64;

/// A unix timestamp in seconds.
pub type Timestamp = u64;

/// The number of a child-chain block.
pub type BlockNumber = u64;

/// Decodes a `0x`-prefixed (or bare) hex string into a fixed-size byte array.
pub(crate) fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], EncodingError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| EncodingError::InvalidHex(e.to_string()))?;

    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| EncodingError::InvalidLength {
        expected: N,
        got: bytes.len(),
    })
}

/// Implements `Display`, `Debug` and `FromStr` as `0x`-prefixed hex for a byte-array newtype.
macro_rules! impl_hex_newtype {
    ($name:ident, $len:expr) => {
        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "0x{}", ::hex::encode(self.0))
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::errors::EncodingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::types::decode_hex_array::<$len>(s).map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

pub(crate) use impl_hex_newtype;

/// A 20-byte account address.
///
/// The null address doubles as the identifier of the native token.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Address([u8; ADDRESS_LEN]);

impl_hex_newtype!(Address, ADDRESS_LEN);

impl Address {
    /// The null address.
    pub const NULL: Address = Address([0u8; ADDRESS_LEN]);

    /// The token identifier of the chain's native currency.
    pub const NATIVE_TOKEN: Address = Address::NULL;

    /// Creates an address from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derives the address controlled by the given public key.
    ///
    /// This is the last 20 bytes of the SHA-256 digest of the uncompressed public key without its
    /// `0x04` prefix.
    pub fn from_public_key(pubkey: &PublicKey) -> Self {
        let digest = Sha256::digest(&pubkey.serialize_uncompressed()[1..]);

        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[HASH_LEN - ADDRESS_LEN..]);

        Self(bytes)
    }

    /// Returns `true` if this is the null address.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

/// The 32-byte identity of a transaction.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct TxHash([u8; HASH_LEN]);

impl_hex_newtype!(TxHash, HASH_LEN);

impl TxHash {
    /// Computes the SHA-256 digest of the given bytes.
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(bytes.as_ref()).into())
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}
