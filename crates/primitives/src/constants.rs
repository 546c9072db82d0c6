//! Constants that fix the shape of transactions and identifiers.
//!
//! These values are part of the wire format i.e., changing any of them changes every transaction
//! hash and every packed UTXO position.

/// The number of input slots and the number of output slots in every transaction.
pub const NUM_TXOS: usize = 4;

/// The number of bits of a packed UTXO position taken by the block number.
pub const BLOCK_NUMBER_BITS: u32 = 46;

/// The number of bits of a packed UTXO position taken by the transaction index.
///
/// This bounds the number of transactions in a single block.
pub const TX_INDEX_BITS: u32 = 16;

/// The number of bits of a packed UTXO position taken by the output index.
///
/// Two bits address exactly [`NUM_TXOS`] outputs.
pub const OUTPUT_INDEX_BITS: u32 = 2;

// The three components must fill a `u64` exactly.
const _: () = assert!(BLOCK_NUMBER_BITS + TX_INDEX_BITS + OUTPUT_INDEX_BITS == u64::BITS);
const _: () = assert!((1usize << OUTPUT_INDEX_BITS) == NUM_TXOS);

/// The length of an [`Address`](crate::types::Address) in bytes.
pub const ADDRESS_LEN: usize = 20;

/// The length of a [`TxHash`](crate::types::TxHash) in bytes.
pub const HASH_LEN: usize = 32;

/// The length of a recoverable [`Signature`](crate::secp::Signature) in bytes (64 bytes of compact
/// signature followed by the recovery id).
pub const SIGNATURE_LEN: usize = 65;

/// Domain separation tag prepended to the transaction hash before signing.
pub const SIGNING_DOMAIN_TAG: &[u8] = b"plasma-exits/tx-signature/v1";
