//! Errors for identifiers and transactions.

use thiserror::Error;

/// Errors while packing, unpacking or parsing identifiers and encoded values.
///
/// These are always fatal to the operation that produced them and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The block number does not fit in its bit budget.
    #[error("block number {0} exceeds the block number bit budget")]
    BlockNumberOverflow(u64),

    /// The transaction index does not fit in its bit budget.
    #[error("transaction index {0} exceeds the transaction index bit budget")]
    TxIndexOverflow(u64),

    /// The output index does not fit in its bit budget.
    #[error("output index {0} exceeds the output index bit budget")]
    OutputIndexOverflow(u64),

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A byte string has the wrong length.
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength {
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        got: usize,
    },

    /// Bytes could not be decoded into the expected structure.
    #[error("malformed encoding: {0}")]
    Malformed(String),
}

/// Errors while building, signing or decoding a [`Transaction`](crate::tx::Transaction).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// More inputs than a transaction can hold.
    #[error("a transaction holds at most 4 inputs, got {0}")]
    TooManyInputs(usize),

    /// More outputs than a transaction can hold.
    #[error("a transaction holds at most 4 outputs, got {0}")]
    TooManyOutputs(usize),

    /// The referenced input/output slot does not exist.
    #[error("slot {0} is out of range")]
    SlotOutOfRange(usize),

    /// The signature in the given slot could not be recovered to a public key.
    #[error("signature in slot {slot} is invalid")]
    InvalidSignature {
        /// The input slot holding the invalid signature.
        slot: usize,
    },

    /// The transaction bytes are malformed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
