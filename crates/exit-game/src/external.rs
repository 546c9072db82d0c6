//! Capabilities the exit game consumes from its environment.
//!
//! The exit game never moves funds or reads the chain directly. It asks a [`Clock`] for the time,
//! a [`ChildChain`] for block timestamps and inclusion checks and a [`Vault`] to move funds.

use plasma_primitives::{
    types::{Address, Amount, BlockNumber, Timestamp, TxHash},
    utxo::TxPos,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source of the current time.
pub trait Clock {
    /// The current unix timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// A single transfer out of custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// The token to transfer.
    pub token: Address,

    /// The recipient.
    pub to: Address,

    /// The amount to transfer.
    pub amount: Amount,
}

impl Payout {
    /// Creates a new payout.
    pub const fn new(token: Address, to: Address, amount: Amount) -> Self {
        Self { token, to, amount }
    }

    /// A payout of the native token, used for bonds.
    pub const fn native(to: Address, amount: Amount) -> Self {
        Self::new(Address::NATIVE_TOKEN, to, amount)
    }
}

/// Errors raised by a [`Vault`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source does not hold enough funds.
    #[error("{account} holds {available} of {token}, needs {needed}")]
    InsufficientFunds {
        /// The token being transferred.
        token: Address,
        /// The account (or custody) being debited.
        account: Address,
        /// The amount required.
        needed: Amount,
        /// The amount available.
        available: Amount,
    },

    /// Crediting the transfer would overflow the balance of the destination.
    #[error("crediting {amount} of {token} to {account} overflows its balance")]
    Overflow {
        /// The token being transferred.
        token: Address,
        /// The account (or custody) being credited.
        account: Address,
        /// The amount being credited.
        amount: Amount,
    },

    /// The transfer was refused for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Custody of the funds locked in the exit game.
pub trait Vault {
    /// Moves `amount` of `token` from `from` into custody, e.g. to post a bond.
    fn collect(&mut self, token: Address, from: Address, amount: Amount) -> Result<(), TransferError>;

    /// Pays out every payout from custody, or none of them if any of them fails.
    fn settle(&mut self, payouts: &[Payout]) -> Result<(), TransferError>;
}

/// Read access to the child chain.
pub trait ChildChain {
    /// The timestamp of the given block, if it exists.
    fn block_timestamp(&self, blknum: BlockNumber) -> Option<Timestamp>;

    /// Whether `proof` proves that the transaction with `tx_hash` is included at `position`.
    fn verify_inclusion(&self, tx_hash: &TxHash, position: TxPos, proof: &[u8]) -> bool;
}
