//! UTXO and transaction positions on the child chain.

use std::fmt;

use arbitrary::{Arbitrary, Unstructured};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{BLOCK_NUMBER_BITS, NUM_TXOS, OUTPUT_INDEX_BITS, TX_INDEX_BITS},
    errors::EncodingError,
    types::BlockNumber,
};

const MAX_BLOCK_NUMBER: u64 = (1 << BLOCK_NUMBER_BITS) - 1;
const MAX_TX_INDEX: u64 = (1 << TX_INDEX_BITS) - 1;
const MAX_OUTPUT_INDEX: u64 = (1 << OUTPUT_INDEX_BITS) - 1;

/// The position of an output on the child chain: `(blknum, txindex, oindex)`.
///
/// Positions order lexicographically by block, then transaction, then output. This is the same
/// order as the packed integer representation returned by [`UtxoPos::encode`], so older outputs
/// always compare lower and therefore exit first.
///
/// The components are private so that every constructed value is within its bit budget.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "u64", into = "u64")]
pub struct UtxoPos {
    blknum: BlockNumber,
    txindex: u16,
    oindex: u8,
}

impl UtxoPos {
    /// The null position, used to mark unused input slots.
    pub const NULL: UtxoPos = UtxoPos {
        blknum: 0,
        txindex: 0,
        oindex: 0,
    };

    /// Creates a new position, checking every component against its bit budget.
    pub fn new(blknum: u64, txindex: u64, oindex: u64) -> Result<Self, EncodingError> {
        if blknum > MAX_BLOCK_NUMBER {
            return Err(EncodingError::BlockNumberOverflow(blknum));
        }

        if txindex > MAX_TX_INDEX {
            return Err(EncodingError::TxIndexOverflow(txindex));
        }

        if oindex > MAX_OUTPUT_INDEX {
            return Err(EncodingError::OutputIndexOverflow(oindex));
        }

        Ok(Self {
            blknum,
            txindex: txindex as u16,
            oindex: oindex as u8,
        })
    }

    /// Packs the position into a single integer.
    ///
    /// The block number takes the high bits, the transaction index the middle bits and the output
    /// index the low bits.
    pub const fn encode(&self) -> u64 {
        (self.blknum << (TX_INDEX_BITS + OUTPUT_INDEX_BITS))
            | ((self.txindex as u64) << OUTPUT_INDEX_BITS)
            | self.oindex as u64
    }

    /// Unpacks a position from its integer representation.
    ///
    /// The bit budgets add up to exactly 64 bits, so every integer is a valid position.
    pub const fn decode(packed: u64) -> Self {
        Self {
            blknum: packed >> (TX_INDEX_BITS + OUTPUT_INDEX_BITS),
            txindex: ((packed >> OUTPUT_INDEX_BITS) & MAX_TX_INDEX) as u16,
            oindex: (packed & MAX_OUTPUT_INDEX) as u8,
        }
    }

    /// The block the output was created in.
    pub const fn blknum(&self) -> BlockNumber {
        self.blknum
    }

    /// The index of the creating transaction within its block.
    pub const fn txindex(&self) -> u16 {
        self.txindex
    }

    /// The index of the output within its transaction.
    pub const fn oindex(&self) -> usize {
        self.oindex as usize
    }

    /// The position of the transaction that created this output.
    pub const fn tx_pos(&self) -> TxPos {
        TxPos {
            blknum: self.blknum,
            txindex: self.txindex,
        }
    }

    /// Whether this is the null position.
    pub const fn is_null(&self) -> bool {
        self.encode() == 0
    }
}

impl From<u64> for UtxoPos {
    fn from(packed: u64) -> Self {
        Self::decode(packed)
    }
}

impl From<UtxoPos> for u64 {
    fn from(pos: UtxoPos) -> Self {
        pos.encode()
    }
}

impl fmt::Display for UtxoPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.blknum, self.txindex, self.oindex)
    }
}

impl BorshSerialize for UtxoPos {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.encode(), writer)
    }
}

impl BorshDeserialize for UtxoPos {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        u64::deserialize_reader(reader).map(Self::decode)
    }
}

impl<'a> Arbitrary<'a> for UtxoPos {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::decode(u64::arbitrary(u)?))
    }
}

/// The inclusion position of a transaction: `(blknum, txindex)`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
    Arbitrary,
)]
pub struct TxPos {
    blknum: BlockNumber,
    txindex: u16,
}

impl TxPos {
    /// Creates a new transaction position.
    pub fn new(blknum: u64, txindex: u64) -> Result<Self, EncodingError> {
        UtxoPos::new(blknum, txindex, 0).map(|pos| pos.tx_pos())
    }

    /// The block the transaction is included in.
    pub const fn blknum(&self) -> BlockNumber {
        self.blknum
    }

    /// The index of the transaction within its block.
    pub const fn txindex(&self) -> u16 {
        self.txindex
    }

    /// The position of the `oindex`-th output of this transaction.
    pub fn output(&self, oindex: usize) -> Result<UtxoPos, EncodingError> {
        if oindex >= NUM_TXOS {
            return Err(EncodingError::OutputIndexOverflow(oindex as u64));
        }

        UtxoPos::new(self.blknum, self.txindex as u64, oindex as u64)
    }
}

impl fmt::Display for TxPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.blknum, self.txindex)
    }
}
