//! Module to generate arbitrary values for testing.

use arbitrary::{Arbitrary, Unstructured};
use plasma_primitives::{
    types::{Address, Amount},
    utxo::UtxoPos,
};
use proptest::prelude::*;
use rand::{rngs::OsRng, RngCore};

/// The default buffer size for the `ArbitraryGenerator`.
const ARB_GEN_LEN: usize = 1024;

/// A generator for producing arbitrary data based on a persistent buffer.
#[derive(Debug)]
pub struct ArbitraryGenerator {
    /// Persistent buffer
    buf: Vec<u8>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    /// Creates a new `ArbitraryGenerator` with a default buffer size.
    pub fn new() -> Self {
        Self::new_with_size(ARB_GEN_LEN)
    }

    /// Creates a new `ArbitraryGenerator` with a buffer of `s` bytes.
    pub fn new_with_size(s: usize) -> Self {
        Self { buf: vec![0u8; s] }
    }

    /// Generates an arbitrary instance of type `T` using the default RNG, [`OsRng`].
    pub fn generate<'a, T>(&'a mut self) -> T
    where
        T: Arbitrary<'a> + Clone,
    {
        self.generate_with_rng::<T, OsRng>(&mut OsRng)
    }

    /// Generates an arbitrary instance of type `T` from the bytes of the given RNG.
    pub fn generate_with_rng<'a, T, R>(&'a mut self, rng: &mut R) -> T
    where
        T: Arbitrary<'a> + Clone,
        R: RngCore,
    {
        rng.fill_bytes(&mut self.buf);
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("Failed to generate arbitrary instance")
    }
}

/// Generates an arbitrary [`Address`].
pub fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::new)
}

/// Generates an arbitrary non-null [`UtxoPos`] in a non-deposit block.
pub fn arb_utxo_pos() -> impl Strategy<Value = UtxoPos> {
    (1u64..1_000_000, 0u64..1_000, 0u64..4)
        .prop_map(|(blk, idx, oidx)| UtxoPos::new(blk, idx, oidx).unwrap())
}

/// Generates an [`Amount`] that can be summed a few times without overflowing.
pub fn arb_amount() -> impl Strategy<Value = Amount> {
    1..=(u32::MAX as Amount)
}
