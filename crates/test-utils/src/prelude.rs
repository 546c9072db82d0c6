//! Re-exports of the most commonly used test utilities.

pub use crate::{
    arbitrary_generator::{arb_address, arb_amount, arb_utxo_pos, ArbitraryGenerator},
    keys::{generate_keypair, keypair_from_seed, TestAccount},
    tx::{deposit_tx, spend_tx},
};
