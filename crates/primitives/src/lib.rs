//! This crate contains the value types shared by every other crate in the workspace: addresses,
//! hashes, UTXO identifiers and the fixed-shape Plasma transaction.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod constants;
pub mod errors;
pub mod secp;
pub mod tx;
pub mod types;
pub mod utxo;

#[cfg(test)]
mod test_utils;
