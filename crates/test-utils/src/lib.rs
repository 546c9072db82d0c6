//! This crate provides test-utilities shared by the crates in this workspace: keys, transaction
//! builders and generators of arbitrary values.

pub mod arbitrary_generator;
pub mod keys;
pub mod prelude;
pub mod tx;
