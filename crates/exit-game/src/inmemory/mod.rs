//! In-memory implementations of the collaborators in [`external`](crate::external).
//!
//! Each implementation is a cheap-to-clone handle to shared state, so a test or the simulator can
//! keep a handle to observe and drive the collaborator while the exit game owns another.

pub mod child_chain;
pub mod clock;
pub mod vault;

pub use child_chain::InMemoryChildChain;
pub use clock::ManualClock;
pub use vault::InMemoryVault;
