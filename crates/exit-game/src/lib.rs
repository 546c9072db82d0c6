//! The exit game of a Plasma child chain.
//!
//! Holders of child-chain outputs withdraw them to the root chain through *exits*. A standard exit
//! withdraws a single included output. An in-flight exit withdraws the inputs or outputs of a
//! transaction that may never have been included, depending on whether the transaction turns out
//! to be canonical. Every exit waits in the priority queue of its token for a challenge period and
//! is paid out by [`ExitGame::process_exits`](game::ExitGame::process_exits) once it matured.
//!
//! The [`ExitGame`](game::ExitGame) is a single-writer state machine. [`ExitGameActor`] runs it in
//! its own task for concurrent callers.
//!
//! [`ExitGameActor`]: actor::ExitGameActor

pub mod actor;
pub mod commands;
pub mod errors;
pub mod events;
pub mod external;
pub mod game;
pub mod inmemory;
pub mod piggyback;
pub mod queue;
pub mod requests;
pub mod store;
mod transitions;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;
