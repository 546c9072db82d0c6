//! The exit game state machine.

use std::sync::Arc;

use plasma_params::prelude::ExitGameParams;
use plasma_primitives::{
    types::{Address, TxHash},
    utxo::UtxoPos,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::{ExitGameError, ExitGameResult},
    events::ExitEvent,
    external::{ChildChain, Clock, Vault},
    queue::{ExitQueues, QueueEntry},
    store::{ExitStore, InFlightExit, StandardExit},
};

/// Everything the exit game owns: the queues and the records they point into.
///
/// This is the persisted state layout; it round-trips through serde.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitGameState {
    /// One queue per registered token.
    pub queues: ExitQueues,

    /// Every exit record.
    pub exits: ExitStore,
}

/// The exit game.
///
/// A single-writer state machine: every operation takes `&mut self` and either applies completely
/// or fails without effect. Operations validate first, then move funds through the [`Vault`], then
/// mutate the state, so a refused transfer leaves the state untouched.
#[derive(Debug)]
pub struct ExitGame<C, V, L> {
    pub(crate) params: Arc<ExitGameParams>,
    pub(crate) clock: C,
    pub(crate) vault: V,
    pub(crate) child_chain: L,
    pub(crate) state: ExitGameState,
    pub(crate) events: Vec<ExitEvent>,
}

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Creates an exit game with only the native token registered.
    pub fn new(params: ExitGameParams, clock: C, vault: V, child_chain: L) -> Self {
        Self::restore(params, clock, vault, child_chain, ExitGameState::default())
    }

    /// Creates an exit game from a previously taken [`snapshot`](Self::snapshot).
    pub fn restore(
        params: ExitGameParams,
        clock: C,
        vault: V,
        child_chain: L,
        state: ExitGameState,
    ) -> Self {
        Self {
            params: Arc::new(params),
            clock,
            vault,
            child_chain,
            state,
            events: Vec::new(),
        }
    }

    /// The parameters of this game.
    pub fn params(&self) -> &ExitGameParams {
        &self.params
    }

    /// The current state.
    pub fn state(&self) -> &ExitGameState {
        &self.state
    }

    /// A copy of the current state that can be persisted and [`restored`](Self::restore).
    pub fn snapshot(&self) -> ExitGameState {
        self.state.clone()
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The vault.
    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// The child chain.
    pub fn child_chain(&self) -> &L {
        &self.child_chain
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<ExitEvent> {
        std::mem::take(&mut self.events)
    }

    /// Registers a token so that its outputs can exit.
    pub fn add_token(&mut self, token: Address) -> ExitGameResult<()> {
        self.state.queues.register(token)?;

        info!(%token, "registered token");

        Ok(())
    }

    /// Whether the token is registered.
    pub fn has_token(&self, token: &Address) -> bool {
        self.state.queues.has_token(token)
    }

    /// The standard exit of the output at `pos`, in any status.
    pub fn standard_exit(&self, pos: &UtxoPos) -> Option<&StandardExit> {
        self.state.exits.standard_exit(pos)
    }

    /// The in-flight exit of the transaction, in any status.
    pub fn in_flight_exit(&self, tx_hash: &TxHash) -> Option<&InFlightExit> {
        self.state.exits.in_flight_exit(tx_hash)
    }

    /// The entry of the token that settles next.
    pub fn next_exit(&self, token: &Address) -> ExitGameResult<QueueEntry> {
        self.state
            .queues
            .peek_min(token)?
            .copied()
            .ok_or(ExitGameError::EmptyQueue(*token))
    }

    pub(crate) fn emit(&mut self, event: ExitEvent) {
        self.events.push(event);
    }

    pub(crate) fn ensure_registered(&self, token: &Address) -> ExitGameResult<()> {
        if self.has_token(token) {
            Ok(())
        } else {
            Err(ExitGameError::UnregisteredToken(*token))
        }
    }
}
