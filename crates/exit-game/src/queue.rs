//! Per-token priority queues of pending exits.
//!
//! Each registered token has its own [`ExitQueue`]. Entries order by maturity first and by the
//! position of the exited output second, so that among mature exits the oldest claim is paid
//! first. Entries only reference exits by [`ExitId`]; the record they point at may have been
//! cleared in the meantime, which the processing engine detects when it reaches the entry.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use plasma_primitives::{
    types::{Address, Timestamp, TxHash},
    utxo::UtxoPos,
};
use serde::{Deserialize, Serialize};

use crate::errors::{ExitGameError, ExitGameResult};

/// Identifies an exit in the record store.
///
/// On otherwise equal queue entries standard exits order before in-flight exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitId {
    /// A standard exit of the output at this position.
    Standard(UtxoPos),

    /// An in-flight exit of the transaction with this hash.
    InFlight(TxHash),
}

impl fmt::Display for ExitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitId::Standard(pos) => write!(f, "standard exit {pos}"),
            ExitId::InFlight(hash) => write!(f, "in-flight exit {hash}"),
        }
    }
}

/// An entry in an exit queue.
///
/// The derived order compares the fields in declaration order, which is the settlement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The time at which the exit matures.
    pub exitable_at: Timestamp,

    /// The position whose age decides the priority among exits maturing at the same time.
    pub priority: UtxoPos,

    /// The exit this entry refers to.
    pub exit_id: ExitId,
}

/// The pending exits of a single token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitQueue {
    entries: BTreeSet<QueueEntry>,
}

impl ExitQueue {
    /// Adds an entry. Returns `false` if the exact entry was already queued.
    pub fn insert(&mut self, entry: QueueEntry) -> bool {
        self.entries.insert(entry)
    }

    /// The entry that settles next.
    pub fn peek_min(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    /// Removes and returns the entry that settles next.
    pub fn pop_min(&mut self) -> Option<QueueEntry> {
        self.entries.pop_first()
    }

    /// The number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in settlement order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}

/// The exit queues of every registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitQueues {
    queues: BTreeMap<Address, ExitQueue>,
}

impl Default for ExitQueues {
    /// The native token is always registered.
    fn default() -> Self {
        let mut queues = BTreeMap::new();
        queues.insert(Address::NATIVE_TOKEN, ExitQueue::default());

        Self { queues }
    }
}

impl ExitQueues {
    /// Registers a new token with an empty queue.
    pub fn register(&mut self, token: Address) -> ExitGameResult<()> {
        if self.has_token(&token) {
            return Err(ExitGameError::TokenAlreadyRegistered(token));
        }

        self.queues.insert(token, ExitQueue::default());

        Ok(())
    }

    /// Whether the token has a queue.
    pub fn has_token(&self, token: &Address) -> bool {
        self.queues.contains_key(token)
    }

    /// The queue of the token.
    pub fn queue(&self, token: &Address) -> ExitGameResult<&ExitQueue> {
        self.queues
            .get(token)
            .ok_or(ExitGameError::UnregisteredToken(*token))
    }

    fn queue_mut(&mut self, token: &Address) -> ExitGameResult<&mut ExitQueue> {
        self.queues
            .get_mut(token)
            .ok_or(ExitGameError::UnregisteredToken(*token))
    }

    /// Adds an entry to the queue of the token.
    pub fn insert(&mut self, token: Address, entry: QueueEntry) -> ExitGameResult<()> {
        self.queue_mut(&token)?.insert(entry);

        Ok(())
    }

    /// The entry of the token that settles next, if any.
    pub fn peek_min(&self, token: &Address) -> ExitGameResult<Option<&QueueEntry>> {
        self.queue(token).map(ExitQueue::peek_min)
    }

    /// Removes and returns the entry of the token that settles next.
    pub fn pop_min(&mut self, token: &Address) -> ExitGameResult<QueueEntry> {
        self.queue_mut(token)?
            .pop_min()
            .ok_or(ExitGameError::EmptyQueue(*token))
    }

    /// The number of entries queued for the token.
    pub fn len(&self, token: &Address) -> ExitGameResult<usize> {
        self.queue(token).map(ExitQueue::len)
    }

    /// The registered tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &Address> {
        self.queues.keys()
    }
}

#[cfg(test)]
mod tests {
    use plasma_test_utils::prelude::*;
    use proptest::prelude::*;

    use super::*;

    fn standard_entry(exitable_at: Timestamp, blk: u64) -> QueueEntry {
        let pos = UtxoPos::new(blk, 0, 0).unwrap();

        QueueEntry {
            exitable_at,
            priority: pos,
            exit_id: ExitId::Standard(pos),
        }
    }

    #[test]
    fn test_native_token_is_registered() {
        let mut queues = ExitQueues::default();

        assert!(queues.has_token(&Address::NATIVE_TOKEN));
        assert_eq!(
            queues.register(Address::NATIVE_TOKEN),
            Err(ExitGameError::TokenAlreadyRegistered(Address::NATIVE_TOKEN))
        );
    }

    #[test]
    fn test_unregistered_token() {
        let mut queues = ExitQueues::default();
        let token = Address::new([1; 20]);

        assert_eq!(
            queues.pop_min(&token),
            Err(ExitGameError::UnregisteredToken(token))
        );
        assert_eq!(
            queues.insert(token, standard_entry(0, 1)),
            Err(ExitGameError::UnregisteredToken(token))
        );

        queues.register(token).unwrap();
        assert_eq!(queues.len(&token), Ok(0));
        assert_eq!(queues.pop_min(&token), Err(ExitGameError::EmptyQueue(token)));
    }

    #[test]
    fn test_maturity_orders_before_priority() {
        let mut queues = ExitQueues::default();
        let token = Address::NATIVE_TOKEN;

        let young_but_early = standard_entry(100, 50);
        let old_but_late = standard_entry(200, 1);
        let old_and_early = standard_entry(100, 2);

        for entry in [young_but_early, old_but_late, old_and_early] {
            queues.insert(token, entry).unwrap();
        }

        assert_eq!(queues.peek_min(&token).unwrap(), Some(&old_and_early));
        assert_eq!(queues.pop_min(&token).unwrap(), old_and_early);
        assert_eq!(queues.pop_min(&token).unwrap(), young_but_early);
        assert_eq!(queues.pop_min(&token).unwrap(), old_but_late);
        assert!(queues.peek_min(&token).unwrap().is_none());
    }

    #[test]
    fn test_standard_before_in_flight_on_ties() {
        let pos = UtxoPos::new(3, 0, 0).unwrap();
        let standard = QueueEntry {
            exitable_at: 10,
            priority: pos,
            exit_id: ExitId::Standard(pos),
        };
        let in_flight = QueueEntry {
            exit_id: ExitId::InFlight(ArbitraryGenerator::new().generate()),
            ..standard
        };

        let mut queue = ExitQueue::default();
        queue.insert(in_flight);
        queue.insert(standard);

        assert_eq!(queue.pop_min(), Some(standard));
        assert_eq!(queue.pop_min(), Some(in_flight));
    }

    proptest! {
        #[test]
        fn pops_in_non_decreasing_order(
            entries in prop::collection::vec((0u64..1_000, arb_utxo_pos()), 1..50)
        ) {
            let mut queue = ExitQueue::default();
            for (exitable_at, pos) in &entries {
                queue.insert(QueueEntry {
                    exitable_at: *exitable_at,
                    priority: *pos,
                    exit_id: ExitId::Standard(*pos),
                });
            }

            let mut previous: Option<QueueEntry> = None;
            while let Some(entry) = queue.pop_min() {
                if let Some(previous) = previous {
                    prop_assert!(
                        (previous.exitable_at, previous.priority)
                            <= (entry.exitable_at, entry.priority)
                    );
                }
                previous = Some(entry);
            }
        }
    }
}
