use plasma_primitives::types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// The configuration values of the simulated environment.
///
/// None of these affect the rules of the exit game, only the world it is replayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The time at which the simulation starts.
    pub start_timestamp: Timestamp,

    /// The seconds the clock moves forward after every submitted block.
    pub block_interval: u64,

    /// The native balance every account starts with, used to post bonds.
    pub initial_account_balance: Amount,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_timestamp: 1_700_000_000,
            block_interval: 15,
            initial_account_balance: 1_000_000_000_000,
        }
    }
}
