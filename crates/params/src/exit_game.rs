//! Parameters of the exit game such as the minimum exit period and the bond sizes.

use plasma_primitives::types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{
    default::{IN_FLIGHT_EXIT_BOND, MIN_EXIT_PERIOD, PIGGYBACK_BOND, STANDARD_EXIT_BOND},
    errors::ParamsError,
};

/// What happens to the bond of a standard exit that is successfully challenged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeBondPolicy {
    /// The bond is paid to the challenger.
    #[default]
    Challenger,

    /// The bond stays in custody.
    Retained,
}

/// The exit game parameters that every participant must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitGameParams {
    /// The minimum exit period in seconds.
    pub min_exit_period: u64,

    /// The bond required to start a standard exit, in the native token.
    pub standard_exit_bond: Amount,

    /// The bond required to start an in-flight exit, in the native token.
    pub in_flight_exit_bond: Amount,

    /// The bond required to piggyback one input or output, in the native token.
    pub piggyback_bond: Amount,

    /// The disposition of the bond of a challenged standard exit.
    #[serde(default)]
    pub challenge_bond_policy: ChallengeBondPolicy,
}

impl Default for ExitGameParams {
    fn default() -> Self {
        Self {
            min_exit_period: MIN_EXIT_PERIOD,
            standard_exit_bond: STANDARD_EXIT_BOND,
            in_flight_exit_bond: IN_FLIGHT_EXIT_BOND,
            piggyback_bond: PIGGYBACK_BOND,
            challenge_bond_policy: ChallengeBondPolicy::default(),
        }
    }
}

impl ExitGameParams {
    /// Checks that the parameters describe a playable exit game.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.min_exit_period < 2 {
            return Err(ParamsError::ExitPeriodTooShort(self.min_exit_period));
        }

        let bonds = [
            ("standard exit", self.standard_exit_bond),
            ("in-flight exit", self.in_flight_exit_bond),
            ("piggyback", self.piggyback_bond),
        ];

        if let Some((name, _)) = bonds.into_iter().find(|(_, bond)| *bond == 0) {
            return Err(ParamsError::ZeroBond(name));
        }

        Ok(())
    }

    /// The timestamp at which an exit of an output created at `created_at` and started at
    /// `started_at` matures.
    ///
    /// Fresh outputs wait two exit periods from their creation so that their exits cannot jump
    /// ahead of older exits; outputs older than one period wait one period from the exit start.
    pub fn exitable_at(&self, created_at: Timestamp, started_at: Timestamp) -> Timestamp {
        let from_creation = created_at.saturating_add(self.min_exit_period.saturating_mul(2));
        let from_start = started_at.saturating_add(self.min_exit_period);

        from_creation.max(from_start)
    }

    /// The timestamp until which an in-flight exit started at `started_at` can be piggybacked and
    /// challenged as non-canonical: the first half of the minimum exit period.
    pub fn piggyback_deadline(&self, started_at: Timestamp) -> Timestamp {
        started_at.saturating_add(self.min_exit_period / 2)
    }
}
