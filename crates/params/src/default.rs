//! Default values for the exit game parameters.

use plasma_primitives::types::Amount;

/// Default minimum exit period in seconds: one week.
///
/// A fresh output matures two periods after it was created, any older output one period after its
/// exit started.
pub const MIN_EXIT_PERIOD: u64 = 7 * 24 * 60 * 60;

/// Default bond posted to start a standard exit.
pub const STANDARD_EXIT_BOND: Amount = 31_415_926_535;

/// Default bond posted to start an in-flight exit.
pub const IN_FLIGHT_EXIT_BOND: Amount = 31_415_926_535;

/// Default bond posted to piggyback a single input or output of an in-flight exit.
pub const PIGGYBACK_BOND: Amount = 31_415_926_535;
