//! Errors for the exit game parameters.

use thiserror::Error;

/// Error while validating [`ExitGameParams`](crate::exit_game::ExitGameParams).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// The minimum exit period must leave room for a piggyback window.
    #[error("minimum exit period must be at least 2 seconds, got {0}")]
    ExitPeriodTooShort(u64),

    /// A bond is configured as zero.
    #[error("{0} bond must be non-zero")]
    ZeroBond(&'static str),
}
