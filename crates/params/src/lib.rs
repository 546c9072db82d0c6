//! This crate contains the consensus-critical parameters that dictate the behavior of the exit game
//! in a way that ensures that every participant agrees on when exits mature and what they cost.

pub mod default;
pub mod errors;
pub mod exit_game;

pub mod prelude {
    //! Re-exports of the types needed to configure an exit game.

    pub use crate::{
        errors::ParamsError,
        exit_game::{ChallengeBondPolicy, ExitGameParams},
    };
}
