//! Game state and rules.
//!
//! The heart of the crate is [`Lobby`], a synchronous state machine
//! covering one room's whole lifecycle: members join and leave, the
//! host starts a game, two describe-rounds run under a turn pointer,
//! votes come in, and a reveal closes the loop back to the lobby.
//! Operations either mutate state and record [`GameEvent`]s, or refuse
//! with a [`GameError`] and change nothing.
//!
//! Nothing in this module does IO. Time arrives as [`std::time::Instant`]
//! arguments and randomness as [`rand::Rng`] arguments, which keeps
//! every rule deterministic under test.

pub mod constants;
pub mod entities;
pub mod state_machine;
pub mod views;
pub mod words;

pub use state_machine::{GameError, GameEvent, GameSettings, JoinOutcome, Lobby};
