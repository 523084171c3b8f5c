//! # wordspy
//!
//! A lobby and game-state engine for a social-deduction word game.
//! Everyone but one player gets a secret word; the odd one out gets
//! only a vague hint. After two rounds of one-word descriptions the
//! table votes on who the impostor is, and the reveal settles it.
//!
//! The crate is the server's brain, not its sockets: bring your own
//! transport, register each connection as an [`Outbox`], and feed
//! decoded client messages to the engine.
//!
//! ## Architecture
//!
//! - One [`EngineActor`] task owns every lobby. Commands execute one
//!   at a time to completion, so lobby state needs no locks.
//! - Each lobby is a synchronous state machine ([`Lobby`]) driven by
//!   explicit time and randomness arguments, which keeps every rule
//!   deterministic under test.
//! - Clients only ever see per-viewer projections ([`game::views`]).
//!   That seam is what keeps the impostor's identity and the secret
//!   word out of the wrong hands.
//!
//! ## Core Modules
//!
//! - [`game`]: rules, phases, roles, and per-viewer views
//! - [`lobby`]: the registry, the engine, and its actor shell
//! - [`net`]: wire messages and connection outboxes
//!
//! ## Example
//!
//! ```ignore
//! use wordspy::{ClientMessage, EngineActor, EngineConfig, Outbox, PlayerId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, handle) = EngineActor::new(EngineConfig::default());
//!     tokio::spawn(actor.run());
//!
//!     // Per connection: mint an outbox, join, then play.
//!     let (outbox, mut inbox) = Outbox::channel(64);
//!     let player = PlayerId::random();
//!     handle.join(player, "ada".into(), None, outbox).await.unwrap();
//!     handle.deliver(player, ClientMessage::StartGame).await.unwrap();
//!     while let Some(message) = inbox.recv().await {
//!         println!("{message}");
//!     }
//! }
//! ```

pub mod game;
pub mod lobby;
pub mod net;

pub use game::{
    GameError, GameEvent, GameSettings, JoinOutcome, Lobby,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
    entities::{
        GameOutcome, LobbyCode, Phase, Player, PlayerId, PlayerName, Role, Submission, VoteRecord,
        WordPair,
    },
    views::{self, BallotEntry, LobbyView, PlayerView},
    words::WordPool,
};
pub use lobby::{
    Engine, EngineActor, EngineConfig, EngineHandle, EngineMessage, LobbyListing, Registry,
};
pub use net::{ClientMessage, Delivery, OUTBOX_CAPACITY, Outbox, ServerMessage};
