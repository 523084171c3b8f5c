//! Lobby management.
//!
//! The pieces stack simply: a [`Registry`] stores every open lobby and
//! maps client identities to their seats, the [`Engine`] executes
//! commands against it one at a time, and the [`EngineActor`] wraps
//! the engine in an async task fed through an [`EngineHandle`].

pub mod actor;
pub mod config;
pub mod engine;
pub mod messages;
pub mod registry;

pub use actor::{EngineActor, EngineHandle};
pub use config::EngineConfig;
pub use engine::Engine;
pub use messages::{EngineMessage, LobbyListing};
pub use registry::Registry;
