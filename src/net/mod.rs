//! Transport-facing surface.
//!
//! The engine is transport-agnostic: a server binds whatever it likes
//! (WebSockets, TCP, an in-process harness) and hands each connection
//! to the engine as an [`Outbox`]. Messages cross that seam as the
//! tagged-JSON types in [`messages`].

pub mod messages;
pub mod outbox;

pub use messages::{ClientMessage, ServerMessage};
pub use outbox::{Delivery, OUTBOX_CAPACITY, Outbox};
