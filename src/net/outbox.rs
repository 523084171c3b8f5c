//! Delivery handles for connected clients.

use tokio::sync::mpsc::{self, error::TrySendError};

use super::messages::ServerMessage;

/// Buffered messages per connection before sends start dropping.
pub const OUTBOX_CAPACITY: usize = 64;

/// Sending side of one client's connection. The engine never learns
/// what transport sits behind it.
#[derive(Clone, Debug)]
pub struct Outbox {
    sender: mpsc::Sender<ServerMessage>,
}

/// What happened to a delivery attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    Sent,
    /// Buffer full. The message is dropped, the connection kept.
    Dropped,
    /// The receiving side is gone.
    Closed,
}

impl Outbox {
    #[must_use]
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { sender }
    }

    /// Fresh outbox plus its receiving half, for transports and tests.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Non-blocking send. Never waits on a slow client.
    pub fn deliver(&self, message: ServerMessage) -> Delivery {
        match self.sender.try_send(message) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
