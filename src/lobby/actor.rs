//! Async front door to the engine.
//!
//! The [`EngineActor`] owns the [`Engine`] and runs it as one task:
//! commands arrive through an [`EngineHandle`] and execute strictly in
//! order, with the periodic sweeps interleaved on timers. Whatever
//! accepts connections keeps a handle clone per connection and never
//! touches lobby state directly.

use std::time::Instant;

use tokio::{
    sync::{mpsc, oneshot},
    time,
};

use crate::game::entities::PlayerId;
use crate::net::{messages::ClientMessage, outbox::Outbox};

use super::{
    config::EngineConfig,
    engine::Engine,
    messages::{EngineMessage, LobbyListing},
};

/// Cloneable handle for talking to a running [`EngineActor`].
#[derive(Clone, Debug)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Queue a command for the engine.
    pub async fn send(&self, message: EngineMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Engine is closed".to_string())
    }

    /// Put a client into a lobby, speaking through `outbox`.
    pub async fn join(
        &self,
        player: PlayerId,
        name: String,
        lobby: Option<String>,
        outbox: Outbox,
    ) -> Result<(), String> {
        self.send(EngineMessage::Join {
            player,
            name,
            lobby,
            outbox,
        })
        .await
    }

    /// Forward a decoded client request. Joins carry a connection and
    /// must go through [`EngineHandle::join`] instead.
    pub async fn deliver(&self, player: PlayerId, message: ClientMessage) -> Result<(), String> {
        let message = match message {
            ClientMessage::JoinLobby { .. } => {
                return Err("join requires a fresh connection outbox".to_string());
            }
            ClientMessage::StartGame => EngineMessage::StartGame { player },
            ClientMessage::SubmitWord { word } => EngineMessage::SubmitWord { player, word },
            ClientMessage::Vote { target } => EngineMessage::Vote { player, target },
            ClientMessage::Restart => EngineMessage::Restart { player },
            ClientMessage::Exit => EngineMessage::Exit { player },
        };
        self.send(message).await
    }

    /// Tell the engine a connection dropped.
    pub async fn disconnected(&self, player: PlayerId) -> Result<(), String> {
        self.send(EngineMessage::Disconnected { player }).await
    }

    /// Snapshot of every open lobby.
    pub async fn directory(&self) -> Result<Vec<LobbyListing>, String> {
        let (response, receiver) = oneshot::channel();
        self.send(EngineMessage::Directory { response }).await?;
        receiver.await.map_err(|_| "Engine is closed".to_string())
    }
}

/// Runs the engine as a task.
pub struct EngineActor {
    engine: Engine,
    inbox: mpsc::Receiver<EngineMessage>,
}

impl EngineActor {
    #[must_use]
    pub fn new(config: EngineConfig) -> (Self, EngineHandle) {
        Self::with_engine(Engine::new(config))
    }

    /// Actor over a prebuilt engine, for custom word pools or tests.
    #[must_use]
    pub fn with_engine(engine: Engine) -> (Self, EngineHandle) {
        let (sender, inbox) = mpsc::channel(100);
        (Self { engine, inbox }, EngineHandle { sender })
    }

    /// Process commands until every handle is gone.
    pub async fn run(mut self) {
        log::info!("Engine started");
        let mut afk_interval = time::interval(self.engine.config().afk_sweep_interval);
        let mut expiry_interval = time::interval(self.engine.config().expiry_sweep_interval);
        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.engine.handle_message(message),
                        None => break,
                    }
                }
                _ = afk_interval.tick() => {
                    self.engine.afk_sweep(Instant::now());
                }
                _ = expiry_interval.tick() => {
                    self.engine.expiry_sweep(Instant::now());
                }
            }
        }
        log::info!("Engine stopped");
    }
}
