//! Messages understood by the engine actor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::game::entities::{LobbyCode, Phase, PlayerId};
use crate::net::outbox::Outbox;

/// Commands sent to the engine actor. Most carry no reply channel;
/// everything a client should learn flows back through its outbox,
/// refusals included.
#[derive(Debug)]
pub enum EngineMessage {
    /// A client wants into a lobby, speaking through this connection.
    Join {
        player: PlayerId,
        name: String,
        lobby: Option<String>,
        outbox: Outbox,
    },
    StartGame {
        player: PlayerId,
    },
    SubmitWord {
        player: PlayerId,
        word: String,
    },
    Vote {
        player: PlayerId,
        target: PlayerId,
    },
    Restart {
        player: PlayerId,
    },
    Exit {
        player: PlayerId,
    },
    /// The transport noticed this client's connection drop.
    Disconnected {
        player: PlayerId,
    },
    /// Snapshot of every open lobby.
    Directory {
        response: oneshot::Sender<Vec<LobbyListing>>,
    },
}

/// Row of the lobby directory.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyListing {
    /// Code clients enter to join.
    pub code: LobbyCode,
    pub phase: Phase,
    /// Active players, spectators not counted.
    pub player_count: usize,
    pub spectator_count: usize,
    pub created_at: DateTime<Utc>,
}
