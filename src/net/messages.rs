//! Wire messages exchanged with clients.
//!
//! Everything is tagged JSON: a `type` field names the message, the
//! remaining fields are its payload in camelCase. Inbound messages
//! deserialize into [`ClientMessage`], outbound traffic serializes
//! from [`ServerMessage`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::{
    entities::{GameOutcome, LobbyCode, PlayerId, PlayerName, Role, Submission},
    views::{BallotEntry, LobbyView},
};

/// Requests a client may send.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter a lobby. Without a code a fresh lobby is created; a known
    /// identity reconnects into its old seat.
    #[serde(rename_all = "camelCase")]
    JoinLobby {
        lobby_id: Option<String>,
        player_id: PlayerId,
        name: String,
    },
    StartGame,
    SubmitWord {
        word: String,
    },
    Vote {
        target: PlayerId,
    },
    Restart,
    Exit,
}

/// Messages the server pushes to clients.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Reply to a successful join.
    #[serde(rename_all = "camelCase")]
    LobbyAssigned {
        lobby_id: LobbyCode,
        host_id: Option<PlayerId>,
    },
    /// Fresh per-viewer snapshot, sent after every state change.
    LobbyUpdate(LobbyView),
    /// Private role reveal. `word` is the secret word for civilians
    /// and only the hint for the impostor.
    GameStart {
        role: Role,
        word: String,
    },
    /// The turn moved.
    #[serde(rename_all = "camelCase")]
    TurnUpdate {
        current_player: Option<PlayerName>,
        round1: Vec<Submission>,
        round2: Vec<Submission>,
    },
    /// Both rounds are done; vote on one of these.
    StartVoting {
        players: Vec<BallotEntry>,
    },
    /// Voting closed; the full reveal.
    GameEnd(GameOutcome),
    /// Acknowledges a deliberate exit.
    Exited,
    Error {
        message: String,
    },
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::JoinLobby { .. } => "joinLobby",
            Self::StartGame => "startGame",
            Self::SubmitWord { .. } => "submitWord",
            Self::Vote { .. } => "vote",
            Self::Restart => "restart",
            Self::Exit => "exit",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LobbyAssigned { .. } => "lobbyAssigned",
            Self::LobbyUpdate(_) => "lobbyUpdate",
            Self::GameStart { .. } => "gameStart",
            Self::TurnUpdate { .. } => "turnUpdate",
            Self::StartVoting { .. } => "startVoting",
            Self::GameEnd(_) => "gameEnd",
            Self::Exited => "exited",
            Self::Error { .. } => "error",
        };
        write!(f, "{label}")
    }
}
