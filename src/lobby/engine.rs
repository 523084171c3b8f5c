//! Single-threaded engine over every open lobby.
//!
//! The engine owns the [`Registry`] and runs each command to
//! completion before touching the next, so lobby state never needs a
//! lock. After every state change it drains the lobby's events,
//! translates them into outbound traffic, and pushes fresh per-viewer
//! snapshots through each member's [`Outbox`].

use rand::{SeedableRng, rngs::StdRng};
use std::time::Instant;

use crate::game::{
    GameError, GameEvent, Lobby,
    entities::{LobbyCode, Phase, PlayerId, PlayerName},
    views,
    words::WordPool,
};
use crate::net::{
    messages::ServerMessage,
    outbox::{Delivery, Outbox},
};

use super::{
    config::EngineConfig,
    messages::{EngineMessage, LobbyListing},
    registry::Registry,
};

pub struct Engine {
    config: EngineConfig,
    registry: Registry,
    words: WordPool,
    rng: StdRng,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_words(config, WordPool::builtin())
    }

    #[must_use]
    pub fn with_words(config: EngineConfig, words: WordPool) -> Self {
        Self::with_rng(config, words, StdRng::from_os_rng())
    }

    /// Engine with a caller-supplied generator, for deterministic tests.
    #[must_use]
    pub fn with_rng(config: EngineConfig, words: WordPool, rng: StdRng) -> Self {
        Self {
            config,
            registry: Registry::new(),
            words,
            rng,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one command to completion.
    pub fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Join {
                player,
                name,
                lobby,
                outbox,
            } => self.handle_join(player, &name, lobby.as_deref(), outbox),
            EngineMessage::StartGame { player } => {
                self.handle_op(player, |lobby, rng, now| lobby.start_game(player, rng, now));
            }
            EngineMessage::SubmitWord { player, word } => {
                self.handle_op(player, |lobby, _, now| lobby.submit_word(player, &word, now));
            }
            EngineMessage::Vote { player, target } => {
                self.handle_op(player, |lobby, _, _| lobby.submit_vote(player, target));
            }
            EngineMessage::Restart { player } => {
                self.handle_op(player, |lobby, rng, now| lobby.restart(player, rng, now));
            }
            EngineMessage::Exit { player } => self.handle_exit(player),
            EngineMessage::Disconnected { player } => self.handle_disconnected(player),
            EngineMessage::Directory { response } => {
                let _ = response.send(self.directory());
            }
        }
    }

    /// Skip stalled turns and close lapsed voting windows.
    pub fn afk_sweep(&mut self, now: Instant) {
        let timeout = self.config.turn_timeout;
        for code in self.registry.codes() {
            let changed = match self.registry.get_mut(&code) {
                Some(lobby) => lobby.afk_sweep(timeout, now),
                None => false,
            };
            if changed {
                self.flush(&code);
            }
        }
    }

    /// Drop seats whose reconnect grace has lapsed and collect empty
    /// lobbies.
    pub fn expiry_sweep(&mut self, now: Instant) {
        let grace = self.config.reconnect_grace;
        for code in self.registry.codes() {
            let expired = match self.registry.get_mut(&code) {
                Some(lobby) => lobby.expire_disconnected(grace, &mut self.rng, now),
                None => Vec::new(),
            };
            if expired.is_empty() {
                continue;
            }
            for player in expired {
                self.registry.unbind(player);
            }
            self.flush(&code);
        }
    }

    #[must_use]
    pub fn directory(&self) -> Vec<LobbyListing> {
        self.registry.directory()
    }

    fn handle_join(&mut self, player: PlayerId, name: &str, lobby: Option<&str>, outbox: Outbox) {
        let name = PlayerName::new(name);
        let requested = lobby.and_then(LobbyCode::new);
        // Asking for a different lobby than the bound one means
        // vacating the old seat first.
        if let Some(requested) = &requested
            && let Some(bound) = self.registry.bound_code(player)
            && bound != requested
        {
            self.run_exit(player, false);
        }
        let target = requested.or_else(|| self.registry.bound_code(player).cloned());
        let settings = self.config.settings();
        let mut pool = self.words.clone();
        pool.shuffle(&mut self.rng);
        let reply = outbox.clone();
        let lobby = self.registry.find_or_create(
            target,
            self.config.code_length,
            &mut self.rng,
            move |code| Lobby::new(code, pool, settings),
        );
        let code = lobby.code.clone();
        match lobby.join(player, name, outbox) {
            Ok(outcome) => {
                let host = lobby.host;
                self.registry.bind(player, code.clone());
                reply.deliver(ServerMessage::LobbyAssigned {
                    lobby_id: code.clone(),
                    host_id: host,
                });
                if outcome.is_reconnect {
                    self.resend_private_state(&code, player);
                }
                self.flush(&code);
            }
            Err(error) => {
                log::debug!("[{code}] join refused for {player}: {error}");
                reply.deliver(ServerMessage::Error {
                    message: error.to_string(),
                });
                // A lobby created just for this failed join is useless.
                self.registry.remove_if_empty(&code);
            }
        }
    }

    fn handle_op<F>(&mut self, player: PlayerId, op: F)
    where
        F: FnOnce(&mut Lobby, &mut StdRng, Instant) -> Result<(), GameError>,
    {
        let Some(code) = self.registry.bound_code(player).cloned() else {
            log::debug!("ignoring request from unbound client {player}");
            return;
        };
        let now = Instant::now();
        let result = match self.registry.get_mut(&code) {
            Some(lobby) => op(lobby, &mut self.rng, now),
            None => Err(GameError::UnknownLobby),
        };
        match result {
            Ok(()) => self.flush(&code),
            Err(error) => self.report_error(&code, player, &error),
        }
    }

    fn handle_exit(&mut self, player: PlayerId) {
        self.run_exit(player, true);
    }

    fn run_exit(&mut self, player: PlayerId, acknowledge: bool) {
        let Some(code) = self.registry.bound_code(player).cloned() else {
            return;
        };
        // Ack while the member's outbox still exists.
        if acknowledge
            && let Some(lobby) = self.registry.get(&code)
            && let Some(member) = lobby.player(player)
            && let Some(outbox) = &member.outbox
        {
            outbox.deliver(ServerMessage::Exited);
        }
        let now = Instant::now();
        if let Some(lobby) = self.registry.get_mut(&code)
            && let Err(error) = lobby.exit(player, &mut self.rng, now)
        {
            log::warn!("[{code}] stale binding for {player}: {error}");
        }
        self.registry.unbind(player);
        self.flush(&code);
    }

    fn handle_disconnected(&mut self, player: PlayerId) {
        let Some(code) = self.registry.bound_code(player).cloned() else {
            return;
        };
        let now = Instant::now();
        if let Some(lobby) = self.registry.get_mut(&code)
            && lobby.disconnect(player, now).is_ok()
        {
            self.flush(&code);
        }
    }

    /// Refusals go to the offender alone; nobody else hears about them.
    fn report_error(&self, code: &LobbyCode, player: PlayerId, error: &GameError) {
        log::debug!("[{code}] request from {player} refused: {error}");
        if let Some(lobby) = self.registry.get(code)
            && let Some(member) = lobby.player(player)
            && let Some(outbox) = &member.outbox
        {
            outbox.deliver(ServerMessage::Error {
                message: error.to_string(),
            });
        }
    }

    /// Drain a lobby's events and turn them into outbound traffic,
    /// ending with a fresh per-viewer snapshot for everyone.
    fn flush(&mut self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get_mut(code) else {
            return;
        };
        let events = lobby.drain_events();
        let mut send_reveals = false;
        let mut send_turn = false;
        let mut send_ballot = false;
        let mut send_end = false;
        for event in &events {
            log::debug!("[{code}] {event}");
            match event {
                GameEvent::GameStarted => {
                    send_reveals = true;
                    send_turn = true;
                }
                GameEvent::TurnAdvanced(_) | GameEvent::TurnSkipped(_) => send_turn = true,
                GameEvent::VotingStarted => send_ballot = true,
                GameEvent::GameEnded { .. } => send_end = true,
                _ => {}
            }
        }
        if send_reveals {
            self.send_reveals(code);
        }
        if send_ballot {
            self.broadcast_ballot(code);
        }
        if send_end {
            self.broadcast_end(code);
        }
        if send_turn && !(send_ballot || send_end) {
            self.broadcast_turn(code);
        }
        self.broadcast_view(code);
        self.registry.remove_if_empty(code);
    }

    /// Private role reveal, one message per member.
    fn send_reveals(&self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get(code) else {
            return;
        };
        for player in &lobby.players {
            let Some(outbox) = &player.outbox else {
                continue;
            };
            if let Some((role, word)) = views::reveal(lobby, player.id) {
                outbox.deliver(ServerMessage::GameStart { role, word });
            }
        }
    }

    fn broadcast_turn(&self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get(code) else {
            return;
        };
        let message = ServerMessage::TurnUpdate {
            current_player: lobby.current_player().map(|p| p.name.clone()),
            round1: lobby.round1.clone(),
            round2: lobby.round2.clone(),
        };
        Self::broadcast(lobby, &message);
    }

    fn broadcast_ballot(&self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get(code) else {
            return;
        };
        let message = ServerMessage::StartVoting {
            players: views::ballot(lobby),
        };
        Self::broadcast(lobby, &message);
    }

    fn broadcast_end(&self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get(code) else {
            return;
        };
        let Some(outcome) = lobby.outcome.clone() else {
            return;
        };
        Self::broadcast(lobby, &ServerMessage::GameEnd(outcome));
    }

    fn broadcast(lobby: &Lobby, message: &ServerMessage) {
        for player in &lobby.players {
            if let Some(outbox) = &player.outbox {
                outbox.deliver(message.clone());
            }
        }
    }

    /// Send everyone their own view of the lobby. Connections found
    /// closed lose their outbox; presence is still the transport's
    /// call, so the seat stays until a disconnect arrives.
    fn broadcast_view(&mut self, code: &LobbyCode) {
        let Some(lobby) = self.registry.get_mut(code) else {
            return;
        };
        let mut closed = Vec::new();
        for idx in 0..lobby.players.len() {
            let viewer = lobby.players[idx].id;
            let Some(outbox) = lobby.players[idx].outbox.clone() else {
                continue;
            };
            let view = views::lobby_view(lobby, viewer);
            match outbox.deliver(ServerMessage::LobbyUpdate(view)) {
                Delivery::Sent => {}
                Delivery::Dropped => {
                    log::warn!("[{code}] dropping update for slow client {viewer}");
                }
                Delivery::Closed => closed.push(idx),
            }
        }
        for idx in closed {
            log::debug!(
                "[{code}] releasing closed connection for {}",
                lobby.players[idx].id
            );
            lobby.players[idx].outbox = None;
        }
    }

    /// Catch a reconnecting client up on whatever private state it
    /// missed: its role reveal mid-game, the ballot during voting, the
    /// full reveal after.
    fn resend_private_state(&self, code: &LobbyCode, player: PlayerId) {
        let Some(lobby) = self.registry.get(code) else {
            return;
        };
        let mut messages = Vec::new();
        if let Some((role, word)) = views::reveal(lobby, player) {
            messages.push(ServerMessage::GameStart { role, word });
        }
        if lobby.phase == Phase::Voting {
            messages.push(ServerMessage::StartVoting {
                players: views::ballot(lobby),
            });
        }
        if lobby.phase == Phase::Results
            && let Some(outcome) = &lobby.outcome
        {
            messages.push(ServerMessage::GameEnd(outcome.clone()));
        }
        if let Some(member) = lobby.player(player)
            && let Some(outbox) = &member.outbox
        {
            for message in messages {
                outbox.deliver(message);
            }
        }
    }
}
