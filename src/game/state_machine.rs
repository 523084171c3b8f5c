//! Lobby state machine.
//!
//! A [`Lobby`] owns the full state of one game room: its members, the
//! phase cycle, the turn pointer, submitted descriptions, votes, and
//! the reveal built when voting closes. Every operation runs to
//! completion synchronously and records [`GameEvent`]s for the caller
//! to translate into outbound traffic.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
    time::{Duration, Instant},
};
use thiserror::Error;

use crate::net::outbox::Outbox;

use super::{
    constants,
    entities::{
        GameOutcome, LobbyCode, Phase, Player, PlayerId, PlayerName, Role, Submission, VoteRecord,
        WordPair,
    },
    words::WordPool,
};

/// Why an operation was refused. Refusals never mutate lobby state;
/// the caller reports them to the offending client and moves on.
#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("can't vote for yourself")]
    CannotVoteOnSelf,
    #[error("lobby is full")]
    CapacityReached,
    #[error("game is already in progress")]
    GameAlreadyInProgress,
    #[error("wrong phase for that")]
    InvalidPhase,
    #[error("need 3+ players")]
    NotEnoughPlayers,
    #[error("only the host can do that")]
    NotHost,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("spectators can't do that")]
    SpectatorAction,
    #[error("no such lobby")]
    UnknownLobby,
    #[error("no such player")]
    UnknownPlayer,
    #[error("no such target")]
    UnknownTarget,
}

/// Things that happened during an operation, in order. Drained by the
/// engine after each operation and mapped onto outbound messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameEvent {
    Disconnected(PlayerName),
    GameEnded { civilians_win: bool },
    GameReset,
    GameStarted,
    HostChanged(PlayerName),
    Joined(PlayerName),
    JoinedAsSpectator(PlayerName),
    Left(PlayerName),
    ReadySignaled(PlayerName),
    Reconnected(PlayerName),
    SeatExpired(PlayerName),
    TurnAdvanced(PlayerName),
    TurnSkipped(PlayerName),
    VoteCast(PlayerName),
    VotingStarted,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected(name) => write!(f, "{name} disconnected"),
            Self::GameEnded {
                civilians_win: true,
            } => write!(f, "game over, the civilians win"),
            Self::GameEnded {
                civilians_win: false,
            } => write!(f, "game over, the impostor wins"),
            Self::GameReset => write!(f, "game reset to the lobby"),
            Self::GameStarted => write!(f, "game started"),
            Self::HostChanged(name) => write!(f, "{name} is now the host"),
            Self::Joined(name) => write!(f, "{name} joined"),
            Self::JoinedAsSpectator(name) => write!(f, "{name} joined as a spectator"),
            Self::Left(name) => write!(f, "{name} left"),
            Self::ReadySignaled(name) => write!(f, "{name} is ready for another game"),
            Self::Reconnected(name) => write!(f, "{name} reconnected"),
            Self::SeatExpired(name) => write!(f, "{name}'s seat expired"),
            Self::TurnAdvanced(name) => write!(f, "it's {name}'s turn"),
            Self::TurnSkipped(name) => write!(f, "{name} timed out"),
            Self::VoteCast(name) => write!(f, "{name} voted"),
            Self::VotingStarted => write!(f, "voting started"),
        }
    }
}

/// Per-lobby tunables.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct GameSettings {
    pub max_players: usize,
    pub min_players: usize,
}

impl GameSettings {
    #[must_use]
    pub const fn new(max_players: usize, min_players: usize) -> Self {
        Self {
            max_players,
            min_players,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: constants::MAX_PLAYERS,
            min_players: constants::MIN_PLAYERS,
        }
    }
}

/// How a join resolved. Reconnects keep the existing seat, spectators
/// watch without a place in the turn order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JoinOutcome {
    pub is_reconnect: bool,
    pub is_spectator: bool,
}

enum RemovalReason {
    Left,
    Expired,
}

/// One game room and everything in it.
pub struct Lobby {
    /// Code clients enter to join this room.
    pub code: LobbyCode,
    pub phase: Phase,
    /// Members in join order. Indices double as the turn order, with
    /// spectators and the disconnected skipped over.
    pub players: Vec<Player>,
    pub host: Option<PlayerId>,
    /// Index into `players` of whoever describes next. Meaningful only
    /// while a round is running.
    pub turn: usize,
    pub round1: Vec<Submission>,
    pub round2: Vec<Submission>,
    /// Word pair in play. `None` outside a game.
    pub word: Option<WordPair>,
    /// When the current turn (or the voting window) opened.
    pub turn_started_at: Instant,
    /// Players who signaled for another game since the last start.
    pub ready: HashSet<PlayerId>,
    pub pool: WordPool,
    pub settings: GameSettings,
    pub created_at: DateTime<Utc>,
    /// Reveal from the last finished game, kept until the next start.
    pub outcome: Option<GameOutcome>,
    events: VecDeque<GameEvent>,
}

impl Lobby {
    #[must_use]
    pub fn new(code: LobbyCode, pool: WordPool, settings: GameSettings) -> Self {
        Self {
            code,
            phase: Phase::Lobby,
            players: Vec::new(),
            host: None,
            turn: 0,
            round1: Vec::new(),
            round2: Vec::new(),
            word: None,
            turn_started_at: Instant::now(),
            ready: HashSet::new(),
            pool,
            settings,
            created_at: Utc::now(),
            outcome: None,
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn position(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    #[must_use]
    pub fn spectator_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_spectator).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whoever the turn pointer rests on, while a round is running.
    #[must_use]
    pub fn current_player(&self) -> Option<&Player> {
        if self.phase.is_round() {
            self.players.get(self.turn)
        } else {
            None
        }
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Admit a client. A known identity reconnects into its old seat,
    /// an unknown one joins fresh: as a spectator while a game runs,
    /// as an active player otherwise. The first member becomes host.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: PlayerName,
        outbox: Outbox,
    ) -> Result<JoinOutcome, GameError> {
        if let Some(player) = self.player_mut(id) {
            player.outbox = Some(outbox);
            player.connected = true;
            player.disconnected_at = None;
            let name = player.name.clone();
            let is_spectator = player.is_spectator;
            self.events.push_back(GameEvent::Reconnected(name));
            self.ensure_host();
            return Ok(JoinOutcome {
                is_reconnect: true,
                is_spectator,
            });
        }
        let is_spectator = self.phase != Phase::Lobby;
        // The cap holds seats in the turn order; watching is free.
        if !is_spectator && self.active_count() >= self.settings.max_players {
            return Err(GameError::CapacityReached);
        }
        let mut player = Player::new(id, name.clone(), outbox);
        player.is_spectator = is_spectator;
        self.players.push(player);
        let event = if is_spectator {
            GameEvent::JoinedAsSpectator(name)
        } else {
            GameEvent::Joined(name)
        };
        self.events.push_back(event);
        self.ensure_host();
        Ok(JoinOutcome {
            is_reconnect: false,
            is_spectator,
        })
    }

    /// Mark a member's connection as dropped. The seat survives until
    /// the reconnect grace runs out; the host role migrates right away.
    pub fn disconnect(&mut self, id: PlayerId, now: Instant) -> Result<(), GameError> {
        let idx = self.position(id).ok_or(GameError::UnknownPlayer)?;
        if !self.players[idx].connected {
            return Ok(());
        }
        let player = &mut self.players[idx];
        player.connected = false;
        player.outbox = None;
        player.disconnected_at = Some(now);
        let name = player.name.clone();
        self.events.push_back(GameEvent::Disconnected(name));
        self.ensure_host();
        Ok(())
    }

    /// Begin a game from the lobby. Host only.
    pub fn start_game(
        &mut self,
        requester: PlayerId,
        rng: &mut impl Rng,
        now: Instant,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::GameAlreadyInProgress);
        }
        self.position(requester).ok_or(GameError::UnknownPlayer)?;
        if self.host != Some(requester) {
            return Err(GameError::NotHost);
        }
        if self.active_count() < self.settings.min_players {
            return Err(GameError::NotEnoughPlayers);
        }
        self.begin_game(rng, now);
        Ok(())
    }

    /// Submit a description for the current round.
    pub fn submit_word(&mut self, id: PlayerId, word: &str, now: Instant) -> Result<(), GameError> {
        if !self.phase.is_round() {
            return Err(GameError::InvalidPhase);
        }
        let idx = self.position(id).ok_or(GameError::UnknownPlayer)?;
        if !self.players[idx].is_active() {
            return Err(GameError::SpectatorAction);
        }
        if idx != self.turn {
            return Err(GameError::OutOfTurnAction);
        }
        self.record_word_and_advance(word, now);
        Ok(())
    }

    /// Cast (or change) a vote. Once every active player has voted the
    /// game resolves immediately.
    pub fn submit_vote(&mut self, id: PlayerId, target: PlayerId) -> Result<(), GameError> {
        if self.phase != Phase::Voting {
            return Err(GameError::InvalidPhase);
        }
        if id == target {
            return Err(GameError::CannotVoteOnSelf);
        }
        let idx = self.position(id).ok_or(GameError::UnknownPlayer)?;
        if !self.players[idx].is_active() {
            return Err(GameError::SpectatorAction);
        }
        if !self.player(target).is_some_and(Player::is_active) {
            return Err(GameError::UnknownTarget);
        }
        let name = self.players[idx].name.clone();
        self.players[idx].vote = Some(target);
        self.events.push_back(GameEvent::VoteCast(name));
        if self.all_votes_in() {
            self.compute_results();
        }
        Ok(())
    }

    /// Signal readiness for another game. When every active player has
    /// signaled (and enough of them remain), a new game begins and any
    /// spectators are absorbed into it.
    pub fn restart(
        &mut self,
        id: PlayerId,
        rng: &mut impl Rng,
        now: Instant,
    ) -> Result<(), GameError> {
        if !matches!(self.phase, Phase::Results | Phase::Lobby) {
            return Err(GameError::InvalidPhase);
        }
        let idx = self.position(id).ok_or(GameError::UnknownPlayer)?;
        if !self.players[idx].is_active() {
            return Err(GameError::SpectatorAction);
        }
        let name = self.players[idx].name.clone();
        if self.ready.insert(id) {
            self.events.push_back(GameEvent::ReadySignaled(name));
        }
        self.try_restart(rng, now);
        Ok(())
    }

    /// Remove a member for good, regardless of phase.
    pub fn exit(&mut self, id: PlayerId, rng: &mut impl Rng, now: Instant) -> Result<(), GameError> {
        let idx = self.position(id).ok_or(GameError::UnknownPlayer)?;
        self.remove_at(idx, RemovalReason::Left, rng, now);
        Ok(())
    }

    /// Drop members whose reconnect grace has lapsed. Returns the
    /// removed identities so the caller can release their bindings.
    pub fn expire_disconnected(
        &mut self,
        grace: Duration,
        rng: &mut impl Rng,
        now: Instant,
    ) -> Vec<PlayerId> {
        let mut expired = Vec::new();
        loop {
            let stale = self.players.iter().position(|p| {
                !p.connected
                    && p.disconnected_at
                        .is_some_and(|t| now.saturating_duration_since(t) > grace)
            });
            let Some(idx) = stale else { break };
            expired.push(self.players[idx].id);
            self.remove_at(idx, RemovalReason::Expired, rng, now);
        }
        expired
    }

    /// Push a stalled game along: skip the current turn with a filler
    /// description, or close a voting window that ran out the clock.
    /// Skips at most one player per call so everyone else still gets a
    /// full turn window. Returns whether anything changed.
    pub fn afk_sweep(&mut self, timeout: Duration, now: Instant) -> bool {
        if now.saturating_duration_since(self.turn_started_at) <= timeout {
            return false;
        }
        match self.phase {
            Phase::Round1 | Phase::Round2 => {
                if let Some(player) = self.players.get(self.turn) {
                    self.events
                        .push_back(GameEvent::TurnSkipped(player.name.clone()));
                }
                self.record_word_and_advance(constants::AFK_WORD, now);
                true
            }
            Phase::Voting => {
                self.compute_results();
                true
            }
            _ => false,
        }
    }

    fn begin_game(&mut self, rng: &mut impl Rng, now: Instant) {
        for player in &mut self.players {
            player.is_spectator = false;
            player.role = Some(Role::Civilian);
            player.vote = None;
        }
        let impostor_idx = rng.random_range(0..self.players.len());
        self.players[impostor_idx].role = Some(Role::Impostor);
        self.word = Some(self.pool.draw(rng));
        self.round1.clear();
        self.round2.clear();
        self.ready.clear();
        self.outcome = None;
        self.phase = Phase::Round1;
        self.turn = self.first_present().unwrap_or(0);
        self.turn_started_at = now;
        // Absorption may have made someone host-eligible in a room
        // whose host seat sat empty.
        self.ensure_host();
        self.events.push_back(GameEvent::GameStarted);
    }

    fn first_present(&self) -> Option<usize> {
        self.players.iter().position(Player::is_present)
    }

    /// Reassign the host if the current one is gone or absent. Keeps a
    /// valid holder in place.
    fn ensure_host(&mut self) {
        let valid = self
            .host
            .and_then(|id| self.player(id))
            .is_some_and(Player::is_present);
        if valid {
            return;
        }
        self.host = self.players.iter().find(|p| p.is_present()).map(|p| p.id);
        if let Some(id) = self.host
            && let Some(player) = self.player(id)
        {
            self.events
                .push_back(GameEvent::HostChanged(player.name.clone()));
        }
    }

    fn record_word_and_advance(&mut self, word: &str, now: Instant) {
        let Some(player) = self.players.get(self.turn) else {
            return;
        };
        let submission = Submission {
            name: player.name.clone(),
            word: word.trim().to_string(),
        };
        match self.phase {
            Phase::Round1 => self.round1.push(submission),
            Phase::Round2 => self.round2.push(submission),
            _ => return,
        }
        self.advance_turn(now);
    }

    fn advance_turn(&mut self, now: Instant) {
        let next = self
            .players
            .iter()
            .enumerate()
            .skip(self.turn + 1)
            .find(|(_, p)| p.is_present())
            .map(|(idx, _)| idx);
        match next {
            Some(idx) => {
                self.turn = idx;
                self.turn_started_at = now;
                self.events
                    .push_back(GameEvent::TurnAdvanced(self.players[idx].name.clone()));
            }
            None => self.complete_round(now),
        }
    }

    fn complete_round(&mut self, now: Instant) {
        match self.phase {
            Phase::Round1 => {
                self.phase = Phase::Round2;
                self.turn = self.first_present().unwrap_or(0);
                self.turn_started_at = now;
                if let Some(player) = self.players.get(self.turn) {
                    self.events
                        .push_back(GameEvent::TurnAdvanced(player.name.clone()));
                }
            }
            Phase::Round2 => {
                self.phase = Phase::Voting;
                self.turn_started_at = now;
                self.events.push_back(GameEvent::VotingStarted);
            }
            _ => {}
        }
    }

    fn all_votes_in(&self) -> bool {
        self.active_count() > 0 && self.active_players().all(|p| p.vote.is_some())
    }

    /// Close voting. A unique top target is expelled; a tie (or no
    /// votes at all) expels no one, and the impostor survives unless
    /// the expelled player was them.
    fn compute_results(&mut self) {
        let impostor = self
            .players
            .iter()
            .find(|p| p.role == Some(Role::Impostor))
            .map(|p| (p.id, p.name.clone()));
        let (Some(pair), Some((impostor_id, impostor_name))) = (self.word.clone(), impostor) else {
            log::error!("[{}] voting closed without a live game, resetting", self.code);
            self.reset_to_lobby();
            return;
        };
        let mut tally: HashMap<PlayerId, usize> = HashMap::new();
        for player in self.active_players() {
            if let Some(target) = player.vote {
                *tally.entry(target).or_default() += 1;
            }
        }
        let mut best: Option<(PlayerId, usize)> = None;
        let mut tied = false;
        for (&target, &count) in &tally {
            match best {
                None => best = Some((target, count)),
                Some((_, top)) if count > top => {
                    best = Some((target, count));
                    tied = false;
                }
                Some((_, top)) if count == top => tied = true,
                _ => {}
            }
        }
        let selected_id = match best {
            Some((target, _)) if !tied => Some(target),
            _ => None,
        };
        let selected = selected_id
            .and_then(|id| self.player(id))
            .map(|p| p.name.clone());
        let civilians_win = selected_id == Some(impostor_id);
        let votes = self
            .players
            .iter()
            .filter(|p| p.is_active())
            .filter_map(|p| {
                let target = self.player(p.vote?)?;
                Some(VoteRecord {
                    voter: p.name.clone(),
                    target: target.name.clone(),
                })
            })
            .collect();
        self.outcome = Some(GameOutcome {
            impostor: impostor_name,
            secret_word: pair.word,
            hint: pair.hint,
            selected,
            civilians_win,
            votes,
        });
        self.phase = Phase::Results;
        self.events.push_back(GameEvent::GameEnded { civilians_win });
    }

    fn try_restart(&mut self, rng: &mut impl Rng, now: Instant) {
        if !matches!(self.phase, Phase::Results | Phase::Lobby) {
            return;
        }
        if self.active_count() < self.settings.min_players {
            return;
        }
        // The opening turn needs a connected holder.
        if !self.players.iter().any(|p| p.connected) {
            return;
        }
        let all_ready = self.active_players().all(|p| self.ready.contains(&p.id));
        if all_ready {
            self.begin_game(rng, now);
        }
    }

    fn remove_at(&mut self, idx: usize, reason: RemovalReason, rng: &mut impl Rng, now: Instant) {
        let removed = self.players.remove(idx);
        self.ready.remove(&removed.id);
        let was_impostor = removed.role == Some(Role::Impostor);
        let was_host = self.host == Some(removed.id);
        let event = match reason {
            RemovalReason::Left => GameEvent::Left(removed.name.clone()),
            RemovalReason::Expired => GameEvent::SeatExpired(removed.name.clone()),
        };
        self.events.push_back(event);
        // Votes cast for the removed player no longer count.
        for player in &mut self.players {
            if player.vote == Some(removed.id) {
                player.vote = None;
            }
        }
        if was_host {
            self.host = None;
        }
        self.ensure_host();
        if self.players.is_empty() {
            return;
        }
        // The game can't continue without its impostor or without any
        // actives. A results screen with no actives left resets too,
        // back to a lobby the remaining spectators can play in.
        let no_actives = self.active_count() == 0;
        if (self.phase.in_game() && (was_impostor || no_actives))
            || (self.phase == Phase::Results && no_actives)
        {
            self.reset_to_lobby();
            return;
        }
        if self.phase.is_round() {
            if idx < self.turn {
                self.turn -= 1;
            } else if idx == self.turn {
                self.retarget_turn(now);
            }
        }
        if self.phase == Phase::Voting && self.all_votes_in() {
            self.compute_results();
        }
        if matches!(self.phase, Phase::Results | Phase::Lobby) {
            self.try_restart(rng, now);
        }
    }

    /// The player at the turn index is gone; hand the turn to the next
    /// present player at or after it, or end the round if none remain.
    fn retarget_turn(&mut self, now: Instant) {
        let next = self
            .players
            .iter()
            .enumerate()
            .skip(self.turn)
            .find(|(_, p)| p.is_present())
            .map(|(idx, _)| idx);
        match next {
            Some(idx) => {
                self.turn = idx;
                self.turn_started_at = now;
                self.events
                    .push_back(GameEvent::TurnAdvanced(self.players[idx].name.clone()));
            }
            None => self.complete_round(now),
        }
    }

    fn reset_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        self.word = None;
        self.round1.clear();
        self.round2.clear();
        self.ready.clear();
        self.outcome = None;
        self.turn = 0;
        for player in &mut self.players {
            player.role = None;
            player.vote = None;
            player.is_spectator = false;
        }
        self.events.push_back(GameEvent::GameReset);
        self.ensure_host();
    }
}

impl fmt::Debug for Lobby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lobby")
            .field("code", &self.code)
            .field("phase", &self.phase)
            .field("players", &self.players.len())
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}
