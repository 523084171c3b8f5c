//! Lobby storage and identity bindings.

use rand::Rng;
use std::collections::{HashMap, hash_map::Entry};

use crate::game::{
    Lobby, constants,
    entities::{LobbyCode, PlayerId},
};

use super::messages::LobbyListing;

/// All open lobbies, plus an index from client identity to the lobby
/// holding its seat. Each identity is bound to at most one lobby.
#[derive(Default)]
pub struct Registry {
    lobbies: HashMap<LobbyCode, Lobby>,
    bindings: HashMap<PlayerId, LobbyCode>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a code no open lobby uses.
    pub fn generate_code(&self, length: usize, rng: &mut impl Rng) -> LobbyCode {
        loop {
            let code: String = (0..length)
                .map(|_| {
                    let idx = rng.random_range(0..constants::CODE_ALPHABET.len());
                    char::from(constants::CODE_ALPHABET[idx])
                })
                .collect();
            let code = LobbyCode::from_generated(code);
            if !self.lobbies.contains_key(&code) {
                return code;
            }
        }
    }

    /// Fetch the lobby under `code`, creating it through `build` if it
    /// doesn't exist. With no code requested a fresh one is generated.
    pub fn find_or_create(
        &mut self,
        code: Option<LobbyCode>,
        code_length: usize,
        rng: &mut impl Rng,
        build: impl FnOnce(LobbyCode) -> Lobby,
    ) -> &mut Lobby {
        let code = match code {
            Some(code) => code,
            None => self.generate_code(code_length, rng),
        };
        match self.lobbies.entry(code) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                log::info!("[{}] lobby created", entry.key());
                let lobby = build(entry.key().clone());
                entry.insert(lobby)
            }
        }
    }

    #[must_use]
    pub fn get(&self, code: &LobbyCode) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub fn get_mut(&mut self, code: &LobbyCode) -> Option<&mut Lobby> {
        self.lobbies.get_mut(code)
    }

    /// Where this identity currently holds a seat.
    #[must_use]
    pub fn bound_code(&self, player: PlayerId) -> Option<&LobbyCode> {
        self.bindings.get(&player)
    }

    pub fn lobby_of_mut(&mut self, player: PlayerId) -> Option<&mut Lobby> {
        let code = self.bindings.get(&player)?.clone();
        self.lobbies.get_mut(&code)
    }

    pub fn bind(&mut self, player: PlayerId, code: LobbyCode) {
        self.bindings.insert(player, code);
    }

    pub fn unbind(&mut self, player: PlayerId) {
        self.bindings.remove(&player);
    }

    /// Drop the lobby if its last member is gone. Returns whether it
    /// was removed.
    pub fn remove_if_empty(&mut self, code: &LobbyCode) -> bool {
        let empty = self.lobbies.get(code).is_some_and(Lobby::is_empty);
        if empty {
            self.lobbies.remove(code);
            log::info!("[{code}] lobby destroyed");
        }
        empty
    }

    /// Open lobby codes, oldest lobby first.
    #[must_use]
    pub fn codes(&self) -> Vec<LobbyCode> {
        let mut codes: Vec<(LobbyCode, chrono::DateTime<chrono::Utc>)> = self
            .lobbies
            .values()
            .map(|lobby| (lobby.code.clone(), lobby.created_at))
            .collect();
        codes.sort_by_key(|(_, created_at)| *created_at);
        codes.into_iter().map(|(code, _)| code).collect()
    }

    #[must_use]
    pub fn directory(&self) -> Vec<LobbyListing> {
        let mut listings: Vec<LobbyListing> = self
            .lobbies
            .values()
            .map(|lobby| LobbyListing {
                code: lobby.code.clone(),
                phase: lobby.phase,
                player_count: lobby.active_count(),
                spectator_count: lobby.spectator_count(),
                created_at: lobby.created_at,
            })
            .collect();
        listings.sort_by_key(|listing| listing.created_at);
        listings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}
