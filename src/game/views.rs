//! Per-viewer projections of lobby state.
//!
//! Everything a client learns about a lobby goes through these
//! functions, so hidden information stays hidden by construction: the
//! impostor never sees the secret word, civilians never see the hint,
//! and nobody (the host included) learns who the impostor is before
//! the reveal.

use serde::Serialize;

use super::{
    entities::{LobbyCode, Phase, PlayerId, PlayerName, Role, Submission},
    state_machine::Lobby,
};

/// One member as everyone may see them. Carries no role.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: PlayerName,
    pub connected: bool,
    pub is_spectator: bool,
    pub is_host: bool,
    pub has_voted: bool,
    pub is_ready: bool,
}

/// Snapshot of a lobby rendered for one viewer.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub code: LobbyCode,
    pub phase: Phase,
    pub host_id: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub current_player: Option<PlayerName>,
    pub round1: Vec<Submission>,
    pub round2: Vec<Submission>,
    /// The viewer's own role and nobody else's.
    pub your_role: Option<Role>,
}

/// One line of the voting ballot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    pub player_id: PlayerId,
    pub name: PlayerName,
}

/// Render the lobby as `viewer` is allowed to see it.
#[must_use]
pub fn lobby_view(lobby: &Lobby, viewer: PlayerId) -> LobbyView {
    let players = lobby
        .players
        .iter()
        .map(|p| PlayerView {
            id: p.id,
            name: p.name.clone(),
            connected: p.connected,
            is_spectator: p.is_spectator,
            is_host: lobby.host == Some(p.id),
            has_voted: p.vote.is_some(),
            is_ready: lobby.ready.contains(&p.id),
        })
        .collect();
    LobbyView {
        code: lobby.code.clone(),
        phase: lobby.phase,
        host_id: lobby.host,
        players,
        current_player: lobby.current_player().map(|p| p.name.clone()),
        round1: lobby.round1.clone(),
        round2: lobby.round2.clone(),
        your_role: lobby.player(viewer).and_then(|p| p.role),
    }
}

/// What `viewer` gets told at game start: their role, and the secret
/// word for civilians or only the hint for the impostor. `None` when
/// no game is running or the viewer holds no role.
#[must_use]
pub fn reveal(lobby: &Lobby, viewer: PlayerId) -> Option<(Role, String)> {
    if !lobby.phase.in_game() {
        return None;
    }
    let pair = lobby.word.as_ref()?;
    let role = lobby.player(viewer)?.role?;
    let word = match role {
        Role::Civilian => pair.word.clone(),
        Role::Impostor => pair.hint.clone(),
    };
    Some((role, word))
}

/// Candidates a vote may target.
#[must_use]
pub fn ballot(lobby: &Lobby) -> Vec<BallotEntry> {
    lobby
        .active_players()
        .map(|p| BallotEntry {
            player_id: p.id,
            name: p.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use rand::{SeedableRng, rngs::StdRng};

    use crate::game::{GameSettings, entities::WordPair, words::WordPool};
    use crate::net::outbox::Outbox;

    use super::*;

    fn started_lobby() -> (Lobby, Vec<PlayerId>) {
        let mut rng = StdRng::seed_from_u64(21);
        let pool = WordPool::new(vec![WordPair {
            word: "Pizza".to_string(),
            hint: "Italian food".to_string(),
        }]);
        let mut lobby = Lobby::new(
            LobbyCode::new("ROOM1").unwrap(),
            pool,
            GameSettings::default(),
        );
        let mut ids = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let id = PlayerId::random();
            let (outbox, _rx) = Outbox::channel(8);
            lobby.join(id, name.into(), outbox).unwrap();
            ids.push(id);
        }
        lobby.start_game(ids[0], &mut rng, Instant::now()).unwrap();
        (lobby, ids)
    }

    fn impostor_of(lobby: &Lobby) -> PlayerId {
        lobby
            .players
            .iter()
            .find(|p| p.role == Some(Role::Impostor))
            .map(|p| p.id)
            .unwrap()
    }

    #[test]
    fn test_view_shows_only_own_role() {
        let (lobby, ids) = started_lobby();
        for &viewer in &ids {
            let view = lobby_view(&lobby, viewer);
            let own = lobby.player(viewer).unwrap().role;
            assert_eq!(view.your_role, own);
        }
    }

    #[test]
    fn test_view_json_never_names_the_impostor() {
        let (lobby, ids) = started_lobby();
        for &viewer in &ids {
            let json = serde_json::to_string(&lobby_view(&lobby, viewer)).unwrap();
            // Role names only ever appear via yourRole.
            let is_impostor = lobby.player(viewer).unwrap().role == Some(Role::Impostor);
            assert!(!json.contains("\"impostor\"") || is_impostor);
        }
    }

    #[test]
    fn test_reveal_splits_word_and_hint() {
        let (lobby, ids) = started_lobby();
        let impostor = impostor_of(&lobby);
        for &viewer in &ids {
            let (role, word) = reveal(&lobby, viewer).unwrap();
            if viewer == impostor {
                assert_eq!(role, Role::Impostor);
                assert_eq!(word, "Italian food");
            } else {
                assert_eq!(role, Role::Civilian);
                assert_eq!(word, "Pizza");
            }
        }
    }

    #[test]
    fn test_reveal_is_empty_outside_a_game() {
        let pool = WordPool::builtin();
        let lobby = Lobby::new(
            LobbyCode::new("ROOM1").unwrap(),
            pool,
            GameSettings::default(),
        );
        assert!(reveal(&lobby, PlayerId::random()).is_none());
    }

    #[test]
    fn test_ballot_excludes_spectators() {
        let (mut lobby, _) = started_lobby();
        let (outbox, _rx) = Outbox::channel(8);
        lobby
            .join(PlayerId::random(), "watcher".into(), outbox)
            .unwrap();
        let entries = ballot(&lobby);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.name.as_str() != "watcher"));
    }
}
