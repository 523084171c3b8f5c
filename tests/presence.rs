//! Presence handling: disconnects, reconnects, and the sweeps.
//!
//! The engine takes sweep times as arguments, so these tests move the
//! clock by handing in future instants instead of sleeping.

use std::time::{Duration, Instant};

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::mpsc;

use wordspy::{
    Engine, EngineConfig, EngineMessage, LobbyCode, Outbox, Phase, PlayerId, Role, ServerMessage,
    WordPair, WordPool,
};

struct TestClient {
    id: PlayerId,
    rx: mpsc::Receiver<ServerMessage>,
}

impl TestClient {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

fn test_engine() -> Engine {
    let pool = WordPool::new(vec![WordPair {
        word: "Compass".to_string(),
        hint: "Navigation tool".to_string(),
    }]);
    Engine::with_rng(EngineConfig::default(), pool, StdRng::seed_from_u64(7))
}

fn join_as(engine: &mut Engine, id: PlayerId, name: &str) -> TestClient {
    let (outbox, rx) = Outbox::channel(256);
    engine.handle_message(EngineMessage::Join {
        player: id,
        name: name.to_string(),
        lobby: Some("ROOM1".to_string()),
        outbox,
    });
    TestClient { id, rx }
}

fn join(engine: &mut Engine, name: &str) -> TestClient {
    join_as(engine, PlayerId::random(), name)
}

fn room() -> LobbyCode {
    LobbyCode::new("ROOM1").unwrap()
}

fn grace() -> Duration {
    EngineConfig::default().reconnect_grace
}

fn turn_timeout() -> Duration {
    EngineConfig::default().turn_timeout
}

#[test]
fn test_disconnect_migrates_host_and_keeps_seat() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    for client in &mut clients {
        client.drain();
    }

    engine.handle_message(EngineMessage::Disconnected {
        player: clients[0].id,
    });

    let messages = clients[1].drain();
    let view = messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::LobbyUpdate(view) => Some(view.clone()),
            _ => None,
        })
        .expect("survivors hear about the drop");
    // The seat stays, the crown moves.
    assert_eq!(view.players.len(), 3);
    assert!(!view.players[0].connected);
    assert_eq!(view.host_id, Some(clients[1].id));
    assert!(view.players[1].is_host);
}

#[test]
fn test_reconnect_restores_seat_and_replays_role() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::StartGame {
        player: clients[0].id,
    });
    let bob_role = clients[1]
        .drain()
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameStart { role, .. } => Some(*role),
            _ => None,
        })
        .expect("bob got a role");

    engine.handle_message(EngineMessage::Disconnected {
        player: clients[1].id,
    });

    // Same identity, fresh connection: same seat, same role.
    let mut bob = join_as(&mut engine, clients[1].id, "bob");
    let messages = bob.drain();
    assert!(
        messages
            .iter()
            .any(|m| matches!(m, ServerMessage::LobbyAssigned { .. }))
    );
    let replayed = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameStart { role, .. } => Some(*role),
            _ => None,
        })
        .expect("role replayed on reconnect");
    assert_eq!(replayed, bob_role);

    let lobby = engine.registry().get(&room()).unwrap();
    assert_eq!(lobby.players.len(), 3);
    assert!(lobby.player(clients[1].id).unwrap().connected);
    assert_eq!(lobby.phase, Phase::Round1);
}

#[test]
fn test_reconnect_during_results_replays_outcome() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::StartGame {
        player: clients[0].id,
    });
    for round in 0..2 {
        for client in &clients {
            engine.handle_message(EngineMessage::SubmitWord {
                player: client.id,
                word: format!("clue{round}"),
            });
        }
    }
    for idx in 0..clients.len() {
        engine.handle_message(EngineMessage::Vote {
            player: clients[idx].id,
            target: clients[(idx + 1) % clients.len()].id,
        });
    }

    engine.handle_message(EngineMessage::Disconnected {
        player: clients[2].id,
    });
    let mut carol = join_as(&mut engine, clients[2].id, "carol");
    let messages = carol.drain();
    let outcome = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameEnd(outcome) => Some(outcome.clone()),
            _ => None,
        })
        .expect("outcome replayed during results");
    assert_eq!(outcome.secret_word, "Compass");
}

#[test]
fn test_afk_sweep_fills_stalled_turn() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::StartGame {
        player: clients[0].id,
    });
    for client in &mut clients {
        client.drain();
    }

    // Not yet: the turn window is still open.
    engine.afk_sweep(Instant::now());
    assert!(clients[1].drain().is_empty());

    engine.afk_sweep(Instant::now() + turn_timeout() + Duration::from_secs(1));
    let messages = clients[1].drain();
    let turn = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::TurnUpdate {
                current_player,
                round1,
                ..
            } => Some((current_player.clone(), round1.clone())),
            _ => None,
        })
        .expect("skip produces a turn update");
    assert_eq!(turn.1.len(), 1);
    assert_eq!(turn.1[0].word, "...");
    assert_eq!(turn.0.as_ref().map(|n| n.as_str()), Some("bob"));
}

#[test]
fn test_voting_deadline_closes_with_abstentions() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::StartGame {
        player: clients[0].id,
    });
    for round in 0..2 {
        for client in &clients {
            engine.handle_message(EngineMessage::SubmitWord {
                player: client.id,
                word: format!("clue{round}"),
            });
        }
    }
    engine.handle_message(EngineMessage::Vote {
        player: clients[0].id,
        target: clients[1].id,
    });

    engine.afk_sweep(Instant::now() + turn_timeout() + Duration::from_secs(1));

    let messages = clients[0].drain();
    let outcome = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameEnd(outcome) => Some(outcome.clone()),
            _ => None,
        })
        .expect("deadline closes the vote");
    assert_eq!(outcome.votes.len(), 1);
    // One vote against a civilian, or against the impostor, still
    // resolves: a single vote is a unique maximum.
    assert!(outcome.selected.is_some());
}

#[test]
fn test_expiry_sweep_reclaims_lapsed_seat() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    for client in &mut clients {
        client.drain();
    }
    engine.handle_message(EngineMessage::Disconnected {
        player: clients[2].id,
    });

    // Inside the grace window the seat survives.
    engine.expiry_sweep(Instant::now() + grace() - Duration::from_secs(1));
    assert_eq!(engine.registry().get(&room()).unwrap().players.len(), 3);

    engine.expiry_sweep(Instant::now() + grace() + Duration::from_secs(1));
    let lobby = engine.registry().get(&room()).unwrap();
    assert_eq!(lobby.players.len(), 2);
    assert!(lobby.player(clients[2].id).is_none());

    let messages = clients[0].drain();
    let view = messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::LobbyUpdate(view) => Some(view.clone()),
            _ => None,
        })
        .expect("survivors see the seat go");
    assert_eq!(view.players.len(), 2);
}

#[test]
fn test_reconnect_within_grace_cancels_expiry() {
    let mut engine = test_engine();
    let clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::Disconnected {
        player: clients[1].id,
    });
    let _bob = join_as(&mut engine, clients[1].id, "bob");

    engine.expiry_sweep(Instant::now() + grace() + Duration::from_secs(1));
    assert_eq!(engine.registry().get(&room()).unwrap().players.len(), 3);
}

#[test]
fn test_empty_lobby_is_collected_after_expiry() {
    let mut engine = test_engine();
    let _alice = join(&mut engine, "alice");
    engine.handle_message(EngineMessage::Disconnected {
        player: _alice.id,
    });
    assert_eq!(engine.registry().len(), 1);

    engine.expiry_sweep(Instant::now() + grace() + Duration::from_secs(1));
    assert!(engine.registry().is_empty());
}

#[test]
fn test_disconnected_impostor_expiry_resets_game() {
    let mut engine = test_engine();
    let mut clients = vec![
        join(&mut engine, "alice"),
        join(&mut engine, "bob"),
        join(&mut engine, "carol"),
    ];
    engine.handle_message(EngineMessage::StartGame {
        player: clients[0].id,
    });
    let mut impostor_id = None;
    for client in &mut clients {
        let messages = client.drain();
        let is_impostor = messages.iter().any(|m| {
            matches!(
                m,
                ServerMessage::GameStart {
                    role: Role::Impostor,
                    ..
                }
            )
        });
        if is_impostor {
            impostor_id = Some(client.id);
        }
    }
    let impostor_id = impostor_id.expect("one impostor");

    engine.handle_message(EngineMessage::Disconnected {
        player: impostor_id,
    });
    engine.expiry_sweep(Instant::now() + grace() + Duration::from_secs(1));

    let lobby = engine.registry().get(&room()).unwrap();
    assert_eq!(lobby.players.len(), 2);
    assert_eq!(lobby.phase, Phase::Lobby);
    assert!(lobby.word.is_none());
}

#[test]
fn test_switching_lobbies_vacates_old_seat() {
    let mut engine = test_engine();
    let mut alice = join(&mut engine, "alice");
    let _bob = join(&mut engine, "bob");
    alice.drain();

    // Same identity asks for a different room.
    let (outbox, mut rx) = Outbox::channel(256);
    engine.handle_message(EngineMessage::Join {
        player: alice.id,
        name: "alice".to_string(),
        lobby: Some("ROOM2".to_string()),
        outbox,
    });

    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    let assigned = messages.iter().find_map(|m| match m {
        ServerMessage::LobbyAssigned { lobby_id, .. } => Some(lobby_id.clone()),
        _ => None,
    });
    assert_eq!(assigned, Some(LobbyCode::new("ROOM2").unwrap()));

    let old = engine.registry().get(&room()).unwrap();
    assert_eq!(old.players.len(), 1);
    assert!(old.player(alice.id).is_none());
}
