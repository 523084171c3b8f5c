//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{GameSettings, constants};

/// Tunables for the engine and every lobby it manages.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Most members a lobby admits through joins.
    pub max_players: usize,
    /// Fewest active players a game can start with.
    pub min_players: usize,
    /// How long one player may sit on their turn, and how long the
    /// voting window stays open, before the sweep moves things along.
    pub turn_timeout: Duration,
    /// How long a disconnected member keeps their seat.
    pub reconnect_grace: Duration,
    /// How often stalled turns are checked.
    pub afk_sweep_interval: Duration,
    /// How often lapsed seats are checked.
    pub expiry_sweep_interval: Duration,
    /// Length of generated lobby codes.
    pub code_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_players: constants::MAX_PLAYERS,
            min_players: constants::MIN_PLAYERS,
            turn_timeout: Duration::from_secs(30),
            reconnect_grace: Duration::from_secs(60),
            afk_sweep_interval: Duration::from_secs(1),
            expiry_sweep_interval: Duration::from_secs(5),
            code_length: constants::CODE_LENGTH,
        }
    }
}

impl EngineConfig {
    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_players == 0 {
            return Err("max_players must be nonzero".to_string());
        }
        if self.min_players < 2 {
            return Err("min_players must be at least 2".to_string());
        }
        if self.min_players > self.max_players {
            return Err("min_players can't exceed max_players".to_string());
        }
        if self.turn_timeout.is_zero() {
            return Err("turn_timeout must be nonzero".to_string());
        }
        if self.afk_sweep_interval.is_zero() || self.expiry_sweep_interval.is_zero() {
            return Err("sweep intervals must be nonzero".to_string());
        }
        if self.code_length == 0 || self.code_length > constants::MAX_CODE_LENGTH {
            return Err(format!(
                "code_length must be between 1 and {}",
                constants::MAX_CODE_LENGTH
            ));
        }
        Ok(())
    }

    /// Per-lobby settings derived from this configuration.
    #[must_use]
    pub fn settings(&self) -> GameSettings {
        GameSettings::new(self.max_players, self.min_players)
    }
}
