use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, time::Instant};
use uuid::Uuid;

use crate::net::outbox::Outbox;

use super::constants;

/// Persistent client identity, stable across reconnects of the same
/// client. Clients mint it themselves and round-trip it on every join.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random identity, mainly useful for tests and tooling.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        let mut name: String = s
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .take(constants::MAX_NAME_LENGTH)
            .collect();
        if name.is_empty() {
            name.push_str(constants::DEFAULT_NAME);
        }
        Self(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Short human-enterable lobby code. Canonical form is uppercase
/// alphanumeric; anything a client supplies is normalized on the way in.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LobbyCode(String);

impl LobbyCode {
    /// Normalize client input. Returns `None` if nothing usable remains.
    pub fn new(s: &str) -> Option<Self> {
        let mut code: String = s
            .trim()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        code.truncate(constants::MAX_CODE_LENGTH);
        if code.is_empty() { None } else { Some(Self(code)) }
    }

    /// Wrap a code that is already canonical (generated internally).
    pub(crate) fn from_generated(s: String) -> Self {
        Self(s)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for LobbyCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).ok_or_else(|| serde::de::Error::custom("empty lobby code"))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Civilian,
    Impostor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Civilian => "civilian",
            Self::Impostor => "impostor",
        };
        write!(f, "{repr}")
    }
}

/// Lobby phases, a linear cycle. LOBBY is both the initial state and
/// the target of every restart; a lobby only ends by emptying out.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Lobby,
    Round1,
    Round2,
    Voting,
    Results,
}

impl Phase {
    /// True while the turn pointer is live.
    #[must_use]
    pub fn is_round(self) -> bool {
        matches!(self, Self::Round1 | Self::Round2)
    }

    /// True while roles are assigned and hidden information exists.
    #[must_use]
    pub fn in_game(self) -> bool {
        matches!(self, Self::Round1 | Self::Round2 | Self::Voting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "LOBBY",
            Self::Round1 => "ROUND1",
            Self::Round2 => "ROUND2",
            Self::Voting => "VOTING",
            Self::Results => "RESULTS",
        };
        write!(f, "{repr}")
    }
}

/// A secret word and the vaguer hint the impostor sees instead.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WordPair {
    pub word: String,
    pub hint: String,
}

/// One description submitted during a round.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Submission {
    pub name: PlayerName,
    pub word: String,
}

/// One cast vote, by display name, for the results reveal.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VoteRecord {
    pub voter: PlayerName,
    pub target: PlayerName,
}

/// Full reveal produced when voting closes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub impostor: PlayerName,
    pub secret_word: String,
    pub hint: String,
    /// Player expelled by the vote, if the tally selected anyone.
    pub selected: Option<PlayerName>,
    pub civilians_win: bool,
    pub votes: Vec<VoteRecord>,
}

/// A lobby member. The record persists across disconnects until the
/// reconnect grace expires, so a returning client lands in the same
/// seat with the same role.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: PlayerName,
    /// Delivery handle for this player's connection. Absent while
    /// disconnected.
    pub outbox: Option<Outbox>,
    pub connected: bool,
    pub is_spectator: bool,
    pub role: Option<Role>,
    pub vote: Option<PlayerId>,
    /// When the connection dropped; cleared on reconnect.
    pub disconnected_at: Option<Instant>,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: PlayerName, outbox: Outbox) -> Self {
        Self {
            id,
            name,
            outbox: Some(outbox),
            connected: true,
            is_spectator: false,
            role: None,
            vote: None,
            disconnected_at: None,
        }
    }

    /// Non-spectator member; holds a seat in the turn order.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_spectator
    }

    /// Active and connected, i.e. able to hold the turn or the host role.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.connected && !self.is_spectator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === PlayerName Tests ===

    #[test]
    fn test_name_sanitizes_whitespace() {
        let name = PlayerName::new("  Ada Lovelace ");
        assert_eq!(name.as_str(), "Ada_Lovelace");
    }

    #[test]
    fn test_name_truncates_long_input() {
        let name = PlayerName::new(&"x".repeat(100));
        assert_eq!(name.as_str().len(), constants::MAX_NAME_LENGTH);
    }

    #[test]
    fn test_name_empty_falls_back() {
        let name = PlayerName::new("   ");
        assert_eq!(name.as_str(), constants::DEFAULT_NAME);
    }

    // === LobbyCode Tests ===

    #[test]
    fn test_code_normalizes() {
        let code = LobbyCode::new(" te st1 ").unwrap();
        assert_eq!(code.as_str(), "TEST1");
    }

    #[test]
    fn test_code_strips_punctuation() {
        let code = LobbyCode::new("ab-12!").unwrap();
        assert_eq!(code.as_str(), "AB12");
    }

    #[test]
    fn test_code_rejects_empty() {
        assert!(LobbyCode::new("  --  ").is_none());
    }

    // === Phase Tests ===

    #[test]
    fn test_phase_predicates() {
        assert!(Phase::Round1.is_round());
        assert!(Phase::Round2.is_round());
        assert!(!Phase::Voting.is_round());
        assert!(Phase::Voting.in_game());
        assert!(!Phase::Lobby.in_game());
        assert!(!Phase::Results.in_game());
    }

    #[test]
    fn test_phase_serializes_uppercase() {
        let json = serde_json::to_string(&Phase::Round1).unwrap();
        assert_eq!(json, "\"ROUND1\"");
    }

    // === Player Tests ===

    #[test]
    fn test_spectator_is_not_present() {
        let (outbox, _rx) = Outbox::channel(4);
        let mut player = Player::new(PlayerId::random(), "watcher".into(), outbox);
        player.is_spectator = true;
        assert!(!player.is_active());
        assert!(!player.is_present());
    }
}
