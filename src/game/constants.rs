//! Game-wide constants.

/// Maximum number of active players in one lobby.
pub const MAX_PLAYERS: usize = 15;

/// Active players required before a game can start.
pub const MIN_PLAYERS: usize = 3;

/// Maximum length of a sanitized display name.
pub const MAX_NAME_LENGTH: usize = 24;

/// Maximum length of a client-supplied lobby code.
pub const MAX_CODE_LENGTH: usize = 12;

/// Length of generated lobby codes.
pub const CODE_LENGTH: usize = 5;

/// Alphabet for generated lobby codes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Placeholder submitted on behalf of a player whose turn timed out.
pub const AFK_WORD: &str = "...";

/// Fallback display name for empty input.
pub const DEFAULT_NAME: &str = "anon";
