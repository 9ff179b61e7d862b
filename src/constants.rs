//! Configuration constants for the spiriter game system
//!
//! Limits used by option validation, catalog loading and the game state
//! machine. Keeping them in one place gives every component the same
//! boundaries.

/// Game session limits
pub mod game {
    /// Maximum number of players that may join a single game
    pub const MAX_PLAYER_COUNT: usize = 100;
    /// Minimum number of rounds in a game
    pub const MIN_ROUNDS: usize = 1;
    /// Maximum number of rounds in a game
    pub const MAX_ROUNDS: usize = 10;
    /// Number of rounds played when not configured
    pub const DEFAULT_ROUNDS: usize = 3;
    /// Maximum pause in seconds between two revealed images
    pub const MAX_REVEAL_PAUSE: u64 = 30;
    /// Pause in seconds between revealed images when not configured
    pub const DEFAULT_REVEAL_PAUSE: u64 = 5;
}

/// Team formation limits
pub mod teams {
    /// Smallest permitted team size threshold.
    ///
    /// Pairing leaves at most one player over, which joins the first team,
    /// so anything below three could not be honoured.
    pub const MIN_TEAM_SIZE: usize = 3;
    /// Largest permitted team size threshold
    pub const MAX_TEAM_SIZE: usize = 8;
    /// Team size threshold when not configured
    pub const DEFAULT_TEAM_SIZE: usize = 3;
}

/// Scenario catalog limits
pub mod scenario {
    /// Maximum length of a scenario name
    pub const MAX_NAME_LENGTH: usize = 100;
    /// Maximum number of slots in one scenario
    pub const MAX_SLOTS: usize = 16;
    /// Maximum number of prompt variants per slot
    pub const MAX_PROMPT_VARIANTS: usize = 16;
    /// Maximum length of a single prompt
    pub const MAX_PROMPT_LENGTH: usize = 200;
}

/// Display name limits
pub mod names {
    /// Maximum length of a displayed player name, in characters
    pub const MAX_LENGTH: usize = 30;
    /// Maximum number of names listed on the lobby board
    pub const LOBBY_LIMIT: usize = 50;
}
