//! Game identifiers
//!
//! Every game gets a short random identifier when it is created. Ids are
//! shown in octal so they stay five digits long and are easy to read out in
//! a chat.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Smallest generated value (octal 10000)
const MIN_VALUE: u16 = 0o10_000;
/// Upper bound of generated values (octal 100000, exclusive)
const MAX_VALUE: u16 = 0o100_000;

/// A unique identifier for a game
///
/// Uniqueness is enforced by the registry, which regenerates an id until it
/// finds one that is not in use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct GameId(u16);

impl GameId {
    /// Draws a new id from the given random source
    pub fn generate(rng: &mut fastrand::Rng) -> Self {
        Self(rng.u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ParseIntError;

    /// Parses an id from its octal representation
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not a valid octal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s, 8)?))
    }
}
