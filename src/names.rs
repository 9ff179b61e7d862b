//! Player and team naming
//!
//! Player display names come from the chat platform and are cleaned before
//! they are shown back in the group chat. Team names are generated.

use std::collections::{HashMap, HashSet};

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};

use crate::{constants, session::PlayerId};

/// Style of generated team names
#[derive(Debug, Clone, Copy, Deserialize, Serialize, garde::Validate)]
pub enum NameStyle {
    /// Roman-style names (praenomen + nomen, optionally + cognomen)
    Roman(#[garde(range(min = 2, max = 3))] usize),
    /// Pet-style names (adjective + animal combinations)
    Petname(#[garde(range(min = 2, max = 3))] usize),
}

impl Default for NameStyle {
    fn default() -> Self {
        Self::Petname(2)
    }
}

impl NameStyle {
    /// Generates a random singular name in this style
    pub fn get_name(&self) -> String {
        match self {
            Self::Roman(count) => romanname::romanname(romanname::NameConfig {
                praenomen: *count > 2,
            }),
            Self::Petname(count) => petname::petname(*count as u8, " ").unwrap_or_default(),
        }
        .to_title_case()
    }

    /// Generates a pluralised team name
    pub fn get_team_name(&self) -> String {
        pluralizer::pluralize(&self.get_name(), 2, false)
    }

    /// Generates `count` distinct team names
    ///
    /// Generation is retried a bounded number of times per team; a team that
    /// still collides falls back to a numbered name.
    pub fn team_names(&self, count: usize) -> Vec<String> {
        const ATTEMPTS: usize = 8;

        let mut used = HashSet::new();
        (0..count)
            .map(|index| {
                let name = (0..ATTEMPTS)
                    .map(|_| self.get_team_name())
                    .find(|name| !name.trim().is_empty() && !used.contains(name))
                    .unwrap_or_else(|| format!("Team {}", index + 1));
                used.insert(name.clone());
                name
            })
            .collect()
    }
}

/// Display names of the players in one game
#[derive(Debug, Default, Clone)]
pub struct Names {
    mapping: HashMap<PlayerId, String>,
}

impl Names {
    /// Records the display name of a player
    ///
    /// The name is trimmed, cut to [`constants::names::MAX_LENGTH`]
    /// characters and censored. Empty names fall back to `Player <id>`.
    ///
    /// # Returns
    ///
    /// The name as it will be displayed
    pub fn set_name(&mut self, id: PlayerId, name: &str) -> String {
        let trimmed: String = rustrict::trim_whitespace(name)
            .chars()
            .take(constants::names::MAX_LENGTH)
            .collect();

        let name = if trimmed.is_empty() {
            format!("Player {id}")
        } else {
            trimmed.as_str().censor()
        };

        self.mapping.insert(id, name.clone());
        name
    }

    /// Returns the display name of a player, or a generic fallback
    pub fn get_name(&self, id: PlayerId) -> String {
        self.mapping
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Player {id}"))
    }
}
