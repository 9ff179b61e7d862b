//! Chat platform session plumbing
//!
//! This module defines the identities handed to the game by the chat
//! platform and the trait through which the game talks back to it. The
//! transport abstraction keeps the state machine free of any particular
//! messaging API.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::game::Message;

/// Stable identity of a player as reported by the chat platform
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct PlayerId(i64);

/// Identity of a chat (group chat or private conversation)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ChatId(i64);

/// Identity of a message previously sent through a [`Transport`]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct MessageId(i64);

/// Destination of an outgoing message
///
/// Players are addressed through their private conversation with the bot,
/// which the platform identifies by the player's own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::From)]
pub enum Target {
    /// The group chat a game runs in
    Chat(ChatId),
    /// A player's private conversation
    Player(PlayerId),
}

/// A player as seen by the platform: identity plus display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Platform identity
    pub id: PlayerId,
    /// Name shown to other players (username or full name)
    pub name: String,
}

impl Participant {
    /// Creates a participant from an identity and a display name
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Trait for delivering game output to the chat platform
///
/// Calls are fire-and-forget from the game's point of view: delivery
/// failures, retries and rate limiting belong to the implementation and
/// never change game state.
pub trait Transport {
    /// Sends a text message, returning its id when the platform reports one
    ///
    /// # Arguments
    ///
    /// * `target` - Chat or player to send to
    /// * `message` - The message to render and send
    fn send_message(&self, target: Target, message: &Message) -> Option<MessageId>;

    /// Sends an encoded image with a caption
    fn send_image(&self, target: Target, image: &[u8], caption: &Message);

    /// Replaces the contents of a previously sent message
    fn edit_message(&self, target: Target, message_id: MessageId, message: &Message);

    /// Waits between two revealed images
    ///
    /// The default does not wait; platform implementations that want
    /// paced reveals override it.
    fn pause(&self, _duration: Duration) {}
}
