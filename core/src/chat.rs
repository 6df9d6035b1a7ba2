//! Chat platform seams
//!
//! The chat platform (text channels, voice connections, permissions) is an
//! external collaborator; core only consumes these capabilities through the
//! traits below. A real platform adapter and the console adapter in the demo
//! app both implement them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// Permission an actor may hold on a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Connect,
    Speak,
    ManageGuild,
}

/// Who a capability check is about.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    /// The bot's own user.
    Bot,
    /// A platform user by id.
    User(&'a str),
}

/// One incoming chat message plus the sender context handlers need.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Text channel the message arrived on.
    pub channel: String,
    /// Platform message id, used for deletion.
    pub id: String,
    /// Author identity.
    pub author: String,
    /// Voice destination the author is currently in, if any.
    pub author_voice: Option<String>,
    /// Raw message content.
    pub content: String,
}

#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Delete a message. Platforms may refuse; callers treat failure as
    /// non-fatal.
    async fn delete_message(&self, channel: &str, message_id: &str) -> Result<()>;

    /// Open a voice connection to `destination`.
    async fn join_voice(&self, destination: &str) -> Result<Arc<dyn VoiceConnection>>;

    /// Whether `actor` holds `capability` on `destination`.
    async fn has_capability(
        &self,
        destination: &str,
        actor: Actor<'_>,
        capability: Capability,
    ) -> bool;
}

/// An established voice connection. Carries at most one audio stream.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Destination this connection is bound to.
    fn destination(&self) -> &str;

    /// Begin playback of `audio_url` and resolve when the stream ends.
    async fn play(&self, audio_url: &str) -> Result<()>;

    /// Tear the connection down.
    async fn disconnect(&self) -> Result<()>;
}
