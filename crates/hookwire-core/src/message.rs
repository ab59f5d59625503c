//! Backend-independent views of users, channels, messages and reactions.
//!
//! Backends decode their message-shaped payloads into values implementing
//! these traits. Listeners and command handlers only ever see the traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};

/// The author of a message or reaction.
pub trait User: Send + Sync {
    /// Stable identifier, if the backend exposes one.
    fn id(&self) -> Option<&str>;

    /// Text that mentions this user on the originating backend.
    fn mention(&self) -> String;

    /// Display name, if known.
    fn display_name(&self) -> Option<&str> {
        None
    }
}

/// A place messages can be sent to.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable identifier of the channel.
    fn id(&self) -> &str;

    /// Text that mentions this channel on the originating backend.
    fn mention(&self) -> String;

    /// Posts `content` to the channel.
    async fn send(&self, content: &str) -> BackendResult<()>;
}

/// A received message.
#[async_trait]
pub trait Message: Send + Sync {
    /// Raw text content.
    fn content(&self) -> &str;

    /// Who posted the message.
    fn author(&self) -> Arc<dyn User>;

    /// Where the message was posted.
    fn channel(&self) -> Arc<dyn Channel>;

    /// Backend message identifier, if any.
    fn id(&self) -> Option<&str> {
        None
    }

    /// Replies to the message. Defaults to posting in the same channel.
    async fn reply(&self, content: &str) -> BackendResult<()> {
        self.channel().send(content).await
    }

    /// Replaces the message content.
    async fn edit(&self, _content: &str) -> BackendResult<()> {
        Err(BackendError::Unsupported("edit"))
    }

    /// Deletes the message.
    async fn delete(&self) -> BackendResult<()> {
        Err(BackendError::Unsupported("delete"))
    }
}

/// A reaction added to a message.
pub trait Reaction: Send + Sync {
    /// Who reacted.
    fn user(&self) -> Arc<dyn User>;

    /// The reaction itself, e.g. an emoji.
    fn content(&self) -> &str;

    /// Identifier of the message reacted to, if known.
    fn message_id(&self) -> Option<&str> {
        None
    }
}
