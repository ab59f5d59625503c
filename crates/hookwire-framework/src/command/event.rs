//! The per-invocation command event.

use std::fmt;
use std::sync::Arc;

use hookwire_core::{BackendId, BackendResult, Channel, DispatchContext, Message, User};
use tracing::Span;

/// One matched command invocation.
///
/// Created by the router after a trigger matched, handed to permission checks
/// and the handler, and dropped once the handler completes.
#[derive(Clone)]
pub struct CommandEvent {
    trigger: Arc<str>,
    tokens: Arc<[String]>,
    message: Arc<dyn Message>,
    context: Arc<DispatchContext>,
    span: Span,
}

impl CommandEvent {
    pub fn new(
        trigger: impl Into<Arc<str>>,
        tokens: Vec<String>,
        message: Arc<dyn Message>,
        context: Arc<DispatchContext>,
        span: Span,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            tokens: tokens.into(),
            message,
            context,
            span,
        }
    }

    /// The full trigger (or alias) that matched.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Whitespace tokens following the trigger.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn message(&self) -> &Arc<dyn Message> {
        &self.message
    }

    /// Author of the triggering message.
    pub fn user(&self) -> Arc<dyn User> {
        self.message.author()
    }

    pub fn channel(&self) -> Arc<dyn Channel> {
        self.message.channel()
    }

    /// Backend the message arrived on.
    pub fn backend(&self) -> &BackendId {
        self.context.backend()
    }

    pub fn context(&self) -> &Arc<DispatchContext> {
        &self.context
    }

    /// Tracing span of this invocation.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Replies to the triggering message.
    pub async fn reply(&self, content: &str) -> BackendResult<()> {
        self.message.reply(content).await
    }
}

impl fmt::Debug for CommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEvent")
            .field("trigger", &self.trigger)
            .field("tokens", &self.tokens)
            .field("backend", self.context.backend())
            .finish_non_exhaustive()
    }
}
