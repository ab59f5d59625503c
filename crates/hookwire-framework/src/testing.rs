//! In-memory message types shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use hookwire_core::{
    BackendId, BackendResult, Channel, DecodeError, DecodeResult, DispatchContext, Message,
    Reaction, User,
};
use parking_lot::Mutex;
use serde::Deserialize;

#[derive(Debug)]
pub struct TestUser(pub String);

impl User for TestUser {
    fn id(&self) -> Option<&str> {
        Some(&self.0)
    }

    fn mention(&self) -> String {
        format!("@{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct TestChannel {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Channel for TestChannel {
    fn id(&self) -> &str {
        "general"
    }

    fn mention(&self) -> String {
        "#general".to_owned()
    }

    async fn send(&self, content: &str) -> BackendResult<()> {
        self.sent.lock().push(content.to_owned());
        Ok(())
    }
}

/// A message whose replies land in its channel's buffer.
#[derive(Debug)]
pub struct TestMessage {
    content: String,
    author: Arc<TestUser>,
    channel: Arc<TestChannel>,
}

impl TestMessage {
    pub fn new(author: &str, content: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_owned(),
            author: Arc::new(TestUser(author.to_owned())),
            channel: Arc::new(TestChannel::default()),
        })
    }

    /// Decodes `{"author": .., "content": ..}`.
    pub fn decode(raw: &[u8]) -> DecodeResult<Arc<dyn Message>> {
        #[derive(Deserialize)]
        struct Wire {
            author: String,
            content: String,
        }
        let wire: Wire = serde_json::from_slice(raw)
            .map_err(|e| DecodeError::new("TestMessage", e.to_string()))?;
        Ok(Self::new(&wire.author, &wire.content))
    }

    pub fn replies(&self) -> Vec<String> {
        self.channel.sent.lock().clone()
    }
}

#[async_trait]
impl Message for TestMessage {
    fn content(&self) -> &str {
        &self.content
    }

    fn author(&self) -> Arc<dyn User> {
        self.author.clone()
    }

    fn channel(&self) -> Arc<dyn Channel> {
        self.channel.clone()
    }
}

#[derive(Debug)]
pub struct TestReaction(pub String);

impl Reaction for TestReaction {
    fn user(&self) -> Arc<dyn User> {
        Arc::new(TestUser("reactor".to_owned()))
    }

    fn content(&self) -> &str {
        &self.0
    }
}

pub fn context_for(backend: &'static str) -> Arc<DispatchContext> {
    Arc::new(
        DispatchContext::current(BackendId::from_static(backend))
            .with_event_name("message")
            .with_self_mention(Some("@bot")),
    )
}

pub fn context() -> Arc<DispatchContext> {
    context_for("test")
}
