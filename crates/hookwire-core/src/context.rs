//! Per-event dispatch context.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::backend::BackendId;

/// Context handed to every listener and command invocation of one inbound event.
///
/// The context is shared (`Arc`) between all handlers fanned out from the same
/// event and is never mutated after dispatch starts.
#[derive(Clone)]
pub struct DispatchContext {
    backend: BackendId,
    event_name: Arc<str>,
    self_mention: Option<Arc<str>>,
    handle: Handle,
}

impl DispatchContext {
    /// Creates a context for an event originating from `backend`.
    pub fn new(backend: BackendId, handle: Handle) -> Self {
        Self {
            backend,
            event_name: Arc::from(""),
            self_mention: None,
            handle,
        }
    }

    /// Creates a context bound to the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn current(backend: BackendId) -> Self {
        Self::new(backend, Handle::current())
    }

    /// Sets the native event name, used for logging.
    pub fn with_event_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.event_name = name.into();
        self
    }

    /// Sets the text the backend uses to mention the bot itself.
    pub fn with_self_mention(mut self, mention: Option<impl Into<Arc<str>>>) -> Self {
        self.self_mention = mention.map(Into::into);
        self
    }

    /// Backend that originated the event.
    pub fn backend(&self) -> &BackendId {
        &self.backend
    }

    /// Native event name.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// How the bot is mentioned on the originating backend.
    pub fn self_mention(&self) -> Option<&str> {
        self.self_mention.as_deref()
    }

    /// Runtime handle for scheduling work.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Schedules `future` on the dispatch runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("backend", &self.backend)
            .field("event_name", &self.event_name)
            .field("self_mention", &self.self_mention)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_runs_on_dispatch_runtime() {
        let ctx = DispatchContext::current(BackendId::from_static("test"))
            .with_event_name("message")
            .with_self_mention(Some("@bot"));

        let value = ctx.spawn(async { 21 * 2 }).await.unwrap();

        assert_eq!(value, 42);
        assert_eq!(ctx.backend().as_str(), "test");
        assert_eq!(ctx.event_name(), "message");
        assert_eq!(ctx.self_mention(), Some("@bot"));
    }
}
